//! Service Layer
//!
//! Business logic for sessions, users, the course catalog and learning
//! progress. Services hold only shared store and cache handles.

pub mod auth;
pub mod catalog;
pub mod category;
pub mod course;
pub mod jwt;
pub mod learning;
pub mod rate_limit;
pub mod user;

// Re-export services
pub use auth::{AuthService, AuthServiceError};
pub use catalog::CatalogError;
pub use category::CategoryService;
pub use course::CourseService;
pub use jwt::{JwtError, JwtService};
pub use learning::LearningService;
pub use rate_limit::{RateLimitStatus, RateLimiter};
pub use user::{UserService, UserServiceError};

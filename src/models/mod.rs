//! Data Models Module
//!
//! Entities, token types and request/response payloads for the education
//! platform.

pub mod auth;
pub mod catalog;
pub mod learning;
pub mod requests;
pub mod user;

// Re-export commonly used types
pub use auth::*;
pub use catalog::*;
pub use learning::*;
pub use requests::*;
pub use user::*;

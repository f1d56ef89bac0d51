//! API Layer
//!
//! HTTP API endpoints and request handling for the education platform.

pub mod auth_handlers;
pub mod catalog_handlers;
pub mod handlers;
pub mod learning_handlers;
pub mod middleware;
pub mod routes;
pub mod user_handlers;

// Re-export commonly used types
pub use handlers::{AppState, SuccessResponse};
pub use middleware::{
    auth_middleware, extract_auth_user, rate_limit_middleware, require_admin,
    require_catalog_manager, AuthUser,
};
pub use routes::{create_app, create_routes, RouterBuilder, API_PREFIX};

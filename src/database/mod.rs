//! Database Module
//!
//! PostgreSQL connection management and pagination helpers.

pub mod connection;

// Re-export commonly used types
pub use connection::{run_migrations, DatabaseConfig, DatabasePool, Pagination};

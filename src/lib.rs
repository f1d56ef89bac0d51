//! Education Platform Core Library
//!
//! Backend for an online course platform: account sessions with rotating
//! refresh tokens, a cached course catalog, enrollment and lesson progress.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use edu_core::{api, cache, config::AppConfig, repository::Stores};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::from_env()?;
//!     let stores = Stores::connect(config.storage, &config.database).await?;
//!     let cache = cache::create_cache(&config.redis).await;
//!
//!     let state = api::AppState::new(&config, stores, cache);
//!     let app = api::create_app(state, &config.server);
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//!     let service = app.into_make_service_with_connect_info::<std::net::SocketAddr>();
//!     axum::serve(listener, service).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **API Layer**: axum handlers, bearer authentication and role guards
//! - **Service Layer**: sessions, users, catalog and learning logic
//! - **Cache**: Redis or in-process key/value cache behind a typed read-through layer
//! - **Repository**: store traits with PostgreSQL and in-memory implementations
//! - **Utils**: error mapping, password hashing and input validation

/// HTTP API layer with handlers and configurable routing
pub mod api;

/// Cache backends and the read-through layer
pub mod cache;

/// Configuration management for all service settings
pub mod config;

/// Database connection management and configuration
pub mod database;

/// Data models and request/response structures
pub mod models;

/// Storage traits and their implementations
pub mod repository;

/// Business logic services
pub mod service;

/// Shared utilities for security, validation, and error handling
pub mod utils;

// Re-export commonly used types for convenient access
pub use api::{create_app, AppState, RouterBuilder};
pub use models::{CourseResponse, Role, TokenPair, User, UserContext};
pub use service::{
    AuthService, CategoryService, CourseService, JwtService, LearningService, UserService,
};
pub use utils::error::{AppError, AppResult, ErrorResponse};

// Re-export database utilities for configuration
pub use database::{DatabaseConfig, DatabasePool};

// Re-export configuration system
pub use config::{
    env, AppConfig, CacheTtlConfig, JwtConfig, RateLimitConfig, RedisConfig, ServerConfig,
};

/// Library version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

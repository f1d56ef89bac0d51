//! HTTP Request Handlers
//!
//! Shared application state, the response envelope and the health check.
//! Area-specific handlers live in the sibling `*_handlers` modules.

use std::sync::Arc;

use axum::Json;
use chrono::Utc;
use validator::Validate;

use crate::{
    cache::{Cache, CacheLayer},
    config::AppConfig,
    models::requests::HealthCheckResponse,
    repository::Stores,
    service::{
        AuthService, CategoryService, CourseService, JwtService, LearningService, RateLimiter,
        UserService,
    },
    utils::{error::AppError, validation::describe_validation_errors},
    VERSION,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub user_service: Arc<UserService>,
    pub category_service: Arc<CategoryService>,
    pub course_service: Arc<CourseService>,
    pub learning_service: Arc<LearningService>,
    pub jwt_service: Arc<JwtService>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Wires every service onto the given stores and cache
    pub fn new(config: &AppConfig, stores: Stores, cache: Arc<dyn Cache>) -> Self {
        let cache = CacheLayer::new(cache);
        let jwt = JwtService::from_config(&config.jwt);

        let course_service = CourseService::new(
            stores.courses.clone(),
            stores.lessons.clone(),
            stores.users.clone(),
            stores.enrollments.clone(),
            cache.clone(),
            config.cache_ttl.clone(),
        );
        let learning_service = LearningService::new(
            stores.enrollments.clone(),
            stores.progress.clone(),
            course_service.clone(),
        );
        let rate_limiter = RateLimiter::new(cache.clone(), config.rate_limit.clone());

        Self {
            auth_service: Arc::new(AuthService::new(
                stores.users.clone(),
                stores.refresh_tokens.clone(),
                cache.clone(),
                jwt.clone(),
                config.jwt.refresh_token_ttl(),
                config.cache_ttl.reset_grant(),
            )),
            user_service: Arc::new(UserService::new(
                stores.users.clone(),
                stores.refresh_tokens.clone(),
            )),
            category_service: Arc::new(CategoryService::new(
                stores.categories.clone(),
                cache,
                config.cache_ttl.categories(),
            )),
            course_service: Arc::new(course_service),
            learning_service: Arc::new(learning_service),
            jwt_service: Arc::new(jwt),
            rate_limiter: Arc::new(rate_limiter),
        }
    }
}

/// Standard success response wrapper
#[derive(serde::Serialize)]
pub struct SuccessResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Wraps `data` in the success envelope
pub fn ok<T>(data: T) -> Json<SuccessResponse<T>> {
    Json(SuccessResponse::new(data))
}

/// Runs the derive validators of a request body
pub fn validated<T: Validate>(request: T) -> Result<T, AppError> {
    request
        .validate()
        .map_err(|e| AppError::Validation(describe_validation_errors(&e)))?;
    Ok(request)
}

/// Health check endpoint
pub async fn health_check() -> Json<SuccessResponse<HealthCheckResponse>> {
    ok(HealthCheckResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        version: VERSION.to_string(),
    })
}

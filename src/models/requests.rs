//! Request and Response Models
//!
//! Data structures for API request and response payloads with validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::user::Role;
use crate::utils::validation::{
    email_validator, full_name_validator, slug_validator, url_validator,
};

/// Request payload for account registration
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(custom(function = "email_validator"))]
    pub email: String,

    #[validate(length(min = 6, max = 128, message = "Password must be between 6 and 128 characters"))]
    pub password: String,

    #[validate(custom(function = "full_name_validator"))]
    pub full_name: String,

    /// Defaults to `user` when absent
    #[serde(default)]
    pub role: Option<Role>,

    #[serde(default)]
    #[validate(custom(function = "url_validator"))]
    pub profile_picture: Option<String>,
}

/// Request payload for password login
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(custom(function = "email_validator"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password cannot be empty"))]
    pub password: String,
}

/// Request payload carrying a refresh token (refresh and logout)
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RefreshTokenRequest {
    #[validate(length(min = 1, message = "Refresh token cannot be empty"))]
    pub refresh_token: String,
}

/// Request payload to start a password reset
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(custom(function = "email_validator"))]
    pub email: String,
}

/// Request payload to complete a password reset
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, message = "Reset token cannot be empty"))]
    pub token: String,

    #[validate(length(min = 6, max = 128, message = "Password must be between 6 and 128 characters"))]
    pub password: String,
}

/// Request payload for updating the caller's own profile
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(custom(function = "full_name_validator"))]
    pub full_name: Option<String>,

    #[validate(length(min = 6, max = 128, message = "Password must be between 6 and 128 characters"))]
    pub password: Option<String>,

    #[validate(custom(function = "url_validator"))]
    pub profile_picture: Option<String>,
}

/// Request payload for administrative user updates
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct AdminUpdateUserRequest {
    #[validate(custom(function = "full_name_validator"))]
    pub full_name: Option<String>,

    pub role: Option<Role>,

    #[validate(custom(function = "url_validator"))]
    pub profile_picture: Option<String>,
}

/// Request payload for creating a category
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,

    pub description: Option<String>,

    /// Generated from the name when absent
    #[validate(custom(function = "slug_validator"))]
    pub slug: Option<String>,
}

/// Request payload for updating a category; absent fields are preserved
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: Option<String>,

    pub description: Option<String>,

    #[validate(custom(function = "slug_validator"))]
    pub slug: Option<String>,
}

/// Request payload for creating a course
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCourseRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be between 1 and 255 characters"))]
    pub title: String,

    pub description: Option<String>,

    #[validate(custom(function = "url_validator"))]
    pub thumbnail: Option<String>,

    pub instructor_id: Uuid,

    #[serde(default)]
    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    pub price: f64,

    #[validate(length(max = 50))]
    pub level: Option<String>,

    #[serde(default)]
    #[validate(range(min = 0, message = "Duration cannot be negative"))]
    pub duration: i32,

    #[validate(length(max = 100))]
    pub category: Option<String>,
}

/// Request payload for updating a course
///
/// Empty strings and zero numbers leave the stored value untouched.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateCourseRequest {
    #[validate(length(max = 255))]
    pub title: Option<String>,

    pub description: Option<String>,

    #[validate(custom(function = "url_validator"))]
    pub thumbnail: Option<String>,

    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    pub price: Option<f64>,

    #[validate(length(max = 50))]
    pub level: Option<String>,

    #[validate(range(min = 0, message = "Duration cannot be negative"))]
    pub duration: Option<i32>,

    #[validate(length(max = 100))]
    pub category: Option<String>,
}

/// Request payload for creating a lesson
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateLessonRequest {
    pub course_id: Uuid,

    #[validate(length(min = 1, max = 255, message = "Title must be between 1 and 255 characters"))]
    pub title: String,

    pub description: Option<String>,

    #[validate(custom(function = "url_validator"))]
    pub video_url: String,

    #[validate(length(min = 1, max = 100, message = "Video id cannot be empty"))]
    pub video_id: String,

    #[serde(default)]
    #[validate(range(min = 0))]
    pub duration: i32,

    #[validate(range(min = 0, message = "Order number cannot be negative"))]
    pub order_number: i32,
}

/// Request payload for updating a lesson
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateLessonRequest {
    #[validate(length(max = 255))]
    pub title: Option<String>,

    pub description: Option<String>,

    #[validate(custom(function = "url_validator"))]
    pub video_url: Option<String>,

    #[validate(length(max = 100))]
    pub video_id: Option<String>,

    #[validate(range(min = 0))]
    pub duration: Option<i32>,

    #[validate(range(min = 0))]
    pub order_number: Option<i32>,
}

/// Request payload for recording playback position
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateProgressRequest {
    #[validate(range(min = 0, message = "Position cannot be negative"))]
    pub position_seconds: i32,
}

/// Pagination query string
#[derive(Debug, Clone, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: u32,

    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

/// Course listing query string
#[derive(Debug, Clone, Deserialize)]
pub struct CourseListQuery {
    #[serde(default = "default_page")]
    pub page: u32,

    #[serde(default = "default_page_size")]
    pub page_size: u32,

    pub category: Option<String>,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    10
}

/// Paginated list envelope
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
}

/// Plain acknowledgement for operations without a payload
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// Response for health check
#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

//! Errors shared by the catalog and learning services

use thiserror::Error;

use crate::repository::StoreError;
use crate::utils::error::AppError;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Category not found")]
    CategoryNotFound,

    #[error("Course not found")]
    CourseNotFound,

    #[error("Lesson not found")]
    LessonNotFound,

    #[error("Instructor not found")]
    InstructorNotFound,

    #[error("Slug already exists")]
    SlugExists,

    #[error("Category name already exists")]
    CategoryNameExists,

    #[error("Already enrolled in this course")]
    AlreadyEnrolled,

    #[error("Not enrolled in this course")]
    NotEnrolled,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::CategoryNotFound
            | CatalogError::CourseNotFound
            | CatalogError::LessonNotFound
            | CatalogError::InstructorNotFound => AppError::NotFound(err.to_string()),
            CatalogError::SlugExists
            | CatalogError::CategoryNameExists
            | CatalogError::AlreadyEnrolled => AppError::Conflict(err.to_string()),
            CatalogError::NotEnrolled => AppError::Forbidden(err.to_string()),
            CatalogError::Validation(msg) => AppError::Validation(msg),
            CatalogError::Store(e) => AppError::Internal(format!("store: {}", e)),
        }
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;

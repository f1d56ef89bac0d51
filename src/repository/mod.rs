//! Repository Layer
//!
//! Storage abstractions for every persisted entity. Services only see the
//! traits below; `postgres` provides the production implementations and
//! `memory` the in-process ones used by tests and `STORAGE_BACKEND=memory`.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::config::StorageBackend;
use crate::database::{run_migrations, DatabaseConfig, Pagination};
use crate::models::{
    Category, Course, Enrollment, Lesson, Progress, RefreshToken, UserWithPassword,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStores;
pub use postgres::PostgresStores;

/// Unique constraint names shared by the schema and the in-memory stores
pub mod constraints {
    pub const USERS_EMAIL: &str = "users_email_key";
    pub const REFRESH_TOKENS_TOKEN: &str = "refresh_tokens_token_hash_key";
    pub const CATEGORIES_NAME: &str = "categories_name_key";
    pub const CATEGORIES_SLUG: &str = "categories_slug_key";
    pub const ENROLLMENTS_USER_COURSE: &str = "enrollments_user_id_course_id_key";
    pub const PROGRESS_USER_LESSON: &str = "progress_user_id_lesson_id_key";
}

/// Errors surfaced by store implementations
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint rejected the write; carries the constraint name
    #[error("Unique constraint violated: {0}")]
    Duplicate(String),

    /// A foreign key pointed at a missing row
    #[error("Referenced row does not exist: {0}")]
    MissingReference(String),

    /// A stored value could not be mapped back into a model
    #[error("Corrupt row: {0}")]
    Decode(String),

    #[error("Store operation timed out")]
    Timeout,

    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl StoreError {
    pub fn is_duplicate_of(&self, constraint: &str) -> bool {
        matches!(self, StoreError::Duplicate(name) if name == constraint)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => StoreError::Timeout,
            sqlx::Error::Database(db_err) => {
                let constraint = db_err.constraint().map(str::to_string);
                match (db_err.code().as_deref(), constraint) {
                    (Some("23505"), Some(name)) => StoreError::Duplicate(name),
                    (Some("23503"), Some(name)) => StoreError::MissingReference(name),
                    _ => StoreError::Database(sqlx::Error::Database(db_err)),
                }
            }
            other => StoreError::Database(other),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// User persistence
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a fully built user; `Duplicate(users_email_key)` on a taken email
    async fn create(&self, user: &UserWithPassword) -> StoreResult<()>;

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<UserWithPassword>>;

    /// Lookup by normalized email
    async fn get_by_email(&self, email: &str) -> StoreResult<Option<UserWithPassword>>;

    /// Batch lookup; missing ids are skipped
    async fn get_many(&self, ids: &[Uuid]) -> StoreResult<Vec<UserWithPassword>>;

    /// Overwrites the mutable columns; false if the row no longer exists
    async fn update(&self, user: &UserWithPassword) -> StoreResult<bool>;

    async fn delete(&self, id: Uuid) -> StoreResult<bool>;

    /// Newest first, together with the total row count
    async fn list(&self, page: Pagination) -> StoreResult<(Vec<UserWithPassword>, i64)>;
}

/// Refresh token persistence
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn create(&self, token: &RefreshToken) -> StoreResult<()>;

    /// Lookup by the SHA-256 fingerprint of the opaque token
    async fn get_by_token_hash(&self, token_hash: &str) -> StoreResult<Option<RefreshToken>>;

    /// Conditional delete. Exactly one of several concurrent callers for the
    /// same id observes `true`.
    async fn delete(&self, id: Uuid) -> StoreResult<bool>;

    async fn delete_all_by_user(&self, user_id: Uuid) -> StoreResult<u64>;
}

#[async_trait]
pub trait CategoryStore: Send + Sync {
    async fn create(&self, category: &Category) -> StoreResult<()>;
    async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<Category>>;
    async fn get_by_slug(&self, slug: &str) -> StoreResult<Option<Category>>;
    async fn update(&self, category: &Category) -> StoreResult<bool>;
    async fn delete(&self, id: Uuid) -> StoreResult<bool>;
    /// Ordered by name
    async fn list(&self) -> StoreResult<Vec<Category>>;
}

#[async_trait]
pub trait CourseStore: Send + Sync {
    async fn create(&self, course: &Course) -> StoreResult<()>;
    async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<Course>>;
    async fn update(&self, course: &Course) -> StoreResult<bool>;
    async fn delete(&self, id: Uuid) -> StoreResult<bool>;
    /// Newest first, together with the total row count
    async fn list(&self, page: Pagination) -> StoreResult<(Vec<Course>, i64)>;
    async fn list_by_category(
        &self,
        category: &str,
        page: Pagination,
    ) -> StoreResult<(Vec<Course>, i64)>;
}

#[async_trait]
pub trait LessonStore: Send + Sync {
    async fn create(&self, lesson: &Lesson) -> StoreResult<()>;
    async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<Lesson>>;
    async fn update(&self, lesson: &Lesson) -> StoreResult<bool>;
    async fn delete(&self, id: Uuid) -> StoreResult<bool>;
    /// Ordered by `order_number`
    async fn list_by_course(&self, course_id: Uuid) -> StoreResult<Vec<Lesson>>;
}

#[async_trait]
pub trait EnrollmentStore: Send + Sync {
    /// `Duplicate(enrollments_user_id_course_id_key)` when already enrolled
    async fn create(&self, enrollment: &Enrollment) -> StoreResult<()>;
    async fn is_enrolled(&self, user_id: Uuid, course_id: Uuid) -> StoreResult<bool>;
    /// Newest first, together with the total row count
    async fn list_by_user(
        &self,
        user_id: Uuid,
        page: Pagination,
    ) -> StoreResult<(Vec<Enrollment>, i64)>;
}

#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn get(&self, user_id: Uuid, lesson_id: Uuid) -> StoreResult<Option<Progress>>;
    /// Insert or overwrite the row for `(user_id, lesson_id)`
    async fn upsert(&self, progress: &Progress) -> StoreResult<()>;
    async fn list_for_lessons(
        &self,
        user_id: Uuid,
        lesson_ids: &[Uuid],
    ) -> StoreResult<Vec<Progress>>;
}

/// Every store handle the services need, shared behind trait objects
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub refresh_tokens: Arc<dyn RefreshTokenStore>,
    pub categories: Arc<dyn CategoryStore>,
    pub courses: Arc<dyn CourseStore>,
    pub lessons: Arc<dyn LessonStore>,
    pub enrollments: Arc<dyn EnrollmentStore>,
    pub progress: Arc<dyn ProgressStore>,
}

impl Stores {
    /// Stores backed by PostgreSQL
    pub fn postgres(pool: sqlx::PgPool) -> Self {
        PostgresStores::new(pool).into_stores()
    }

    /// Stores living in process memory
    pub fn memory() -> Self {
        MemoryStores::new().into_stores()
    }

    /// Opens the configured backend. For PostgreSQL this connects the pool
    /// and applies pending migrations.
    pub async fn connect(
        backend: StorageBackend,
        database: &DatabaseConfig,
    ) -> Result<Self, sqlx::Error> {
        match backend {
            StorageBackend::Postgres => {
                let pool = database.create_pool().await?;
                log::info!("running database migrations");
                run_migrations(&pool)
                    .await
                    .map_err(|e| sqlx::Error::Migrate(Box::new(e)))?;
                Ok(Self::postgres(pool))
            }
            StorageBackend::Memory => {
                log::warn!("using in-memory storage; data is lost on restart");
                Ok(Self::memory())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_matches_constraint_name() {
        let err = StoreError::Duplicate(constraints::USERS_EMAIL.to_string());
        assert!(err.is_duplicate_of(constraints::USERS_EMAIL));
        assert!(!err.is_duplicate_of(constraints::CATEGORIES_SLUG));
        assert!(!StoreError::Timeout.is_duplicate_of(constraints::USERS_EMAIL));
    }

    #[test]
    fn test_pool_timeout_maps_to_timeout() {
        let err: StoreError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, StoreError::Timeout));

        let err: StoreError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, StoreError::Database(_)));
    }
}

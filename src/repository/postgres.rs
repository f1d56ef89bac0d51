//! PostgreSQL store implementations
//!
//! Runtime-checked `sqlx` queries against the schema in `migrations/`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use super::{
    CategoryStore, CourseStore, EnrollmentStore, LessonStore, ProgressStore, RefreshTokenStore,
    StoreError, StoreResult, Stores, UserStore,
};
use crate::database::Pagination;
use crate::models::{
    Category, Course, Enrollment, Lesson, Progress, RefreshToken, Role, UserWithPassword,
};

const USER_COLUMNS: &str =
    "id, email, password_hash, full_name, role, profile_picture, created_at, updated_at";
const COURSE_COLUMNS: &str = "id, title, description, thumbnail, instructor_id, price, level, \
     duration, category, created_at, updated_at";
const LESSON_COLUMNS: &str = "id, course_id, title, description, video_url, video_id, duration, \
     order_number, created_at, updated_at";

/// Raw `users` row; the role column is free text in the database
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
    full_name: String,
    role: String,
    profile_picture: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for UserWithPassword {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role: Role = row
            .role
            .parse()
            .map_err(|e| StoreError::Decode(format!("user {}: {}", row.id, e)))?;

        Ok(UserWithPassword {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            full_name: row.full_name,
            role,
            profile_picture: row.profile_picture,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_users(rows: Vec<UserRow>) -> StoreResult<Vec<UserWithPassword>> {
    rows.into_iter().map(UserWithPassword::try_from).collect()
}

pub struct PgUserStore {
    pool: PgPool,
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, user: &UserWithPassword) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, full_name, role, profile_picture, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(user.role.as_str())
        .bind(&user.profile_picture)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<UserWithPassword>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserWithPassword::try_from).transpose()
    }

    async fn get_by_email(&self, email: &str) -> StoreResult<Option<UserWithPassword>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserWithPassword::try_from).transpose()
    }

    async fn get_many(&self, ids: &[Uuid]) -> StoreResult<Vec<UserWithPassword>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = ANY($1)",
            USER_COLUMNS
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        into_users(rows)
    }

    async fn update(&self, user: &UserWithPassword) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET email = $2, password_hash = $3, full_name = $4, role = $5,
                profile_picture = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(user.role.as_str())
        .bind(&user.profile_picture)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, page: Pagination) -> StoreResult<(Vec<UserWithPassword>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2",
            USER_COLUMNS
        ))
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((into_users(rows)?, total))
    }
}

pub struct PgRefreshTokenStore {
    pool: PgPool,
}

#[async_trait]
impl RefreshTokenStore for PgRefreshTokenStore {
    async fn create(&self, token: &RefreshToken) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(token.id)
        .bind(token.user_id)
        .bind(&token.token_hash)
        .bind(token.expires_at)
        .bind(token.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_by_token_hash(&self, token_hash: &str) -> StoreResult<Option<RefreshToken>> {
        let token = sqlx::query_as::<_, RefreshToken>(
            r#"
            SELECT id, user_id, token_hash, expires_at, created_at
            FROM refresh_tokens
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(token)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_all_by_user(&self, user_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

pub struct PgCategoryStore {
    pool: PgPool,
}

#[async_trait]
impl CategoryStore for PgCategoryStore {
    async fn create(&self, category: &Category) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO categories (id, name, description, slug, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(category.id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(&category.slug)
        .bind(category.created_at)
        .bind(category.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, name, description, slug, created_at, updated_at FROM categories WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }

    async fn get_by_slug(&self, slug: &str) -> StoreResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, name, description, slug, created_at, updated_at FROM categories WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }

    async fn update(&self, category: &Category) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE categories
            SET name = $2, description = $3, slug = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(category.id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(&category.slug)
        .bind(category.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self) -> StoreResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, description, slug, created_at, updated_at FROM categories ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }
}

pub struct PgCourseStore {
    pool: PgPool,
}

#[async_trait]
impl CourseStore for PgCourseStore {
    async fn create(&self, course: &Course) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO courses (id, title, description, thumbnail, instructor_id, price, level,
                                 duration, category, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(course.id)
        .bind(&course.title)
        .bind(&course.description)
        .bind(&course.thumbnail)
        .bind(course.instructor_id)
        .bind(course.price)
        .bind(&course.level)
        .bind(course.duration)
        .bind(&course.category)
        .bind(course.created_at)
        .bind(course.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<Course>> {
        let course = sqlx::query_as::<_, Course>(&format!(
            "SELECT {} FROM courses WHERE id = $1",
            COURSE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(course)
    }

    async fn update(&self, course: &Course) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE courses
            SET title = $2, description = $3, thumbnail = $4, price = $5, level = $6,
                duration = $7, category = $8, updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(course.id)
        .bind(&course.title)
        .bind(&course.description)
        .bind(&course.thumbnail)
        .bind(course.price)
        .bind(&course.level)
        .bind(course.duration)
        .bind(&course.category)
        .bind(course.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, page: Pagination) -> StoreResult<(Vec<Course>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM courses")
            .fetch_one(&self.pool)
            .await?;

        let courses = sqlx::query_as::<_, Course>(&format!(
            "SELECT {} FROM courses ORDER BY created_at DESC LIMIT $1 OFFSET $2",
            COURSE_COLUMNS
        ))
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((courses, total))
    }

    async fn list_by_category(
        &self,
        category: &str,
        page: Pagination,
    ) -> StoreResult<(Vec<Course>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM courses WHERE category = $1")
            .bind(category)
            .fetch_one(&self.pool)
            .await?;

        let courses = sqlx::query_as::<_, Course>(&format!(
            "SELECT {} FROM courses WHERE category = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
            COURSE_COLUMNS
        ))
        .bind(category)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((courses, total))
    }
}

pub struct PgLessonStore {
    pool: PgPool,
}

#[async_trait]
impl LessonStore for PgLessonStore {
    async fn create(&self, lesson: &Lesson) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO lessons (id, course_id, title, description, video_url, video_id, duration,
                                 order_number, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(lesson.id)
        .bind(lesson.course_id)
        .bind(&lesson.title)
        .bind(&lesson.description)
        .bind(&lesson.video_url)
        .bind(&lesson.video_id)
        .bind(lesson.duration)
        .bind(lesson.order_number)
        .bind(lesson.created_at)
        .bind(lesson.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<Lesson>> {
        let lesson = sqlx::query_as::<_, Lesson>(&format!(
            "SELECT {} FROM lessons WHERE id = $1",
            LESSON_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(lesson)
    }

    async fn update(&self, lesson: &Lesson) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE lessons
            SET title = $2, description = $3, video_url = $4, video_id = $5, duration = $6,
                order_number = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(lesson.id)
        .bind(&lesson.title)
        .bind(&lesson.description)
        .bind(&lesson.video_url)
        .bind(&lesson.video_id)
        .bind(lesson.duration)
        .bind(lesson.order_number)
        .bind(lesson.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM lessons WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_by_course(&self, course_id: Uuid) -> StoreResult<Vec<Lesson>> {
        let lessons = sqlx::query_as::<_, Lesson>(&format!(
            "SELECT {} FROM lessons WHERE course_id = $1 ORDER BY order_number",
            LESSON_COLUMNS
        ))
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lessons)
    }
}

pub struct PgEnrollmentStore {
    pool: PgPool,
}

#[async_trait]
impl EnrollmentStore for PgEnrollmentStore {
    async fn create(&self, enrollment: &Enrollment) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO enrollments (id, user_id, course_id, enrolled_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(enrollment.id)
        .bind(enrollment.user_id)
        .bind(enrollment.course_id)
        .bind(enrollment.enrolled_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn is_enrolled(&self, user_id: Uuid, course_id: Uuid) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM enrollments WHERE user_id = $1 AND course_id = $2)",
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn list_by_user(
        &self,
        user_id: Uuid,
        page: Pagination,
    ) -> StoreResult<(Vec<Enrollment>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM enrollments WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        let enrollments = sqlx::query_as::<_, Enrollment>(
            r#"
            SELECT id, user_id, course_id, enrolled_at
            FROM enrollments
            WHERE user_id = $1
            ORDER BY enrolled_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((enrollments, total))
    }
}

pub struct PgProgressStore {
    pool: PgPool,
}

#[async_trait]
impl ProgressStore for PgProgressStore {
    async fn get(&self, user_id: Uuid, lesson_id: Uuid) -> StoreResult<Option<Progress>> {
        let progress = sqlx::query_as::<_, Progress>(
            r#"
            SELECT id, user_id, lesson_id, position_seconds, completed, last_watched_at
            FROM progress
            WHERE user_id = $1 AND lesson_id = $2
            "#,
        )
        .bind(user_id)
        .bind(lesson_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(progress)
    }

    async fn upsert(&self, progress: &Progress) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO progress (id, user_id, lesson_id, position_seconds, completed, last_watched_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT ON CONSTRAINT progress_user_id_lesson_id_key
            DO UPDATE SET position_seconds = EXCLUDED.position_seconds,
                          completed = EXCLUDED.completed,
                          last_watched_at = EXCLUDED.last_watched_at
            "#,
        )
        .bind(progress.id)
        .bind(progress.user_id)
        .bind(progress.lesson_id)
        .bind(progress.position_seconds)
        .bind(progress.completed)
        .bind(progress.last_watched_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_lessons(
        &self,
        user_id: Uuid,
        lesson_ids: &[Uuid],
    ) -> StoreResult<Vec<Progress>> {
        if lesson_ids.is_empty() {
            return Ok(Vec::new());
        }

        let progress = sqlx::query_as::<_, Progress>(
            r#"
            SELECT id, user_id, lesson_id, position_seconds, completed, last_watched_at
            FROM progress
            WHERE user_id = $1 AND lesson_id = ANY($2)
            "#,
        )
        .bind(user_id)
        .bind(lesson_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(progress)
    }
}

/// All PostgreSQL stores sharing one pool
#[derive(Clone)]
pub struct PostgresStores {
    pool: PgPool,
}

impl PostgresStores {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn into_stores(self) -> Stores {
        let pool = self.pool;
        Stores {
            users: Arc::new(PgUserStore { pool: pool.clone() }),
            refresh_tokens: Arc::new(PgRefreshTokenStore { pool: pool.clone() }),
            categories: Arc::new(PgCategoryStore { pool: pool.clone() }),
            courses: Arc::new(PgCourseStore { pool: pool.clone() }),
            lessons: Arc::new(PgLessonStore { pool: pool.clone() }),
            enrollments: Arc::new(PgEnrollmentStore { pool: pool.clone() }),
            progress: Arc::new(PgProgressStore { pool }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(role: &str) -> UserRow {
        UserRow {
            id: Uuid::new_v4(),
            email: "a@x.com".to_string(),
            password_hash: "hash".to_string(),
            full_name: "Alice".to_string(),
            role: role.to_string(),
            profile_picture: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_user_row_role_decoding() {
        let user = UserWithPassword::try_from(row("instructor")).unwrap();
        assert_eq!(user.role, Role::Instructor);

        let err = UserWithPassword::try_from(row("superuser")).unwrap_err();
        assert!(matches!(err, StoreError::Decode(_)));
    }
}

//! In-process store implementations
//!
//! Mirror the PostgreSQL constraints (unique keys, ordering) so services
//! behave the same against either backend. Locks are never held across an
//! await on another resource.

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    constraints, CategoryStore, CourseStore, EnrollmentStore, LessonStore, ProgressStore,
    RefreshTokenStore, StoreError, StoreResult, Stores, UserStore,
};
use crate::database::Pagination;
use crate::models::{
    Category, Course, Enrollment, Lesson, Progress, RefreshToken, UserWithPassword,
};

fn paginate<T: Clone>(rows: Vec<T>, page: Pagination) -> (Vec<T>, i64) {
    let total = rows.len() as i64;
    let items = rows
        .into_iter()
        .skip(page.offset as usize)
        .take(page.limit as usize)
        .collect();
    (items, total)
}

#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, UserWithPassword>>,
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, user: &UserWithPassword) -> StoreResult<()> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate(constraints::USERS_EMAIL.to_string()));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<UserWithPassword>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> StoreResult<Option<UserWithPassword>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn get_many(&self, ids: &[Uuid]) -> StoreResult<Vec<UserWithPassword>> {
        let users = self.users.read().await;
        Ok(ids.iter().filter_map(|id| users.get(id).cloned()).collect())
    }

    async fn update(&self, user: &UserWithPassword) -> StoreResult<bool> {
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|u| u.id != user.id && u.email == user.email)
        {
            return Err(StoreError::Duplicate(constraints::USERS_EMAIL.to_string()));
        }
        match users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.users.write().await.remove(&id).is_some())
    }

    async fn list(&self, page: Pagination) -> StoreResult<(Vec<UserWithPassword>, i64)> {
        let mut rows: Vec<_> = self.users.read().await.values().cloned().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(rows, page))
    }
}

/// Keyed by row id; removal through `DashMap::remove` is atomic per key
#[derive(Default)]
pub struct MemoryRefreshTokenStore {
    tokens: DashMap<Uuid, RefreshToken>,
}

#[async_trait]
impl RefreshTokenStore for MemoryRefreshTokenStore {
    async fn create(&self, token: &RefreshToken) -> StoreResult<()> {
        if self
            .tokens
            .iter()
            .any(|entry| entry.token_hash == token.token_hash)
        {
            return Err(StoreError::Duplicate(
                constraints::REFRESH_TOKENS_TOKEN.to_string(),
            ));
        }
        self.tokens.insert(token.id, token.clone());
        Ok(())
    }

    async fn get_by_token_hash(&self, token_hash: &str) -> StoreResult<Option<RefreshToken>> {
        Ok(self
            .tokens
            .iter()
            .find(|entry| entry.token_hash == token_hash)
            .map(|entry| entry.value().clone()))
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.tokens.remove(&id).is_some())
    }

    async fn delete_all_by_user(&self, user_id: Uuid) -> StoreResult<u64> {
        let before = self.tokens.len();
        self.tokens.retain(|_, token| token.user_id != user_id);
        Ok(before.saturating_sub(self.tokens.len()) as u64)
    }
}

#[derive(Default)]
pub struct MemoryCategoryStore {
    categories: RwLock<HashMap<Uuid, Category>>,
}

impl MemoryCategoryStore {
    fn check_unique(
        categories: &HashMap<Uuid, Category>,
        category: &Category,
    ) -> StoreResult<()> {
        for other in categories.values().filter(|c| c.id != category.id) {
            if other.name == category.name {
                return Err(StoreError::Duplicate(constraints::CATEGORIES_NAME.to_string()));
            }
            if other.slug == category.slug {
                return Err(StoreError::Duplicate(constraints::CATEGORIES_SLUG.to_string()));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl CategoryStore for MemoryCategoryStore {
    async fn create(&self, category: &Category) -> StoreResult<()> {
        let mut categories = self.categories.write().await;
        Self::check_unique(&categories, category)?;
        categories.insert(category.id, category.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<Category>> {
        Ok(self.categories.read().await.get(&id).cloned())
    }

    async fn get_by_slug(&self, slug: &str) -> StoreResult<Option<Category>> {
        Ok(self
            .categories
            .read()
            .await
            .values()
            .find(|c| c.slug == slug)
            .cloned())
    }

    async fn update(&self, category: &Category) -> StoreResult<bool> {
        let mut categories = self.categories.write().await;
        if !categories.contains_key(&category.id) {
            return Ok(false);
        }
        Self::check_unique(&categories, category)?;
        categories.insert(category.id, category.clone());
        Ok(true)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.categories.write().await.remove(&id).is_some())
    }

    async fn list(&self) -> StoreResult<Vec<Category>> {
        let mut rows: Vec<_> = self.categories.read().await.values().cloned().collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }
}

#[derive(Default)]
pub struct MemoryCourseStore {
    courses: RwLock<HashMap<Uuid, Course>>,
}

impl MemoryCourseStore {
    async fn newest_first(&self, category: Option<&str>) -> Vec<Course> {
        let mut rows: Vec<_> = self
            .courses
            .read()
            .await
            .values()
            .filter(|c| category.map_or(true, |name| c.category.as_deref() == Some(name)))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows
    }
}

#[async_trait]
impl CourseStore for MemoryCourseStore {
    async fn create(&self, course: &Course) -> StoreResult<()> {
        self.courses.write().await.insert(course.id, course.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<Course>> {
        Ok(self.courses.read().await.get(&id).cloned())
    }

    async fn update(&self, course: &Course) -> StoreResult<bool> {
        let mut courses = self.courses.write().await;
        match courses.get_mut(&course.id) {
            Some(existing) => {
                *existing = course.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.courses.write().await.remove(&id).is_some())
    }

    async fn list(&self, page: Pagination) -> StoreResult<(Vec<Course>, i64)> {
        Ok(paginate(self.newest_first(None).await, page))
    }

    async fn list_by_category(
        &self,
        category: &str,
        page: Pagination,
    ) -> StoreResult<(Vec<Course>, i64)> {
        Ok(paginate(self.newest_first(Some(category)).await, page))
    }
}

#[derive(Default)]
pub struct MemoryLessonStore {
    lessons: RwLock<HashMap<Uuid, Lesson>>,
}

#[async_trait]
impl LessonStore for MemoryLessonStore {
    async fn create(&self, lesson: &Lesson) -> StoreResult<()> {
        self.lessons.write().await.insert(lesson.id, lesson.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<Lesson>> {
        Ok(self.lessons.read().await.get(&id).cloned())
    }

    async fn update(&self, lesson: &Lesson) -> StoreResult<bool> {
        let mut lessons = self.lessons.write().await;
        match lessons.get_mut(&lesson.id) {
            Some(existing) => {
                *existing = lesson.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.lessons.write().await.remove(&id).is_some())
    }

    async fn list_by_course(&self, course_id: Uuid) -> StoreResult<Vec<Lesson>> {
        let mut rows: Vec<_> = self
            .lessons
            .read()
            .await
            .values()
            .filter(|l| l.course_id == course_id)
            .cloned()
            .collect();
        rows.sort_by_key(|l| l.order_number);
        Ok(rows)
    }
}

#[derive(Default)]
pub struct MemoryEnrollmentStore {
    enrollments: RwLock<Vec<Enrollment>>,
}

#[async_trait]
impl EnrollmentStore for MemoryEnrollmentStore {
    async fn create(&self, enrollment: &Enrollment) -> StoreResult<()> {
        let mut enrollments = self.enrollments.write().await;
        if enrollments
            .iter()
            .any(|e| e.user_id == enrollment.user_id && e.course_id == enrollment.course_id)
        {
            return Err(StoreError::Duplicate(
                constraints::ENROLLMENTS_USER_COURSE.to_string(),
            ));
        }
        enrollments.push(enrollment.clone());
        Ok(())
    }

    async fn is_enrolled(&self, user_id: Uuid, course_id: Uuid) -> StoreResult<bool> {
        Ok(self
            .enrollments
            .read()
            .await
            .iter()
            .any(|e| e.user_id == user_id && e.course_id == course_id))
    }

    async fn list_by_user(
        &self,
        user_id: Uuid,
        page: Pagination,
    ) -> StoreResult<(Vec<Enrollment>, i64)> {
        let mut rows: Vec<_> = self
            .enrollments
            .read()
            .await
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.enrolled_at.cmp(&a.enrolled_at));
        Ok(paginate(rows, page))
    }
}

#[derive(Default)]
pub struct MemoryProgressStore {
    progress: DashMap<(Uuid, Uuid), Progress>,
}

#[async_trait]
impl ProgressStore for MemoryProgressStore {
    async fn get(&self, user_id: Uuid, lesson_id: Uuid) -> StoreResult<Option<Progress>> {
        Ok(self
            .progress
            .get(&(user_id, lesson_id))
            .map(|entry| entry.value().clone()))
    }

    async fn upsert(&self, progress: &Progress) -> StoreResult<()> {
        self.progress
            .entry((progress.user_id, progress.lesson_id))
            .and_modify(|existing| {
                existing.position_seconds = progress.position_seconds;
                existing.completed = progress.completed;
                existing.last_watched_at = progress.last_watched_at;
            })
            .or_insert_with(|| progress.clone());
        Ok(())
    }

    async fn list_for_lessons(
        &self,
        user_id: Uuid,
        lesson_ids: &[Uuid],
    ) -> StoreResult<Vec<Progress>> {
        Ok(lesson_ids
            .iter()
            .filter_map(|lesson_id| {
                self.progress
                    .get(&(user_id, *lesson_id))
                    .map(|entry| entry.value().clone())
            })
            .collect())
    }
}

/// One instance of every in-memory store
#[derive(Clone, Default)]
pub struct MemoryStores {
    pub users: Arc<MemoryUserStore>,
    pub refresh_tokens: Arc<MemoryRefreshTokenStore>,
    pub categories: Arc<MemoryCategoryStore>,
    pub courses: Arc<MemoryCourseStore>,
    pub lessons: Arc<MemoryLessonStore>,
    pub enrollments: Arc<MemoryEnrollmentStore>,
    pub progress: Arc<MemoryProgressStore>,
}

impl MemoryStores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_stores(self) -> Stores {
        Stores {
            users: self.users,
            refresh_tokens: self.refresh_tokens,
            categories: self.categories,
            courses: self.courses,
            lessons: self.lessons,
            enrollments: self.enrollments,
            progress: self.progress,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use chrono::{Duration, Utc};

    fn user(email: &str) -> UserWithPassword {
        UserWithPassword {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            full_name: "Test".to_string(),
            role: Role::User,
            profile_picture: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_user_email_is_unique() {
        let store = MemoryUserStore::default();
        store.create(&user("a@x.com")).await.unwrap();

        let err = store.create(&user("a@x.com")).await.unwrap_err();
        assert!(err.is_duplicate_of(constraints::USERS_EMAIL));
    }

    #[tokio::test]
    async fn test_refresh_token_delete_is_claimed_once() {
        let store = MemoryRefreshTokenStore::default();
        let token = RefreshToken {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            token_hash: "fingerprint".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
            created_at: Utc::now(),
        };
        store.create(&token).await.unwrap();

        let (first, second) = tokio::join!(store.delete(token.id), store.delete(token.id));
        assert!(first.unwrap() ^ second.unwrap());
        assert!(store.get_by_token_hash("fingerprint").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_all_by_user_counts_rows() {
        let store = MemoryRefreshTokenStore::default();
        let user_id = Uuid::new_v4();
        for i in 0..3 {
            store
                .create(&RefreshToken {
                    id: Uuid::new_v4(),
                    user_id,
                    token_hash: format!("t{}", i),
                    expires_at: Utc::now() + Duration::hours(1),
                    created_at: Utc::now(),
                })
                .await
                .unwrap();
        }

        assert_eq!(store.delete_all_by_user(user_id).await.unwrap(), 3);
        assert_eq!(store.delete_all_by_user(user_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_course_list_is_newest_first_and_paginated() {
        let store = MemoryCourseStore::default();
        let base = Utc::now();
        for i in 0..3 {
            store
                .create(&Course {
                    id: Uuid::new_v4(),
                    title: format!("Course {}", i),
                    description: None,
                    thumbnail: None,
                    instructor_id: Uuid::new_v4(),
                    price: 0.0,
                    level: None,
                    duration: 0,
                    category: Some(if i == 0 { "web" } else { "data" }.to_string()),
                    created_at: base + Duration::seconds(i),
                    updated_at: base,
                })
                .await
                .unwrap();
        }

        let (page, total) = store.list(Pagination::new(1, 2)).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].title, "Course 2");

        let (web, total) = store
            .list_by_category("web", Pagination::new(1, 10))
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(web[0].title, "Course 0");
    }
}

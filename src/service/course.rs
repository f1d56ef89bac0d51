//! Course Service
//!
//! Courses, their lessons and enrollment. Read paths are cache-aside:
//!
//! - `course:<id>` holds the detail projection (instructor and lessons)
//! - unfiltered list pages live under the current list generation
//! - `courses:featured` holds the five newest courses
//!
//! Every course mutation deletes the detail key, the list generation and the
//! featured list. Lesson mutations only delete the detail key of their course.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use super::catalog::{CatalogError, CatalogResult};
use crate::cache::{keys, CacheLayer};
use crate::config::CacheTtlConfig;
use crate::database::Pagination;
use crate::models::{
    Course, CoursePage, CourseResponse, CreateCourseRequest, CreateLessonRequest, Enrollment,
    Lesson, LessonBrief, UpdateCourseRequest, UpdateLessonRequest, User,
};
use crate::repository::{
    constraints, CourseStore, EnrollmentStore, LessonStore, StoreError, UserStore,
};
use crate::utils::validation::non_blank;

/// Number of courses in the featured list
pub const FEATURED_COUNT: u32 = 5;

#[derive(Clone)]
pub struct CourseService {
    courses: Arc<dyn CourseStore>,
    lessons: Arc<dyn LessonStore>,
    users: Arc<dyn UserStore>,
    enrollments: Arc<dyn EnrollmentStore>,
    cache: CacheLayer,
    ttl: CacheTtlConfig,
}

impl CourseService {
    pub fn new(
        courses: Arc<dyn CourseStore>,
        lessons: Arc<dyn LessonStore>,
        users: Arc<dyn UserStore>,
        enrollments: Arc<dyn EnrollmentStore>,
        cache: CacheLayer,
        ttl: CacheTtlConfig,
    ) -> Self {
        Self {
            courses,
            lessons,
            users,
            enrollments,
            cache,
            ttl,
        }
    }

    pub async fn create(&self, request: CreateCourseRequest) -> CatalogResult<CourseResponse> {
        let instructor = self
            .users
            .get_by_id(request.instructor_id)
            .await?
            .ok_or(CatalogError::InstructorNotFound)?;

        let now = Utc::now();
        let course = Course {
            id: Uuid::new_v4(),
            title: request.title.trim().to_string(),
            description: non_blank(request.description),
            thumbnail: non_blank(request.thumbnail),
            instructor_id: instructor.id,
            price: request.price,
            level: non_blank(request.level),
            duration: request.duration,
            category: non_blank(request.category),
            created_at: now,
            updated_at: now,
        };

        self.courses.create(&course).await.map_err(|e| match e {
            StoreError::MissingReference(_) => CatalogError::InstructorNotFound,
            other => CatalogError::Store(other),
        })?;
        self.cache
            .invalidate(&[keys::COURSE_LIST_GENERATION, keys::FEATURED_COURSES])
            .await;

        log::info!("created course {} by instructor {}", course.id, course.instructor_id);
        Ok(CourseResponse::from_parts(course, Some(instructor.into()), &[]))
    }

    /// Detail projection with instructor and ordered lessons
    pub async fn get_by_id(&self, id: Uuid) -> CatalogResult<CourseResponse> {
        let key = keys::course(id);
        if let Some(course) = self.cache.read::<CourseResponse>(&key).await {
            return Ok(course);
        }

        let course = self.load(id).await?;
        let instructor = self.users.get_by_id(course.instructor_id).await?;
        let lessons = self.lessons.list_by_course(id).await?;
        let response = CourseResponse::from_parts(course, instructor.map(User::from), &lessons);

        self.cache.populate(&key, &response, self.ttl.course()).await;
        Ok(response)
    }

    /// Partial update; blank strings and zero numbers keep the stored value.
    ///
    /// Returns the same detail projection as [`CourseService::get_by_id`].
    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateCourseRequest,
    ) -> CatalogResult<CourseResponse> {
        let mut course = self.load(id).await?;

        if let Some(title) = non_blank(request.title) {
            course.title = title;
        }
        if let Some(description) = non_blank(request.description) {
            course.description = Some(description);
        }
        if let Some(thumbnail) = non_blank(request.thumbnail) {
            course.thumbnail = Some(thumbnail);
        }
        if let Some(price) = request.price.filter(|p| *p != 0.0) {
            course.price = price;
        }
        if let Some(level) = non_blank(request.level) {
            course.level = Some(level);
        }
        if let Some(duration) = request.duration.filter(|d| *d != 0) {
            course.duration = duration;
        }
        if let Some(category) = non_blank(request.category) {
            course.category = Some(category);
        }
        course.updated_at = Utc::now();

        if !self.courses.update(&course).await? {
            return Err(CatalogError::CourseNotFound);
        }
        self.invalidate_course(id).await;

        let instructor = self.users.get_by_id(course.instructor_id).await?;
        let lessons = self.lessons.list_by_course(id).await?;
        Ok(CourseResponse::from_parts(course, instructor.map(User::from), &lessons))
    }

    pub async fn delete(&self, id: Uuid) -> CatalogResult<()> {
        if !self.courses.delete(id).await? {
            return Err(CatalogError::CourseNotFound);
        }
        self.invalidate_course(id).await;

        log::info!("deleted course {}", id);
        Ok(())
    }

    /// One page of courses, newest first.
    ///
    /// Unfiltered pages are cached under the current list generation; pages
    /// filtered by category always come from the store.
    pub async fn list(
        &self,
        page: u32,
        page_size: u32,
        category: Option<&str>,
    ) -> CatalogResult<CoursePage> {
        let pagination = Pagination::new(page, page_size);

        if let Some(category) = category.map(str::trim).filter(|c| !c.is_empty()) {
            let (courses, total) = self.courses.list_by_category(category, pagination).await?;
            return Ok(CoursePage {
                courses: self.project(courses).await?,
                total,
            });
        }

        let generation = self.cache.course_list_generation(self.ttl.course_list()).await;
        let key = keys::course_list_page(&generation, pagination.page, pagination.per_page);
        if let Some(page) = self.cache.read::<CoursePage>(&key).await {
            return Ok(page);
        }

        let (courses, total) = self.courses.list(pagination).await?;
        let page = CoursePage {
            courses: self.project(courses).await?,
            total,
        };

        self.cache.populate(&key, &page, self.ttl.course_list()).await;
        Ok(page)
    }

    /// The newest courses
    pub async fn featured(&self) -> CatalogResult<Vec<CourseResponse>> {
        if let Some(courses) = self
            .cache
            .read::<Vec<CourseResponse>>(keys::FEATURED_COURSES)
            .await
        {
            return Ok(courses);
        }

        let (courses, _) = self
            .courses
            .list(Pagination::new(1, FEATURED_COUNT))
            .await?;
        let courses = self.project(courses).await?;

        self.cache
            .populate(keys::FEATURED_COURSES, &courses, self.ttl.featured())
            .await;
        Ok(courses)
    }

    pub async fn lessons(&self, course_id: Uuid) -> CatalogResult<Vec<LessonBrief>> {
        self.load(course_id).await?;
        let lessons = self.lessons.list_by_course(course_id).await?;
        Ok(lessons.iter().map(LessonBrief::from).collect())
    }

    pub async fn get_lesson(&self, id: Uuid) -> CatalogResult<Lesson> {
        self.lessons
            .get_by_id(id)
            .await?
            .ok_or(CatalogError::LessonNotFound)
    }

    pub async fn create_lesson(&self, request: CreateLessonRequest) -> CatalogResult<Lesson> {
        self.load(request.course_id).await?;

        let now = Utc::now();
        let lesson = Lesson {
            id: Uuid::new_v4(),
            course_id: request.course_id,
            title: request.title.trim().to_string(),
            description: non_blank(request.description),
            video_url: request.video_url,
            video_id: request.video_id,
            duration: request.duration,
            order_number: request.order_number,
            created_at: now,
            updated_at: now,
        };

        self.lessons.create(&lesson).await.map_err(|e| match e {
            StoreError::MissingReference(_) => CatalogError::CourseNotFound,
            other => CatalogError::Store(other),
        })?;
        self.cache.invalidate(&[keys::course(lesson.course_id)]).await;

        Ok(lesson)
    }

    pub async fn update_lesson(
        &self,
        id: Uuid,
        request: UpdateLessonRequest,
    ) -> CatalogResult<Lesson> {
        let mut lesson = self.get_lesson(id).await?;

        if let Some(title) = non_blank(request.title) {
            lesson.title = title;
        }
        if let Some(description) = non_blank(request.description) {
            lesson.description = Some(description);
        }
        if let Some(video_url) = non_blank(request.video_url) {
            lesson.video_url = video_url;
        }
        if let Some(video_id) = non_blank(request.video_id) {
            lesson.video_id = video_id;
        }
        if let Some(duration) = request.duration.filter(|d| *d != 0) {
            lesson.duration = duration;
        }
        if let Some(order_number) = request.order_number {
            lesson.order_number = order_number;
        }
        lesson.updated_at = Utc::now();

        if !self.lessons.update(&lesson).await? {
            return Err(CatalogError::LessonNotFound);
        }
        self.cache.invalidate(&[keys::course(lesson.course_id)]).await;

        Ok(lesson)
    }

    pub async fn delete_lesson(&self, id: Uuid) -> CatalogResult<()> {
        let lesson = self.get_lesson(id).await?;
        if !self.lessons.delete(id).await? {
            return Err(CatalogError::LessonNotFound);
        }
        self.cache.invalidate(&[keys::course(lesson.course_id)]).await;
        Ok(())
    }

    pub async fn enroll(&self, user_id: Uuid, course_id: Uuid) -> CatalogResult<Enrollment> {
        if self.enrollments.is_enrolled(user_id, course_id).await? {
            return Err(CatalogError::AlreadyEnrolled);
        }
        self.load(course_id).await?;

        let enrollment = Enrollment {
            id: Uuid::new_v4(),
            user_id,
            course_id,
            enrolled_at: Utc::now(),
        };

        self.enrollments.create(&enrollment).await.map_err(|e| {
            if e.is_duplicate_of(constraints::ENROLLMENTS_USER_COURSE) {
                CatalogError::AlreadyEnrolled
            } else {
                CatalogError::Store(e)
            }
        })?;

        log::info!("user {} enrolled in course {}", user_id, course_id);
        Ok(enrollment)
    }

    async fn load(&self, id: Uuid) -> CatalogResult<Course> {
        self.courses
            .get_by_id(id)
            .await?
            .ok_or(CatalogError::CourseNotFound)
    }

    /// List projections: instructor embedded, lessons omitted
    pub(crate) async fn project(&self, courses: Vec<Course>) -> CatalogResult<Vec<CourseResponse>> {
        let mut instructor_ids: Vec<Uuid> = courses.iter().map(|c| c.instructor_id).collect();
        instructor_ids.sort_unstable();
        instructor_ids.dedup();

        let instructors: HashMap<Uuid, User> = self
            .users
            .get_many(&instructor_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, User::from(u)))
            .collect();

        Ok(courses
            .into_iter()
            .map(|course| {
                let instructor = instructors.get(&course.instructor_id).cloned();
                CourseResponse::from_parts(course, instructor, &[])
            })
            .collect())
    }

    async fn invalidate_course(&self, id: Uuid) {
        self.cache
            .invalidate(&[
                keys::course(id),
                keys::COURSE_LIST_GENERATION.to_string(),
                keys::FEATURED_COURSES.to_string(),
            ])
            .await;
    }
}

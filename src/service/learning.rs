//! Learning Service
//!
//! Enrollment listings and per-lesson watch progress.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::catalog::{CatalogError, CatalogResult};
use super::course::CourseService;
use crate::database::Pagination;
use crate::models::{CourseProgress, EnrollmentResponse, Lesson, Progress};
use crate::repository::{EnrollmentStore, ProgressStore};

#[derive(Clone)]
pub struct LearningService {
    enrollments: Arc<dyn EnrollmentStore>,
    progress: Arc<dyn ProgressStore>,
    courses: CourseService,
}

impl LearningService {
    pub fn new(
        enrollments: Arc<dyn EnrollmentStore>,
        progress: Arc<dyn ProgressStore>,
        courses: CourseService,
    ) -> Self {
        Self {
            enrollments,
            progress,
            courses,
        }
    }

    /// The user's enrollments, newest first, each with its course
    pub async fn enrollments(
        &self,
        user_id: Uuid,
        page: Pagination,
    ) -> CatalogResult<(Vec<EnrollmentResponse>, i64)> {
        let (enrollments, total) = self.enrollments.list_by_user(user_id, page).await?;

        let mut responses = Vec::with_capacity(enrollments.len());
        for enrollment in enrollments {
            let course = match self.courses.get_by_id(enrollment.course_id).await {
                Ok(course) => Some(course),
                Err(CatalogError::CourseNotFound) => None,
                Err(e) => return Err(e),
            };
            responses.push(EnrollmentResponse {
                id: enrollment.id,
                course_id: enrollment.course_id,
                enrolled_at: enrollment.enrolled_at,
                course,
            });
        }

        Ok((responses, total))
    }

    /// Stored progress, or an untouched record when the lesson was never opened
    pub async fn lesson_progress(&self, user_id: Uuid, lesson_id: Uuid) -> CatalogResult<Progress> {
        self.courses.get_lesson(lesson_id).await?;
        Ok(self
            .progress
            .get(user_id, lesson_id)
            .await?
            .unwrap_or_else(|| Progress::start(user_id, lesson_id)))
    }

    /// Record the playback position, creating the row on first touch
    pub async fn update_position(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
        position_seconds: i32,
    ) -> CatalogResult<Progress> {
        if position_seconds < 0 {
            return Err(CatalogError::Validation(
                "position cannot be negative".to_string(),
            ));
        }

        let mut progress = self.touch(user_id, lesson_id).await?;
        progress.position_seconds = position_seconds;
        progress.last_watched_at = Utc::now();

        self.progress.upsert(&progress).await?;
        Ok(progress)
    }

    pub async fn complete_lesson(&self, user_id: Uuid, lesson_id: Uuid) -> CatalogResult<Progress> {
        let mut progress = self.touch(user_id, lesson_id).await?;
        progress.completed = true;
        progress.last_watched_at = Utc::now();

        self.progress.upsert(&progress).await?;
        log::debug!("user {} completed lesson {}", user_id, lesson_id);
        Ok(progress)
    }

    pub async fn course_progress(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> CatalogResult<CourseProgress> {
        let lessons = self.courses.lessons(course_id).await?;
        let lesson_ids: Vec<Uuid> = lessons.iter().map(|l| l.id).collect();
        let progress = self.progress.list_for_lessons(user_id, &lesson_ids).await?;

        Ok(CourseProgress::summarize(course_id, lessons.len(), progress))
    }

    /// Existing or fresh progress for a lesson the user is enrolled in
    async fn touch(&self, user_id: Uuid, lesson_id: Uuid) -> CatalogResult<Progress> {
        let lesson: Lesson = self.courses.get_lesson(lesson_id).await?;
        if !self
            .enrollments
            .is_enrolled(user_id, lesson.course_id)
            .await?
        {
            return Err(CatalogError::NotEnrolled);
        }

        Ok(self
            .progress
            .get(user_id, lesson_id)
            .await?
            .unwrap_or_else(|| Progress::start(user_id, lesson_id)))
    }
}

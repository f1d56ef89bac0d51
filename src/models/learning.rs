//! Learning Models
//!
//! Enrollments and per-lesson progress.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::catalog::CourseResponse;

/// A user's enrollment in a course
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Enrollment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub enrolled_at: DateTime<Utc>,
}

/// Enrollment with its course projection
#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentResponse {
    pub id: Uuid,
    pub course_id: Uuid,
    pub enrolled_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course: Option<CourseResponse>,
}

/// Watch progress of one user on one lesson
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Progress {
    pub id: Uuid,
    pub user_id: Uuid,
    pub lesson_id: Uuid,
    pub position_seconds: i32,
    pub completed: bool,
    pub last_watched_at: DateTime<Utc>,
}

impl Progress {
    /// Fresh, untouched progress row for a lesson
    pub fn start(user_id: Uuid, lesson_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            lesson_id,
            position_seconds: 0,
            completed: false,
            last_watched_at: Utc::now(),
        }
    }
}

/// Completion summary of a course for one user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseProgress {
    pub course_id: Uuid,
    pub total_lessons: usize,
    pub completed_lessons: usize,
    /// Whole percent, 0 when the course has no lessons
    pub percent_complete: u8,
    pub lessons: Vec<Progress>,
}

impl CourseProgress {
    pub fn summarize(course_id: Uuid, total_lessons: usize, lessons: Vec<Progress>) -> Self {
        let completed_lessons = lessons.iter().filter(|p| p.completed).count();
        let percent_complete = if total_lessons == 0 {
            0
        } else {
            ((completed_lessons.min(total_lessons) * 100) / total_lessons) as u8
        };

        Self {
            course_id,
            total_lessons,
            completed_lessons,
            percent_complete,
            lessons,
        }
    }
}

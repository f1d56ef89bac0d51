//! Catalog Models
//!
//! Categories, courses and lessons, plus the cached response projections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::User;

/// Course category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub slug: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Course row
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    pub instructor_id: Uuid,
    pub price: f64,
    /// beginner, intermediate, advanced
    pub level: Option<String>,
    /// Total minutes
    pub duration: i32,
    /// Category name
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lesson row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Lesson {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub video_url: String,
    pub video_id: String,
    /// Minutes
    pub duration: i32,
    pub order_number: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lesson summary embedded in course responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonBrief {
    pub id: Uuid,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub duration: i32,
    pub order_number: i32,
}

impl From<&Lesson> for LessonBrief {
    fn from(lesson: &Lesson) -> Self {
        Self {
            id: lesson.id,
            title: lesson.title.clone(),
            description: lesson.description.clone(),
            duration: lesson.duration,
            order_number: lesson.order_number,
        }
    }
}

/// Course projection served to clients and stored in the cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseResponse {
    pub id: Uuid,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    pub instructor_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructor: Option<User>,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    pub duration: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lessons: Vec<LessonBrief>,
}

impl CourseResponse {
    /// Builds the projection from a course row and its optional relations
    pub fn from_parts(course: Course, instructor: Option<User>, lessons: &[Lesson]) -> Self {
        Self {
            id: course.id,
            title: course.title,
            description: course.description,
            thumbnail: course.thumbnail,
            instructor_id: course.instructor_id,
            instructor,
            price: course.price,
            level: course.level,
            duration: course.duration,
            category: course.category,
            created_at: course.created_at,
            updated_at: course.updated_at,
            lessons: lessons.iter().map(LessonBrief::from).collect(),
        }
    }
}

/// One page of courses together with the unpaginated total
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoursePage {
    pub courses: Vec<CourseResponse>,
    pub total: i64,
}

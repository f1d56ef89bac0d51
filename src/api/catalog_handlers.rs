//! Catalog Handlers
//!
//! Public category and course browsing, enrollment, and the admin endpoints
//! that manage categories, courses and lessons.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;

use super::handlers::{ok, validated, AppState, SuccessResponse};
use super::middleware::AuthUser;
use crate::database::Pagination;
use crate::models::{
    Category, CourseListQuery, CourseResponse, CreateCategoryRequest, CreateCourseRequest,
    CreateLessonRequest, Enrollment, Lesson, LessonBrief, MessageResponse, PaginatedResponse,
    UpdateCategoryRequest, UpdateCourseRequest, UpdateLessonRequest,
};
use crate::utils::error::AppResult;

type Envelope<T> = Json<SuccessResponse<T>>;

// Categories

pub async fn list_categories(State(state): State<AppState>) -> AppResult<Envelope<Vec<Category>>> {
    Ok(ok(state.category_service.list().await?))
}

pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Envelope<Category>> {
    Ok(ok(state.category_service.get_by_id(id).await?))
}

pub async fn get_category_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Envelope<Category>> {
    Ok(ok(state.category_service.get_by_slug(&slug).await?))
}

pub async fn create_category(
    State(state): State<AppState>,
    Json(request): Json<CreateCategoryRequest>,
) -> AppResult<(StatusCode, Envelope<Category>)> {
    let request = validated(request)?;
    let category = state.category_service.create(request).await?;
    Ok((StatusCode::CREATED, ok(category)))
}

pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateCategoryRequest>,
) -> AppResult<Envelope<Category>> {
    let request = validated(request)?;
    Ok(ok(state.category_service.update(id, request).await?))
}

pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Envelope<MessageResponse>> {
    state.category_service.delete(id).await?;
    Ok(ok(MessageResponse::new("category deleted successfully")))
}

// Courses

pub async fn list_courses(
    State(state): State<AppState>,
    Query(query): Query<CourseListQuery>,
) -> AppResult<Envelope<PaginatedResponse<CourseResponse>>> {
    let pagination = Pagination::new(query.page, query.page_size);
    let page = state
        .course_service
        .list(
            pagination.page,
            pagination.per_page,
            query.category.as_deref(),
        )
        .await?;
    Ok(ok(PaginatedResponse {
        items: page.courses,
        total: page.total,
        page: pagination.page,
        page_size: pagination.per_page,
    }))
}

pub async fn featured_courses(
    State(state): State<AppState>,
) -> AppResult<Envelope<Vec<CourseResponse>>> {
    Ok(ok(state.course_service.featured().await?))
}

pub async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Envelope<CourseResponse>> {
    Ok(ok(state.course_service.get_by_id(id).await?))
}

pub async fn course_lessons(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Envelope<Vec<LessonBrief>>> {
    Ok(ok(state.course_service.lessons(id).await?))
}

pub async fn enroll(
    State(state): State<AppState>,
    Extension(AuthUser(caller)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> AppResult<(StatusCode, Envelope<Enrollment>)> {
    let enrollment = state.course_service.enroll(caller.user_id, id).await?;
    Ok((StatusCode::CREATED, ok(enrollment)))
}

pub async fn create_course(
    State(state): State<AppState>,
    Json(request): Json<CreateCourseRequest>,
) -> AppResult<(StatusCode, Envelope<CourseResponse>)> {
    let request = validated(request)?;
    let course = state.course_service.create(request).await?;
    Ok((StatusCode::CREATED, ok(course)))
}

pub async fn update_course(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateCourseRequest>,
) -> AppResult<Envelope<CourseResponse>> {
    let request = validated(request)?;
    Ok(ok(state.course_service.update(id, request).await?))
}

pub async fn delete_course(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Envelope<MessageResponse>> {
    state.course_service.delete(id).await?;
    Ok(ok(MessageResponse::new("course deleted successfully")))
}

// Lessons

pub async fn create_lesson(
    State(state): State<AppState>,
    Json(request): Json<CreateLessonRequest>,
) -> AppResult<(StatusCode, Envelope<Lesson>)> {
    let request = validated(request)?;
    let lesson = state.course_service.create_lesson(request).await?;
    Ok((StatusCode::CREATED, ok(lesson)))
}

pub async fn update_lesson(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateLessonRequest>,
) -> AppResult<Envelope<Lesson>> {
    let request = validated(request)?;
    Ok(ok(state.course_service.update_lesson(id, request).await?))
}

pub async fn delete_lesson(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Envelope<MessageResponse>> {
    state.course_service.delete_lesson(id).await?;
    Ok(ok(MessageResponse::new("lesson deleted successfully")))
}

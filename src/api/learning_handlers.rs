//! Learning Handlers

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use uuid::Uuid;

use super::handlers::{ok, validated, AppState, SuccessResponse};
use super::middleware::AuthUser;
use crate::database::Pagination;
use crate::models::{
    CourseProgress, EnrollmentResponse, PageQuery, PaginatedResponse, Progress,
    UpdateProgressRequest,
};
use crate::utils::error::AppResult;

type Envelope<T> = Json<SuccessResponse<T>>;

pub async fn my_enrollments(
    State(state): State<AppState>,
    Extension(AuthUser(caller)): Extension<AuthUser>,
    Query(query): Query<PageQuery>,
) -> AppResult<Envelope<PaginatedResponse<EnrollmentResponse>>> {
    let page = Pagination::new(query.page, query.page_size);
    let (items, total) = state
        .learning_service
        .enrollments(caller.user_id, page)
        .await?;
    Ok(ok(PaginatedResponse {
        items,
        total,
        page: page.page,
        page_size: page.per_page,
    }))
}

pub async fn lesson_progress(
    State(state): State<AppState>,
    Extension(AuthUser(caller)): Extension<AuthUser>,
    Path(lesson_id): Path<Uuid>,
) -> AppResult<Envelope<Progress>> {
    let progress = state
        .learning_service
        .lesson_progress(caller.user_id, lesson_id)
        .await?;
    Ok(ok(progress))
}

pub async fn update_progress(
    State(state): State<AppState>,
    Extension(AuthUser(caller)): Extension<AuthUser>,
    Path(lesson_id): Path<Uuid>,
    Json(request): Json<UpdateProgressRequest>,
) -> AppResult<Envelope<Progress>> {
    let request = validated(request)?;
    let progress = state
        .learning_service
        .update_position(caller.user_id, lesson_id, request.position_seconds)
        .await?;
    Ok(ok(progress))
}

pub async fn complete_lesson(
    State(state): State<AppState>,
    Extension(AuthUser(caller)): Extension<AuthUser>,
    Path(lesson_id): Path<Uuid>,
) -> AppResult<Envelope<Progress>> {
    let progress = state
        .learning_service
        .complete_lesson(caller.user_id, lesson_id)
        .await?;
    Ok(ok(progress))
}

pub async fn course_progress(
    State(state): State<AppState>,
    Extension(AuthUser(caller)): Extension<AuthUser>,
    Path(course_id): Path<Uuid>,
) -> AppResult<Envelope<CourseProgress>> {
    let summary = state
        .learning_service
        .course_progress(caller.user_id, course_id)
        .await?;
    Ok(ok(summary))
}

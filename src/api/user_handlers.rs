//! User Handlers
//!
//! The caller's own profile plus administrative user management.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use uuid::Uuid;

use super::handlers::{ok, validated, AppState, SuccessResponse};
use super::middleware::AuthUser;
use crate::database::Pagination;
use crate::models::{
    AdminUpdateUserRequest, MessageResponse, PageQuery, PaginatedResponse, UpdateProfileRequest,
    User,
};
use crate::utils::error::AppResult;

type Envelope<T> = Json<SuccessResponse<T>>;

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(AuthUser(caller)): Extension<AuthUser>,
) -> AppResult<Envelope<User>> {
    let user = state.user_service.get_by_id(caller.user_id).await?;
    Ok(ok(user))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(AuthUser(caller)): Extension<AuthUser>,
    Json(request): Json<UpdateProfileRequest>,
) -> AppResult<Envelope<User>> {
    let request = validated(request)?;
    let user = state
        .user_service
        .update_profile(caller.user_id, request)
        .await?;
    Ok(ok(user))
}

pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Envelope<PaginatedResponse<User>>> {
    let page = Pagination::new(query.page, query.page_size);
    let (items, total) = state.user_service.list(page).await?;
    Ok(ok(PaginatedResponse {
        items,
        total,
        page: page.page,
        page_size: page.per_page,
    }))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Envelope<User>> {
    Ok(ok(state.user_service.get_by_id(id).await?))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AdminUpdateUserRequest>,
) -> AppResult<Envelope<User>> {
    let request = validated(request)?;
    Ok(ok(state.user_service.admin_update(id, request).await?))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Envelope<MessageResponse>> {
    state.user_service.delete(id).await?;
    Ok(ok(MessageResponse::new("user deleted successfully")))
}

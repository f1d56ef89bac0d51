//! Authentication Handlers
//!
//! Registration, login, token rotation, logout and password reset.

use axum::{extract::State, http::StatusCode, Json};

use super::handlers::{ok, validated, AppState, SuccessResponse};
use crate::models::{
    ForgotPasswordRequest, LoginRequest, MessageResponse, RefreshTokenRequest, RegisterRequest,
    ResetPasswordRequest, TokenPair,
};
use crate::utils::error::AppResult;

type Envelope<T> = Json<SuccessResponse<T>>;

pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Envelope<TokenPair>)> {
    let request = validated(request)?;
    let tokens = state.auth_service.register(request).await?;
    Ok((StatusCode::CREATED, ok(tokens)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Envelope<TokenPair>> {
    let request = validated(request)?;
    let tokens = state
        .auth_service
        .login(&request.email, &request.password)
        .await?;
    Ok(ok(tokens))
}

pub async fn refresh_token(
    State(state): State<AppState>,
    Json(request): Json<RefreshTokenRequest>,
) -> AppResult<Envelope<TokenPair>> {
    let request = validated(request)?;
    let tokens = state
        .auth_service
        .refresh_token(&request.refresh_token)
        .await?;
    Ok(ok(tokens))
}

pub async fn logout(
    State(state): State<AppState>,
    Json(request): Json<RefreshTokenRequest>,
) -> AppResult<Envelope<MessageResponse>> {
    let request = validated(request)?;
    state.auth_service.logout(&request.refresh_token).await?;
    Ok(ok(MessageResponse::new("logged out successfully")))
}

/// Always answers with the same message so it never reveals whether an email is registered
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(request): Json<ForgotPasswordRequest>,
) -> AppResult<Envelope<MessageResponse>> {
    let request = validated(request)?;
    // Token delivery is out of band; the token never goes back to the caller
    state.auth_service.forgot_password(&request.email).await?;
    Ok(ok(MessageResponse::new(
        "if your email is registered, you will receive a password reset link",
    )))
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(request): Json<ResetPasswordRequest>,
) -> AppResult<Envelope<MessageResponse>> {
    let request = validated(request)?;
    state
        .auth_service
        .reset_password(&request.token, &request.password)
        .await?;
    Ok(ok(MessageResponse::new("password reset successfully")))
}

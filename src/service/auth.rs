//! Session and Token Management
//!
//! Registration, login, refresh-token rotation, logout and password reset.
//! Access tokens are stateless JWTs; refresh tokens are opaque, single-use
//! and persisted by fingerprint.

use chrono::{Duration, Utc};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::cache::{keys, CacheError, CacheLayer};
use crate::models::{
    PasswordResetGrant, RefreshToken, RegisterRequest, TokenPair, User, UserContext,
    UserWithPassword,
};
use crate::repository::{constraints, RefreshTokenStore, StoreError, UserStore};
use crate::service::jwt::{JwtError, JwtService};
use crate::utils::{
    error::AppError,
    security::{
        generate_refresh_token, generate_reset_token, hash_password_with_cost,
        hash_sensitive_data, verify_password, DEFAULT_BCRYPT_COST,
    },
    validation::normalize_email,
};

/// Errors raised by the session manager
#[derive(Error, Debug)]
pub enum AuthServiceError {
    #[error("Email already registered")]
    DuplicateEmail,

    /// Unknown email and wrong password are indistinguishable
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    #[error("Refresh token expired")]
    RefreshTokenExpired,

    /// Reset grant missing, expired or already consumed
    #[error("Invalid or expired reset token")]
    InvalidOrExpiredToken,

    #[error("User not found")]
    UserNotFound,

    #[error("Invalid access token: {0}")]
    InvalidToken(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Password hashing error: {0}")]
    Hashing(#[from] bcrypt::BcryptError),

    #[error("Token generation error: {0}")]
    TokenGeneration(String),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

impl From<JwtError> for AuthServiceError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::TokenGeneration(msg) => AuthServiceError::TokenGeneration(msg),
            JwtError::InvalidToken(msg) => AuthServiceError::InvalidToken(msg),
        }
    }
}

impl From<AuthServiceError> for AppError {
    fn from(err: AuthServiceError) -> Self {
        match err {
            AuthServiceError::DuplicateEmail => {
                AppError::Conflict("Email already registered".to_string())
            }
            AuthServiceError::InvalidCredentials => {
                AppError::Authentication("Invalid email or password".to_string())
            }
            AuthServiceError::InvalidRefreshToken => {
                AppError::Authentication("Invalid refresh token".to_string())
            }
            AuthServiceError::RefreshTokenExpired => {
                AppError::Authentication("Refresh token expired".to_string())
            }
            AuthServiceError::InvalidOrExpiredToken => {
                AppError::Validation("Invalid or expired reset token".to_string())
            }
            AuthServiceError::UserNotFound => AppError::NotFound("User not found".to_string()),
            AuthServiceError::InvalidToken(_) => {
                AppError::Authentication("Invalid or expired token".to_string())
            }
            AuthServiceError::Validation(msg) => AppError::Validation(msg),
            AuthServiceError::Store(e) => AppError::Internal(format!("store: {}", e)),
            AuthServiceError::Hashing(e) => AppError::Internal(format!("password hashing: {}", e)),
            AuthServiceError::TokenGeneration(msg) => {
                AppError::Internal(format!("token generation: {}", msg))
            }
            AuthServiceError::Cache(e) => AppError::Internal(format!("cache: {}", e)),
        }
    }
}

pub type AuthServiceResult<T> = Result<T, AuthServiceError>;

/// Issues, rotates and revokes credentials
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    cache: CacheLayer,
    jwt: JwtService,
    refresh_token_expires_in: Duration,
    reset_token_ttl: std::time::Duration,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        cache: CacheLayer,
        jwt: JwtService,
        refresh_token_expires_in: Duration,
        reset_token_ttl: std::time::Duration,
    ) -> Self {
        Self {
            users,
            refresh_tokens,
            cache,
            jwt,
            refresh_token_expires_in,
            reset_token_ttl,
            bcrypt_cost: DEFAULT_BCRYPT_COST,
        }
    }

    /// Override the bcrypt work factor
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    /// Create an account and sign it in. Learners and instructors may sign
    /// up; administrators are created by an operator.
    pub async fn register(&self, request: RegisterRequest) -> AuthServiceResult<TokenPair> {
        let role = request.role.unwrap_or_default();
        if role.is_admin() {
            return Err(AuthServiceError::Validation(
                "administrator accounts cannot be self-registered".to_string(),
            ));
        }

        let email = normalize_email(&request.email);

        if self.users.get_by_email(&email).await?.is_some() {
            return Err(AuthServiceError::DuplicateEmail);
        }

        let password_hash = hash_password_with_cost(&request.password, self.bcrypt_cost)?;
        let now = Utc::now();
        let user = UserWithPassword {
            id: Uuid::new_v4(),
            email,
            password_hash,
            full_name: request.full_name.trim().to_string(),
            role,
            profile_picture: request.profile_picture.filter(|p| !p.is_empty()),
            created_at: now,
            updated_at: now,
        };

        self.users.create(&user).await.map_err(|e| {
            if e.is_duplicate_of(constraints::USERS_EMAIL) {
                AuthServiceError::DuplicateEmail
            } else {
                AuthServiceError::Store(e)
            }
        })?;

        log::info!("registered user {} as {}", user.id, user.role);

        self.issue_token_pair(&user).await
    }

    /// Exchange email and password for a token pair
    pub async fn login(&self, email: &str, password: &str) -> AuthServiceResult<TokenPair> {
        let email = normalize_email(email);

        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or(AuthServiceError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash)? {
            return Err(AuthServiceError::InvalidCredentials);
        }

        log::info!("user {} logged in", user.id);

        self.issue_token_pair(&user).await
    }

    /// Rotate a refresh token. The presented token is consumed even when
    /// issuing the new pair fails afterwards.
    pub async fn refresh_token(&self, token: &str) -> AuthServiceResult<TokenPair> {
        let stored = self
            .refresh_tokens
            .get_by_token_hash(&hash_sensitive_data(token))
            .await?
            .ok_or_else(|| {
                log::warn!("refresh attempted with unknown token");
                AuthServiceError::InvalidRefreshToken
            })?;

        if stored.is_expired_at(Utc::now()) {
            log::warn!("refresh attempted with expired token {}", stored.id);
            return Err(AuthServiceError::RefreshTokenExpired);
        }

        if !self.refresh_tokens.delete(stored.id).await? {
            log::warn!("refresh token {} was already consumed", stored.id);
            return Err(AuthServiceError::InvalidRefreshToken);
        }

        let user = self
            .users
            .get_by_id(stored.user_id)
            .await?
            .ok_or(AuthServiceError::InvalidRefreshToken)?;

        self.issue_token_pair(&user).await
    }

    /// Revoke a refresh token. Unknown tokens are ignored.
    pub async fn logout(&self, token: &str) -> AuthServiceResult<()> {
        if let Some(stored) = self
            .refresh_tokens
            .get_by_token_hash(&hash_sensitive_data(token))
            .await?
        {
            self.refresh_tokens.delete(stored.id).await?;
            log::info!("user {} logged out", stored.user_id);
        }

        Ok(())
    }

    /// Start a password reset.
    ///
    /// Returns the one-time token for out-of-band delivery, or `None` when the
    /// email is unknown. Callers must not reveal which case occurred.
    pub async fn forgot_password(&self, email: &str) -> AuthServiceResult<Option<String>> {
        let email = normalize_email(email);

        let Some(user) = self.users.get_by_email(&email).await? else {
            log::info!("password reset requested for unknown email");
            return Ok(None);
        };

        let token = generate_reset_token();
        let grant = PasswordResetGrant {
            user_id: user.id,
            email: user.email.clone(),
        };

        self.cache
            .store(&keys::reset_token(&token), &grant, self.reset_token_ttl)
            .await?;

        log::info!("password reset grant issued for user {}", user.id);

        Ok(Some(token))
    }

    /// Consume a reset grant, set the new password and revoke every session.
    ///
    /// The grant is removed before anything else happens, so it is spent
    /// even if a later step fails. A cache failure while removing it aborts
    /// the reset with the password unchanged.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> AuthServiceResult<()> {
        let grant: PasswordResetGrant = self
            .cache
            .take(&keys::reset_token(token))
            .await?
            .ok_or(AuthServiceError::InvalidOrExpiredToken)?;

        let mut user = self
            .users
            .get_by_id(grant.user_id)
            .await?
            .ok_or(AuthServiceError::UserNotFound)?;

        user.password_hash = hash_password_with_cost(new_password, self.bcrypt_cost)?;
        user.updated_at = Utc::now();

        if !self.users.update(&user).await? {
            return Err(AuthServiceError::UserNotFound);
        }

        let revoked = self.refresh_tokens.delete_all_by_user(user.id).await?;
        log::info!(
            "password reset for user {}, {} sessions revoked",
            user.id,
            revoked
        );

        Ok(())
    }

    /// Verify an access token and extract the caller
    pub fn validate_access_token(&self, token: &str) -> AuthServiceResult<UserContext> {
        Ok(self.jwt.validate_access_token(token)?)
    }

    async fn issue_token_pair(&self, user: &UserWithPassword) -> AuthServiceResult<TokenPair> {
        let access = self.jwt.issue_access_token(user)?;

        let raw_token = generate_refresh_token();
        let now = Utc::now();
        let refresh = RefreshToken {
            id: Uuid::new_v4(),
            user_id: user.id,
            token_hash: hash_sensitive_data(&raw_token),
            expires_at: now + self.refresh_token_expires_in,
            created_at: now,
        };

        self.refresh_tokens.create(&refresh).await?;

        Ok(TokenPair::new(
            access.token,
            raw_token,
            refresh.expires_at,
            User::from(user),
        ))
    }
}

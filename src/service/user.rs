//! User Service Implementation
//!
//! Profile reads and updates plus administrative user management.

use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::database::Pagination;
use crate::models::{AdminUpdateUserRequest, Role, UpdateProfileRequest, User, UserWithPassword};
use crate::repository::{RefreshTokenStore, StoreError, UserStore};
use crate::utils::{
    error::AppError,
    security::{hash_password_with_cost, DEFAULT_BCRYPT_COST},
    validation::non_blank,
};

/// Custom error types for the user service
#[derive(Error, Debug)]
pub enum UserServiceError {
    /// User with the specified identifier was not found
    #[error("User not found")]
    UserNotFound,

    /// Input validation failed with detailed error message
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Password hashing operation failed
    #[error("Password hashing error: {0}")]
    Hashing(#[from] bcrypt::BcryptError),
}

impl From<UserServiceError> for AppError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::UserNotFound => AppError::NotFound("User not found".to_string()),
            UserServiceError::Validation(msg) => AppError::Validation(msg),
            UserServiceError::Store(e) => AppError::Internal(format!("store: {}", e)),
            UserServiceError::Hashing(e) => AppError::Internal(format!("password hashing: {}", e)),
        }
    }
}

/// Result type for user service operations
pub type UserServiceResult<T> = Result<T, UserServiceError>;

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserStore>,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    bcrypt_cost: u32,
}

impl UserService {
    pub fn new(users: Arc<dyn UserStore>, refresh_tokens: Arc<dyn RefreshTokenStore>) -> Self {
        Self {
            users,
            refresh_tokens,
            bcrypt_cost: DEFAULT_BCRYPT_COST,
        }
    }

    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    pub async fn get_by_id(&self, id: Uuid) -> UserServiceResult<User> {
        Ok(self.load(id).await?.into())
    }

    /// Update the caller's own profile; empty fields are left untouched
    pub async fn update_profile(
        &self,
        id: Uuid,
        request: UpdateProfileRequest,
    ) -> UserServiceResult<User> {
        let mut user = self.load(id).await?;

        if let Some(full_name) = non_blank(request.full_name) {
            user.full_name = full_name;
        }
        if let Some(picture) = non_blank(request.profile_picture) {
            user.profile_picture = Some(picture);
        }
        if let Some(password) = non_blank(request.password) {
            user.password_hash = hash_password_with_cost(&password, self.bcrypt_cost)?;
        }

        self.save(user).await
    }

    /// Administrative update, including the role
    pub async fn admin_update(
        &self,
        id: Uuid,
        request: AdminUpdateUserRequest,
    ) -> UserServiceResult<User> {
        let mut user = self.load(id).await?;

        if let Some(full_name) = non_blank(request.full_name) {
            user.full_name = full_name;
        }
        if let Some(picture) = non_blank(request.profile_picture) {
            user.profile_picture = Some(picture);
        }
        if let Some(role) = request.role {
            user.role = role;
        }

        self.save(user).await
    }

    pub async fn set_role(&self, id: Uuid, role: Role) -> UserServiceResult<User> {
        let mut user = self.load(id).await?;
        user.role = role;
        let user = self.save(user).await?;
        log::info!("role of user {} set to {}", user.id, user.role);
        Ok(user)
    }

    pub async fn list(&self, page: Pagination) -> UserServiceResult<(Vec<User>, i64)> {
        let (users, total) = self.users.list(page).await?;
        Ok((users.into_iter().map(User::from).collect(), total))
    }

    /// Delete a user together with every session it holds
    pub async fn delete(&self, id: Uuid) -> UserServiceResult<()> {
        self.refresh_tokens.delete_all_by_user(id).await?;

        if !self.users.delete(id).await? {
            return Err(UserServiceError::UserNotFound);
        }

        log::info!("deleted user {}", id);
        Ok(())
    }

    /// Revoke every refresh token of a user; returns how many were removed
    pub async fn revoke_sessions(&self, id: Uuid) -> UserServiceResult<u64> {
        self.load(id).await?;
        let revoked = self.refresh_tokens.delete_all_by_user(id).await?;
        log::info!("revoked {} sessions of user {}", revoked, id);
        Ok(revoked)
    }

    async fn load(&self, id: Uuid) -> UserServiceResult<UserWithPassword> {
        self.users
            .get_by_id(id)
            .await?
            .ok_or(UserServiceError::UserNotFound)
    }

    async fn save(&self, mut user: UserWithPassword) -> UserServiceResult<User> {
        user.updated_at = Utc::now();
        if !self.users.update(&user).await? {
            return Err(UserServiceError::UserNotFound);
        }
        Ok(user.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RefreshToken;
    use crate::repository::memory::MemoryStores;
    use crate::utils::security::verify_password;
    use chrono::Duration;

    async fn seeded() -> (UserService, MemoryStores, UserWithPassword) {
        let stores = MemoryStores::new();
        let user = UserWithPassword {
            id: Uuid::new_v4(),
            email: "a@x.com".to_string(),
            password_hash: hash_password_with_cost("secret1", 4).unwrap(),
            full_name: "Alice".to_string(),
            role: Role::User,
            profile_picture: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        stores.users.create(&user).await.unwrap();

        let service = UserService::new(stores.users.clone(), stores.refresh_tokens.clone())
            .with_bcrypt_cost(4);
        (service, stores, user)
    }

    #[tokio::test]
    async fn test_update_profile_ignores_empty_fields() {
        let (service, stores, user) = seeded().await;

        let updated = service
            .update_profile(
                user.id,
                UpdateProfileRequest {
                    full_name: Some("  ".to_string()),
                    password: Some("newsecret".to_string()),
                    profile_picture: Some("https://cdn.example.com/a.png".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.full_name, "Alice");
        assert_eq!(
            updated.profile_picture.as_deref(),
            Some("https://cdn.example.com/a.png")
        );

        let stored = stores.users.get_by_id(user.id).await.unwrap().unwrap();
        assert!(verify_password("newsecret", &stored.password_hash).unwrap());
    }

    #[tokio::test]
    async fn test_admin_update_changes_role() {
        let (service, _, user) = seeded().await;

        let updated = service
            .admin_update(
                user.id,
                AdminUpdateUserRequest {
                    role: Some(Role::Instructor),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.role, Role::Instructor);
    }

    #[tokio::test]
    async fn test_missing_user_is_not_found() {
        let (service, _, _) = seeded().await;

        assert!(matches!(
            service.get_by_id(Uuid::new_v4()).await,
            Err(UserServiceError::UserNotFound)
        ));
        assert!(matches!(
            service.delete(Uuid::new_v4()).await,
            Err(UserServiceError::UserNotFound)
        ));
    }

    #[tokio::test]
    async fn test_delete_revokes_sessions() {
        let (service, stores, user) = seeded().await;
        stores
            .refresh_tokens
            .create(&RefreshToken {
                id: Uuid::new_v4(),
                user_id: user.id,
                token_hash: "fp".to_string(),
                expires_at: Utc::now() + Duration::hours(1),
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        service.delete(user.id).await.unwrap();

        assert!(stores
            .refresh_tokens
            .get_by_token_hash("fp")
            .await
            .unwrap()
            .is_none());
        let (users, total) = service.list(Pagination::new(1, 10)).await.unwrap();
        assert!(users.is_empty());
        assert_eq!(total, 0);
    }
}

//! Authentication Models
//!
//! Data structures for JWT access tokens, persisted refresh tokens and
//! password reset grants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::{Role, User};

/// Persisted refresh token row
///
/// One row per active session grant. The raw token is only ever returned to
/// the client; the store keeps its SHA-256 fingerprint.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RefreshToken {
    /// Unique identifier for the row
    pub id: Uuid,

    /// Owning user
    pub user_id: Uuid,

    /// SHA-256 hex digest of the opaque token
    pub token_hash: String,

    /// Absolute expiry
    pub expires_at: DateTime<Utc>,

    /// Timestamp when the token was issued
    pub created_at: DateTime<Utc>,
}

impl RefreshToken {
    /// Expiry is derived at lookup time, never stored as a state
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// Credentials returned after register, login and refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    /// Short-lived signed access token
    pub access_token: String,

    /// Long-lived opaque refresh token (single use)
    pub refresh_token: String,

    /// Token type (always "Bearer")
    pub token_type: String,

    /// Refresh token expiry
    pub expires_at: DateTime<Utc>,

    /// Public view of the authenticated user
    pub user: User,
}

impl TokenPair {
    pub fn new(
        access_token: String,
        refresh_token: String,
        expires_at: DateTime<Utc>,
        user: User,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_at,
            user,
        }
    }
}

/// JWT claims for access tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject - user ID
    pub sub: String,

    /// User ID (duplicated from `sub` for clients reading the payload)
    pub user_id: Uuid,

    pub email: String,

    pub role: Role,

    /// Issuer
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// JWT ID - unique token identifier
    pub jti: String,
}

impl AccessTokenClaims {
    pub fn new(
        user_id: Uuid,
        email: &str,
        role: Role,
        issuer: &str,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            sub: user_id.to_string(),
            user_id,
            email: email.to_string(),
            role,
            iss: issuer.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
        }
    }
}

/// Authenticated caller extracted from a validated access token
#[derive(Debug, Clone)]
pub struct UserContext {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
    /// Token ID for tracing
    pub token_id: String,
    pub expires_at: DateTime<Utc>,
}

impl From<&AccessTokenClaims> for UserContext {
    fn from(claims: &AccessTokenClaims) -> Self {
        Self {
            user_id: claims.user_id,
            email: claims.email.clone(),
            role: claims.role,
            token_id: claims.jti.clone(),
            expires_at: DateTime::from_timestamp(claims.exp, 0).unwrap_or_else(Utc::now),
        }
    }
}

/// One-time password reset grant, resident only in the cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PasswordResetGrant {
    pub user_id: Uuid,
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_refresh_token_expiry_predicate() {
        let now = Utc::now();
        let token = RefreshToken {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            token_hash: "abc".to_string(),
            expires_at: now - Duration::seconds(1),
            created_at: now - Duration::hours(2),
        };

        assert!(token.is_expired_at(now));
        assert!(!token.is_expired_at(now - Duration::minutes(1)));
    }

    #[test]
    fn test_access_token_claims_creation() {
        let user_id = Uuid::new_v4();
        let now = Utc::now();
        let expires_at = now + Duration::hours(1);

        let claims =
            AccessTokenClaims::new(user_id, "a@x.com", Role::Admin, "edu-core", now, expires_at);

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.exp, expires_at.timestamp());
        assert_eq!(claims.iat, now.timestamp());
        assert_eq!(claims.iss, "edu-core");
        assert!(!claims.jti.is_empty());
    }

    #[test]
    fn test_user_context_from_claims() {
        let user_id = Uuid::new_v4();
        let now = Utc::now();
        let expires_at = now + Duration::hours(1);
        let claims =
            AccessTokenClaims::new(user_id, "a@x.com", Role::User, "edu-core", now, expires_at);

        let context = UserContext::from(&claims);

        assert_eq!(context.user_id, user_id);
        assert_eq!(context.role, Role::User);
        assert_eq!(context.token_id, claims.jti);
        assert_eq!(context.expires_at.timestamp(), expires_at.timestamp());
    }

    #[test]
    fn test_reset_grant_json_shape() {
        let grant = PasswordResetGrant {
            user_id: Uuid::nil(),
            email: "a@x.com".to_string(),
        };
        let json = serde_json::to_value(&grant).unwrap();
        assert_eq!(json["user_id"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(json["email"], "a@x.com");
    }
}

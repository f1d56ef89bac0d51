//! JWT Signing Service
//!
//! Issues and validates HS256 access tokens. Refresh tokens are opaque and
//! persisted; see `AuthService`.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use crate::config::JwtConfig;
use crate::models::{AccessTokenClaims, UserContext, UserWithPassword};

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Token generation failed: {0}")]
    TokenGeneration(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

/// Signed access token with its expiry
#[derive(Debug, Clone)]
pub struct SignedAccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// HS256 signer/verifier for access tokens
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    /// Access token lifetime (default: 24 hours)
    access_token_expires_in: Duration,
}

impl JwtService {
    pub fn new(secret: &str, issuer: &str, access_token_expires_in: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.to_string(),
            access_token_expires_in,
        }
    }

    pub fn from_config(config: &JwtConfig) -> Self {
        Self::new(&config.secret, &config.issuer, config.access_token_ttl())
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Sign an access token for the user
    pub fn issue_access_token(&self, user: &UserWithPassword) -> Result<SignedAccessToken, JwtError> {
        let now = Utc::now();
        let expires_at = now + self.access_token_expires_in;
        let claims =
            AccessTokenClaims::new(user.id, &user.email, user.role, &self.issuer, now, expires_at);

        Ok(SignedAccessToken {
            token: self.encode_access_token(&claims)?,
            expires_at,
        })
    }

    /// Encode an access token with the given claims
    pub fn encode_access_token(&self, claims: &AccessTokenClaims) -> Result<String, JwtError> {
        let header = Header::new(Algorithm::HS256);

        encode(&header, claims, &self.encoding_key)
            .map_err(|e| JwtError::TokenGeneration(e.to_string()))
    }

    /// Verify signature, expiry and issuer, then extract the caller
    pub fn validate_access_token(&self, token: &str) -> Result<UserContext, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_aud = false;
        validation.set_issuer(&[self.issuer.as_str()]);

        decode::<AccessTokenClaims>(token, &self.decoding_key, &validation)
            .map(|data| UserContext::from(&data.claims))
            .map_err(|e| JwtError::InvalidToken(e.to_string()))
    }
}

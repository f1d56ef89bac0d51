//! Configuration Module
//!
//! Typed configuration for the education platform service, read once from the
//! environment at startup.

use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub use crate::database::DatabaseConfig;

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {value} - {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation error: {0}")]
    ValidationError(String),
}

/// Environment variable helpers
pub mod env {
    use std::env;

    /// Get environment variable as string with default
    pub fn get_string(key: &str, default: &str) -> String {
        env::var(key).unwrap_or_else(|_| default.to_string())
    }

    /// Get environment variable as boolean with default
    pub fn get_bool(key: &str, default: bool) -> bool {
        env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Get environment variable as u32 with default
    pub fn get_u32(key: &str, default: u32) -> u32 {
        env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Get environment variable as u16 with default
    pub fn get_u16(key: &str, default: u16) -> u16 {
        env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Get environment variable as u64 with default
    pub fn get_u64(key: &str, default: u64) -> u64 {
        env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Get environment variable as usize with default
    pub fn get_usize(key: &str, default: usize) -> usize {
        env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Get environment variable as i64 with default
    pub fn get_i64(key: &str, default: i64) -> i64 {
        env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Check if environment variable is set
    pub fn is_set(key: &str) -> bool {
        env::var(key).is_ok()
    }

    /// Get required environment variable
    pub fn get_required(key: &str) -> Result<String, super::ConfigError> {
        env::var(key).map_err(|_| super::ConfigError::MissingEnvVar(key.to_string()))
    }
}

/// Application configuration combining all service configurations
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub redis: RedisConfig,
    pub cache_ttl: CacheTtlConfig,
    pub rate_limit: RateLimitConfig,
    pub storage: StorageBackend,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub cors_origins: Vec<String>,
}

/// Token signing and lifetime settings
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HS256 shared secret
    pub secret: String,
    /// Issuer claim, taken from the application name
    pub issuer: String,
    pub access_token_expires_hours: i64,
    pub refresh_token_expires_hours: i64,
}

/// Redis connection settings
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// When false the in-process cache is used
    pub enabled: bool,
    pub url: String,
    pub pool_size: usize,
    /// Deadline applied to every cache operation
    pub timeout_ms: u64,
}

/// Cache entry lifetimes, in seconds
#[derive(Debug, Clone)]
pub struct CacheTtlConfig {
    pub course_seconds: u64,
    pub course_list_seconds: u64,
    pub featured_seconds: u64,
    pub categories_seconds: u64,
    pub reset_grant_seconds: u64,
}

/// Per-client request allowance on the `/auth` endpoints
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Requests admitted per window
    pub requests: u64,
    pub window_seconds: u64,
    /// Take the client address from `X-Forwarded-For` instead of the peer
    pub trust_forwarded_for: bool,
}

/// Which store implementation backs the repositories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            _ => Err(ConfigError::InvalidValue {
                key: "STORAGE_BACKEND".to_string(),
                value: s.to_string(),
                reason: "Must be 'postgres' or 'memory'".to_string(),
            }),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: env::get_string("SERVER_HOST", "0.0.0.0"),
            port: env::get_u16("SERVER_HTTP_PORT", 8080),
            log_level: env::get_string("LOG_LEVEL", "info"),
            cors_origins: env::get_string("CORS_ORIGINS", "*")
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }
}

impl JwtConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            secret: env::get_required("APP_JWT_SECRET")?,
            issuer: env::get_string("APP_NAME", "edu-core"),
            access_token_expires_hours: env::get_i64("APP_TOKEN_EXPIRE_TIME", 24),
            refresh_token_expires_hours: env::get_i64("APP_REFRESH_TOKEN_EXPIRE_TIME", 168),
        })
    }

    pub fn access_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.access_token_expires_hours)
    }

    pub fn refresh_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.refresh_token_expires_hours)
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        let url = if env::is_set("REDIS_URL") {
            env::get_string("REDIS_URL", "redis://localhost:6379")
        } else {
            let password = env::get_string("REDIS_PASSWORD", "");
            let auth = if password.is_empty() {
                String::new()
            } else {
                format!(":{}@", password)
            };
            format!(
                "redis://{}{}:{}/{}",
                auth,
                env::get_string("REDIS_HOST", "localhost"),
                env::get_u16("REDIS_PORT", 6379),
                env::get_u32("REDIS_DB", 0),
            )
        };

        Self {
            enabled: env::get_bool("REDIS_ENABLED", true),
            url,
            pool_size: env::get_usize("REDIS_POOL_SIZE", 16),
            timeout_ms: env::get_u64("REDIS_TIMEOUT_MS", 500),
        }
    }
}

impl RedisConfig {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for CacheTtlConfig {
    fn default() -> Self {
        Self {
            course_seconds: env::get_u64("CACHE_TTL_COURSE", 3600),
            course_list_seconds: env::get_u64("CACHE_TTL_COURSE_LIST", 1800),
            featured_seconds: env::get_u64("CACHE_TTL_FEATURED", 3600),
            categories_seconds: env::get_u64("CACHE_TTL_CATEGORIES", 3600),
            reset_grant_seconds: env::get_u64("CACHE_TTL_RESET_TOKEN", 3600),
        }
    }
}

impl CacheTtlConfig {
    pub fn course(&self) -> Duration {
        Duration::from_secs(self.course_seconds)
    }

    pub fn course_list(&self) -> Duration {
        Duration::from_secs(self.course_list_seconds)
    }

    pub fn featured(&self) -> Duration {
        Duration::from_secs(self.featured_seconds)
    }

    pub fn categories(&self) -> Duration {
        Duration::from_secs(self.categories_seconds)
    }

    pub fn reset_grant(&self) -> Duration {
        Duration::from_secs(self.reset_grant_seconds)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: env::get_bool("RATE_LIMIT_ENABLED", true),
            requests: env::get_u64("RATE_LIMIT_AUTH_REQUESTS", 100),
            window_seconds: env::get_u64("RATE_LIMIT_AUTH_WINDOW", 60),
            trust_forwarded_for: env::get_bool("RATE_LIMIT_TRUST_FORWARDED_FOR", false),
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }
}

impl AppConfig {
    /// Load complete application configuration from environment
    pub fn from_env() -> Result<Self, ConfigError> {
        let storage: StorageBackend = env::get_string("STORAGE_BACKEND", "postgres").parse()?;

        let database = match storage {
            StorageBackend::Postgres => DatabaseConfig::from_env()?,
            StorageBackend::Memory => DatabaseConfig::default(),
        };

        Ok(Self {
            server: ServerConfig::default(),
            database,
            jwt: JwtConfig::from_env()?,
            redis: RedisConfig::default(),
            cache_ttl: CacheTtlConfig::default(),
            rate_limit: RateLimitConfig::default(),
            storage,
        })
    }

    /// Validate the complete configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "Server port must be greater than 0".to_string(),
            ));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::ValidationError(
                "Database max_connections must be greater than 0".to_string(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::ValidationError(
                "Database min_connections cannot be greater than max_connections".to_string(),
            ));
        }

        if self.jwt.secret.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "JWT secret cannot be empty".to_string(),
            ));
        }

        if self.jwt.access_token_expires_hours <= 0 || self.jwt.refresh_token_expires_hours <= 0 {
            return Err(ConfigError::ValidationError(
                "Token lifetimes must be positive".to_string(),
            ));
        }

        if self.redis.enabled && self.redis.pool_size == 0 {
            return Err(ConfigError::ValidationError(
                "Redis pool_size must be greater than 0".to_string(),
            ));
        }

        if self.rate_limit.enabled
            && (self.rate_limit.requests == 0 || self.rate_limit.window_seconds == 0)
        {
            return Err(ConfigError::ValidationError(
                "Rate limit requests and window must be greater than 0".to_string(),
            ));
        }

        let ttl = &self.cache_ttl;
        if [
            ttl.course_seconds,
            ttl.course_list_seconds,
            ttl.featured_seconds,
            ttl.categories_seconds,
            ttl.reset_grant_seconds,
        ]
        .contains(&0)
        {
            return Err(ConfigError::ValidationError(
                "Cache TTLs must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

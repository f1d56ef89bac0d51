//! Cache Module
//!
//! Byte-level key/value cache with TTL (`Cache`), its Redis and in-process
//! backends, and the typed read-through layer the catalog services use.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub mod backend;
pub mod keys;
pub mod layer;

pub use backend::{connect_redis, create_cache, MemoryCache, RedisCache};
pub use layer::CacheLayer;

/// Errors raised by cache backends
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Redis pool error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    #[error("Cache operation timed out")]
    Timeout,

    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No shared cache is configured or reachable
    #[error("Cache unavailable: {0}")]
    Unavailable(String),
}

/// State of a fixed-window counter after an increment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCount {
    /// Increments seen in the current window, including this one
    pub count: u64,
    /// Time until the window closes and the counter resets
    pub resets_in: Duration,
}

/// Key/value store with per-entry expiry
#[async_trait]
pub trait Cache: Send + Sync {
    /// `Ok(None)` on a miss or an expired entry
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;

    /// Deleting an absent key succeeds
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Removes and returns the entry in one step. Of several concurrent
    /// callers at most one receives the value.
    async fn take(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Increments the counter under `key`. The first increment opens a
    /// window of length `window`; the counter starts over once it closes.
    async fn increment(&self, key: &str, window: Duration) -> Result<WindowCount, CacheError>;
}

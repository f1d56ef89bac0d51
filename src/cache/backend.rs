//! Cache backends: Redis (shared) and DashMap (single instance).

use async_trait::async_trait;
use dashmap::DashMap;
use deadpool_redis::Pool;
use redis::AsyncCommands;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{Cache, CacheError, WindowCount};
use crate::config::RedisConfig;

/// Redis-backed cache; every call is bounded by `timeout`
#[derive(Clone, Debug)]
pub struct RedisCache {
    pool: Pool,
    timeout: Duration,
}

impl RedisCache {
    pub fn new(pool: Pool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    async fn with_deadline<T, F>(&self, op: F) -> Result<T, CacheError>
    where
        F: Future<Output = Result<T, CacheError>>,
    {
        tokio::time::timeout(self.timeout, op)
            .await
            .map_err(|_| CacheError::Timeout)?
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.with_deadline(async {
            let mut conn = self.pool.get().await?;
            let value: Option<Vec<u8>> = conn.get(key).await?;
            Ok(value)
        })
        .await
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let ttl_secs = ttl.as_secs().max(1);
        self.with_deadline(async {
            let mut conn = self.pool.get().await?;
            conn.set_ex::<_, _, ()>(key, value, ttl_secs).await?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.with_deadline(async {
            let mut conn = self.pool.get().await?;
            conn.del::<_, ()>(key).await?;
            Ok(())
        })
        .await
    }

    async fn take(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.with_deadline(async {
            let mut conn = self.pool.get().await?;
            let value: Option<Vec<u8>> = redis::cmd("GETDEL").arg(key).query_async(&mut conn).await?;
            Ok(value)
        })
        .await
    }

    async fn increment(&self, key: &str, window: Duration) -> Result<WindowCount, CacheError> {
        let window_secs = window.as_secs().max(1);
        self.with_deadline(async {
            let mut conn = self.pool.get().await?;
            let count: u64 = conn.incr(key, 1u64).await?;
            let mut ttl: i64 = conn.ttl(key).await?;
            // A key without expiry is a fresh counter, or one whose EXPIRE was lost
            if ttl < 0 {
                let _: () = redis::cmd("EXPIRE")
                    .arg(key)
                    .arg(window_secs)
                    .query_async(&mut conn)
                    .await?;
                ttl = window_secs as i64;
            }
            Ok(WindowCount {
                count,
                resets_in: Duration::from_secs(ttl as u64),
            })
        })
        .await
    }
}

/// A cached entry with absolute expiry
#[derive(Clone, Debug)]
struct CachedEntry {
    data: Vec<u8>,
    expires_at: Instant,
}

impl CachedEntry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Writes between two sweeps of expired entries
const SWEEP_EVERY: u64 = 256;

/// In-process cache for single-instance deployments and tests.
///
/// Expired entries are dropped when read and by a sweep every
/// `SWEEP_EVERY` writes, so unread keys cannot accumulate.
#[derive(Default)]
pub struct MemoryCache {
    entries: DashMap<String, CachedEntry>,
    writes: AtomicU64,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every expired entry and returns how many were removed
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        before.saturating_sub(self.entries.len())
    }

    fn record_write(&self) {
        if self.writes.fetch_add(1, Ordering::Relaxed) % SWEEP_EVERY == SWEEP_EVERY - 1 {
            let purged = self.purge_expired();
            log::debug!("swept {} expired cache entries", purged);
        }
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_expired()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .map(|entry| !entry.is_expired())
            .unwrap_or(false)
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let hit = self
            .entries
            .get(key)
            .map(|entry| (!entry.is_expired()).then(|| entry.data.clone()));
        match hit {
            Some(Some(data)) => Ok(Some(data)),
            Some(None) => {
                // A concurrent set may have replaced the expired entry
                self.entries.remove_if(key, |_, entry| entry.is_expired());
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        self.entries.insert(
            key.to_string(),
            CachedEntry {
                data: value,
                expires_at: Instant::now() + ttl,
            },
        );
        self.record_write();
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn take(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self
            .entries
            .remove(key)
            .filter(|(_, entry)| !entry.is_expired())
            .map(|(_, entry)| entry.data))
    }

    async fn increment(&self, key: &str, window: Duration) -> Result<WindowCount, CacheError> {
        let now = Instant::now();
        let counted = {
            let mut entry = self
                .entries
                .entry(key.to_string())
                .or_insert_with(|| CachedEntry {
                    data: b"0".to_vec(),
                    expires_at: now + window,
                });
            if entry.is_expired() {
                *entry = CachedEntry {
                    data: b"0".to_vec(),
                    expires_at: now + window,
                };
            }

            // Stored as decimal text, as Redis INCR does
            let count = std::str::from_utf8(&entry.data)
                .ok()
                .and_then(|text| text.parse::<u64>().ok())
                .unwrap_or(0)
                + 1;
            entry.data = count.to_string().into_bytes();

            WindowCount {
                count,
                resets_in: entry.expires_at.saturating_duration_since(now),
            }
        };
        self.record_write();
        Ok(counted)
    }
}

/// Connects to the configured Redis and checks that it answers.
///
/// Fails with `CacheError::Unavailable` when Redis is disabled, the pool
/// cannot be built or no connection can be opened.
pub async fn connect_redis(config: &RedisConfig) -> Result<RedisCache, CacheError> {
    if !config.enabled {
        return Err(CacheError::Unavailable("Redis is disabled".to_string()));
    }

    log::info!("Connecting to Redis at {}", config.url);

    let timeout = config.operation_timeout();
    let mut redis_config = deadpool_redis::Config::from_url(&config.url);
    let mut pool_config = deadpool_redis::PoolConfig::new(config.pool_size);
    pool_config.timeouts.wait = Some(timeout);
    pool_config.timeouts.create = Some(timeout);
    pool_config.timeouts.recycle = Some(timeout);
    redis_config.pool = Some(pool_config);

    let pool = redis_config
        .create_pool(Some(deadpool_redis::Runtime::Tokio1))
        .map_err(|e| CacheError::Unavailable(format!("failed to create Redis pool: {}", e)))?;

    let cache = RedisCache::new(pool, timeout);
    cache
        .with_deadline(async {
            cache.pool.get().await?;
            Ok(())
        })
        .await
        .map_err(|e| CacheError::Unavailable(format!("failed to connect to Redis: {}", e)))?;

    log::info!("Connected to Redis");
    Ok(cache)
}

/// Create a cache based on configuration.
///
/// Falls back to the in-process cache when Redis is disabled or cannot be
/// reached at startup.
pub async fn create_cache(config: &RedisConfig) -> Arc<dyn Cache> {
    if !config.enabled {
        log::info!("Redis disabled, using in-process cache");
        return Arc::new(MemoryCache::new());
    }

    match connect_redis(config).await {
        Ok(cache) => Arc::new(cache),
        Err(e) => {
            log::warn!("{}, falling back to in-process cache", e);
            Arc::new(MemoryCache::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_cache_set_get_delete() {
        let cache = MemoryCache::new();
        cache
            .set("k", b"v".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(cache.get("k").await.unwrap(), Some(b"v".to_vec()));
        cache.delete("k").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
        cache.delete("k").await.unwrap();
    }

    #[tokio::test]
    async fn test_memory_cache_expiry() {
        let cache = MemoryCache::new();
        cache
            .set("k", b"v".to_vec(), Duration::from_millis(20))
            .await
            .unwrap();
        assert!(cache.contains("k"));

        tokio::time::sleep(Duration::from_millis(40)).await;

        assert_eq!(cache.get("k").await.unwrap(), None);
        assert!(cache.is_empty());
    }

    fn redis_config(enabled: bool, url: &str) -> RedisConfig {
        RedisConfig {
            enabled,
            url: url.to_string(),
            pool_size: 1,
            timeout_ms: 100,
        }
    }

    #[tokio::test]
    async fn test_take_hands_out_an_entry_once() {
        let cache = Arc::new(MemoryCache::new());
        cache
            .set("grant", b"v".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();

        let (first, second) = tokio::join!(cache.take("grant"), cache.take("grant"));
        let mut taken = vec![first.unwrap(), second.unwrap()];
        taken.sort();

        assert_eq!(taken, vec![None, Some(b"v".to_vec())]);
        assert!(!cache.contains("grant"));
    }

    #[tokio::test]
    async fn test_take_skips_expired_entry() {
        let cache = MemoryCache::new();
        cache
            .set("grant", b"v".to_vec(), Duration::from_millis(10))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(cache.take("grant").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_increment_counts_within_window() {
        let cache = MemoryCache::new();
        let window = Duration::from_millis(50);

        assert_eq!(cache.increment("ip", window).await.unwrap().count, 1);
        let second = cache.increment("ip", window).await.unwrap();
        assert_eq!(second.count, 2);
        assert!(second.resets_in <= window);
        assert_eq!(cache.get("ip").await.unwrap(), Some(b"2".to_vec()));

        tokio::time::sleep(Duration::from_millis(70)).await;

        assert_eq!(cache.increment("ip", window).await.unwrap().count, 1);
    }

    #[tokio::test]
    async fn test_expired_read_keeps_fresh_replacement() {
        let cache = MemoryCache::new();
        cache
            .set("k", b"old".to_vec(), Duration::from_millis(10))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(cache.get("k").await.unwrap(), None);
        cache
            .set("k", b"new".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some(b"new".to_vec()));
    }

    #[tokio::test]
    async fn test_unread_expired_entries_are_swept() {
        let cache = MemoryCache::new();
        cache
            .set("stale", b"v".to_vec(), Duration::from_millis(10))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        for i in 0..SWEEP_EVERY {
            cache
                .set(&format!("k{}", i), b"v".to_vec(), Duration::from_secs(60))
                .await
                .unwrap();
        }

        assert!(!cache.entries.contains_key("stale"));
        assert_eq!(cache.entries.len(), SWEEP_EVERY as usize);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let cache = MemoryCache::new();
        for key in ["a", "b", "c"] {
            cache
                .set(key, b"v".to_vec(), Duration::from_millis(10))
                .await
                .unwrap();
        }
        cache
            .set("live", b"v".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(cache.purge_expired(), 3);
        assert_eq!(cache.entries.len(), 1);
    }

    #[tokio::test]
    async fn test_connect_redis_refuses_disabled_config() {
        let err = connect_redis(&redis_config(false, "redis://localhost:6379"))
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_connect_redis_reports_unreachable_server() {
        let err = connect_redis(&redis_config(true, "redis://127.0.0.1:1/"))
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_disabled_redis_falls_back_to_memory() {
        let config = redis_config(false, "redis://localhost:6379");
        let cache = create_cache(&config).await;

        cache
            .set("k", b"v".to_vec(), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some(b"v".to_vec()));
    }
}

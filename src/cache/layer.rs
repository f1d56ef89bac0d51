//! Typed read-through cache layer
//!
//! Reads treat every failure as a miss and writes are best-effort, so an
//! unreachable cache degrades to direct store reads. `store`, `take` and
//! `increment` report errors, for callers whose correctness rests on the
//! cache itself.

use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::{keys, Cache, CacheError, WindowCount};

#[derive(Clone)]
pub struct CacheLayer {
    cache: Arc<dyn Cache>,
}

impl CacheLayer {
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self { cache }
    }

    /// Cached value for `key`, or `None` on miss, decode failure or cache error
    pub async fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.cache.get(key).await {
            Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
                Ok(value) => {
                    log::debug!("cache hit: {}", key);
                    Some(value)
                }
                Err(e) => {
                    log::warn!("discarding undecodable cache entry {}: {}", key, e);
                    None
                }
            },
            Ok(None) => {
                log::debug!("cache miss: {}", key);
                None
            }
            Err(e) => {
                log::warn!("cache read failed for {}: {}", key, e);
                None
            }
        }
    }

    /// Stores `value` under `key`, logging instead of failing
    pub async fn populate<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) {
        if let Err(e) = self.store(key, value, ttl).await {
            log::warn!("cache populate failed for {}: {}", key, e);
        }
    }

    /// Stores `value` under `key` and reports failures
    pub async fn store<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec(value)?;
        self.cache.set(key, bytes, ttl).await
    }

    /// Removes the entry under `key` and returns it. An undecodable entry is
    /// still removed and reported as absent.
    pub async fn take<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        let Some(bytes) = self.cache.take(key).await? else {
            return Ok(None);
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                log::warn!("discarding undecodable cache entry {}: {}", key, e);
                Ok(None)
            }
        }
    }

    /// Fixed-window counter under `key`
    pub async fn increment(&self, key: &str, window: Duration) -> Result<WindowCount, CacheError> {
        self.cache.increment(key, window).await
    }

    /// Deletes every key in order; failures are logged and left to the TTL
    pub async fn invalidate<K: AsRef<str>>(&self, keys: &[K]) {
        for key in keys {
            let key = key.as_ref();
            match self.cache.delete(key).await {
                Ok(()) => log::debug!("cache invalidated: {}", key),
                Err(e) => log::warn!("cache invalidation failed for {}: {}", key, e),
            }
        }
    }

    /// Current course list generation, minting a new one when absent.
    ///
    /// The new generation is written before the caller reads the store, so a
    /// mutation that commits afterwards and deletes the generation key also
    /// orphans whatever page the caller goes on to populate.
    pub async fn course_list_generation(&self, ttl: Duration) -> String {
        if let Some(generation) = self.read::<String>(keys::COURSE_LIST_GENERATION).await {
            return generation;
        }

        let generation = Uuid::new_v4().simple().to_string();
        self.populate(keys::COURSE_LIST_GENERATION, &generation, ttl)
            .await;
        generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::testing::FailingCache;
    use crate::cache::MemoryCache;
    use std::sync::atomic::Ordering;

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn test_read_after_populate() {
        let layer = CacheLayer::new(Arc::new(MemoryCache::new()));
        layer.populate("k", &vec![1, 2, 3], TTL).await;

        assert_eq!(layer.read::<Vec<i32>>("k").await, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_a_miss() {
        let cache = Arc::new(MemoryCache::new());
        cache.set("k", b"not json".to_vec(), TTL).await.unwrap();
        let layer = CacheLayer::new(cache);

        assert_eq!(layer.read::<Vec<i32>>("k").await, None);
    }

    #[tokio::test]
    async fn test_failing_cache_degrades_silently() {
        let failing = Arc::new(FailingCache::default());
        let layer = CacheLayer::new(failing.clone());

        layer.populate("k", &1, TTL).await;
        assert_eq!(layer.read::<i32>("k").await, None);
        layer.invalidate(&["a", "b"]).await;
        assert!(layer.store("k", &1, TTL).await.is_err());

        assert_eq!(failing.calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_take_consumes_entry() {
        let layer = CacheLayer::new(Arc::new(MemoryCache::new()));
        layer.populate("k", &7, TTL).await;

        assert_eq!(layer.take::<i32>("k").await.unwrap(), Some(7));
        assert_eq!(layer.take::<i32>("k").await.unwrap(), None);
        assert_eq!(layer.read::<i32>("k").await, None);
    }

    #[tokio::test]
    async fn test_take_reports_cache_failure() {
        let layer = CacheLayer::new(Arc::new(FailingCache::default()));

        assert!(layer.take::<i32>("k").await.is_err());
        assert!(layer.increment("k", TTL).await.is_err());
    }

    #[tokio::test]
    async fn test_generation_is_stable_until_deleted() {
        let layer = CacheLayer::new(Arc::new(MemoryCache::new()));

        let first = layer.course_list_generation(TTL).await;
        assert_eq!(layer.course_list_generation(TTL).await, first);

        layer.invalidate(&[keys::COURSE_LIST_GENERATION]).await;
        assert_ne!(layer.course_list_generation(TTL).await, first);
    }
}

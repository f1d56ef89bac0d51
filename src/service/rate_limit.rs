//! Rate Limiting Service
//!
//! Fixed-window request counting per client address, kept in the shared
//! cache so every instance sees the same counters.

use std::time::Duration;

use crate::cache::{keys, CacheLayer};
use crate::config::RateLimitConfig;

/// Outcome of counting one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub limit: u64,
    pub remaining: u64,
    /// Time until the current window closes
    pub resets_in: Duration,
    pub exceeded: bool,
}

impl RateLimitStatus {
    fn unlimited(limit: u64) -> Self {
        Self {
            limit,
            remaining: limit,
            resets_in: Duration::ZERO,
            exceeded: false,
        }
    }

    /// Whole seconds a rejected client should wait, never zero
    pub fn retry_after_secs(&self) -> u64 {
        self.resets_in.as_secs().max(1)
    }
}

/// Counts requests per client against `RateLimitConfig`
#[derive(Clone)]
pub struct RateLimiter {
    cache: CacheLayer,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(cache: CacheLayer, config: RateLimitConfig) -> Self {
        Self { cache, config }
    }

    /// Whether the client address comes from `X-Forwarded-For`
    pub fn trusts_forwarded_for(&self) -> bool {
        self.config.trust_forwarded_for
    }

    /// Counts one request from `client`. A cache failure admits the request.
    pub async fn check(&self, client: &str) -> RateLimitStatus {
        let limit = self.config.requests;
        if !self.config.enabled {
            return RateLimitStatus::unlimited(limit);
        }

        match self
            .cache
            .increment(&keys::rate_limit(client), self.config.window())
            .await
        {
            Ok(window) => RateLimitStatus {
                limit,
                remaining: limit.saturating_sub(window.count),
                resets_in: window.resets_in,
                exceeded: window.count > limit,
            },
            Err(e) => {
                log::warn!("rate limit check failed for {}, admitting: {}", client, e);
                RateLimitStatus::unlimited(limit)
            }
        }
    }
}

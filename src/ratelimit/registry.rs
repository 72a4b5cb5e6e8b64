//! Per-key registry of rate limiters.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::limiter::{RateLimiter, MAX_BURST, WINDOW};

/// Maps routing keys to their own [`RateLimiter`].
///
/// Limiters are created on first access and kept for the lifetime of the
/// registry. There is no eviction, so the key space should be bounded.
#[derive(Debug)]
pub struct LimiterRegistry {
    limiters: DashMap<String, Arc<RateLimiter>>,
    max_burst: usize,
    window: Duration,
}

impl LimiterRegistry {
    /// Create a registry whose limiters use the default burst and window.
    pub fn new() -> Self {
        Self::with_limits(MAX_BURST, WINDOW)
    }

    /// Create a registry whose limiters use the given burst and window.
    pub fn with_limits(max_burst: usize, window: Duration) -> Self {
        Self {
            limiters: DashMap::new(),
            max_burst,
            window,
        }
    }

    /// Get the limiter for `key`, creating it if this is the first request.
    ///
    /// Racing first accesses for the same key all receive the one limiter
    /// that ends up stored.
    pub fn get_limiter(&self, key: &str) -> Arc<RateLimiter> {
        if let Some(existing) = self.limiters.get(key) {
            return Arc::clone(existing.value());
        }

        let entry = self.limiters.entry(key.to_string()).or_insert_with(|| {
            debug!(
                key = %key,
                max_burst = self.max_burst,
                window = ?self.window,
                "Creating new rate limiter"
            );
            Arc::new(RateLimiter::with_limits(self.max_burst, self.window))
        });
        Arc::clone(entry.value())
    }

    /// Number of keys seen so far.
    pub fn len(&self) -> usize {
        self.limiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.limiters.is_empty()
    }
}

impl Default for LimiterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

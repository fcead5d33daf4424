//! Time-boxed store for raw source responses.
//!
//! [`SourceCache`] is shared by every source adapter. Each adapter stores
//! its decoded payload under its own key (`openrouter_models`,
//! `litellm_pricing`, `lmarena_<category>`) with its own TTL. Expiry is
//! checked lazily on read against an injected [`Clock`]; moka bounds the
//! number of entries.
//!
//! [`SourceCache::flush_all`] is the only bulk mutation and backs
//! [`Mimir::refresh`](crate::Mimir::refresh).

mod clock;

pub use clock::{Clock, ManualClock, SystemClock};

use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::sync::Cache;
use serde::Deserialize;
use tracing::trace;

use crate::telemetry;
use crate::{MimirError, Result};

/// Configuration for the source cache.
///
/// ```rust
/// # use mimir::CacheConfig;
/// let config = CacheConfig::new().max_entries(64);
/// assert_eq!(config.max_entries, 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of cached entries. Default: 1,000.
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
}

fn default_max_entries() -> u64 {
    1_000
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of cached entries.
    pub fn max_entries(mut self, n: u64) -> Self {
        self.max_entries = n;
        self
    }
}

#[derive(Clone)]
struct CacheEntry {
    value: Arc<dyn Any + Send + Sync>,
    /// `None` when `now + ttl` is past what `Instant` can hold.
    expires_at: Option<Instant>,
}

/// Keyed store of type-erased source payloads with per-entry TTL.
pub struct SourceCache {
    entries: Cache<String, CacheEntry>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for SourceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceCache")
            .field("entries", &self.entries.entry_count())
            .field("clock", &self.clock)
            .finish()
    }
}

impl SourceCache {
    /// Cache with default capacity on the system clock.
    pub fn new() -> Self {
        Self::with_config(&CacheConfig::default())
    }

    pub fn with_config(config: &CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Cache reading time from `clock`.
    pub fn with_clock(config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Cache::builder().max_capacity(config.max_entries).build(),
            clock,
        }
    }

    /// Look up a live value.
    ///
    /// Absent and expired entries are both misses; an expired entry is
    /// evicted on the way out. A live entry holding a different type than
    /// `T` is a [`MimirError::Cache`].
    pub fn get<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: Clone + Send + Sync + 'static,
    {
        let Some(entry) = self.entries.get(key) else {
            metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "key" => key.to_string()).increment(1);
            return Ok(None);
        };
        if entry.expires_at.is_some_and(|at| self.clock.now() >= at) {
            trace!(key, "cache entry expired");
            self.entries.invalidate(key);
            metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "key" => key.to_string()).increment(1);
            return Ok(None);
        }
        let value = entry.value.downcast_ref::<T>().ok_or_else(|| {
            MimirError::Cache(format!(
                "entry '{key}' does not hold a {}",
                std::any::type_name::<T>()
            ))
        })?;
        metrics::counter!(telemetry::CACHE_HITS_TOTAL, "key" => key.to_string()).increment(1);
        Ok(Some(value.clone()))
    }

    /// Store `value` under `key` for `ttl`, replacing any previous entry.
    ///
    /// A TTL too large to represent never expires.
    pub fn set<T>(&self, key: impl Into<String>, value: T, ttl: Duration)
    where
        T: Send + Sync + 'static,
    {
        let entry = CacheEntry {
            value: Arc::new(value),
            expires_at: self.clock.now().checked_add(ttl),
        };
        self.entries.insert(key.into(), entry);
    }

    /// Invalidate every key.
    pub fn flush_all(&self) {
        self.entries.invalidate_all();
        self.entries.run_pending_tasks();
    }

    /// Number of stored entries, including expired ones not yet read.
    pub fn len(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SourceCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manual_cache() -> (SourceCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let cache = SourceCache::with_clock(&CacheConfig::default(), clock.clone());
        (cache, clock)
    }

    #[test]
    fn entry_lives_until_ttl_elapses() {
        let (cache, clock) = manual_cache();
        cache.set("k", vec![1u32, 2, 3], Duration::from_secs(300));

        clock.advance(Duration::from_secs(299));
        assert_eq!(cache.get::<Vec<u32>>("k").unwrap(), Some(vec![1, 2, 3]));

        clock.advance(Duration::from_secs(1));
        assert_eq!(cache.get::<Vec<u32>>("k").unwrap(), None);
    }

    #[test]
    fn type_mismatch_is_a_cache_error() {
        let (cache, _) = manual_cache();
        cache.set("k", "text".to_string(), Duration::from_secs(60));
        let err = cache.get::<u64>("k").unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn flush_all_empties_every_key() {
        let (cache, _) = manual_cache();
        cache.set("a", 1u8, Duration::from_secs(60));
        cache.set("b", 2u8, Duration::from_secs(60));
        assert_eq!(cache.len(), 2);

        cache.flush_all();
        assert!(cache.get::<u8>("a").unwrap().is_none());
        assert!(cache.get::<u8>("b").unwrap().is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn set_replaces_value_and_expiry() {
        let (cache, clock) = manual_cache();
        cache.set("k", 1u8, Duration::from_secs(10));
        clock.advance(Duration::from_secs(5));
        cache.set("k", 2u8, Duration::from_secs(10));
        clock.advance(Duration::from_secs(8));
        assert_eq!(cache.get::<u8>("k").unwrap(), Some(2));
    }

    #[test]
    fn unrepresentable_ttl_never_expires() {
        let (cache, clock) = manual_cache();
        cache.set("k", 7u8, Duration::MAX);
        cache.set("j", 8u8, Duration::from_secs(u64::MAX));

        clock.advance(Duration::from_secs(365 * 24 * 3600));
        assert_eq!(cache.get::<u8>("k").unwrap(), Some(7));
        assert_eq!(cache.get::<u8>("j").unwrap(), Some(8));
    }
}

//! TTL/LRU cache store for generated results.
//!
//! Backed by moka's synchronous cache so reads and writes never suspend.
//! Expired entries are never returned; capacity pressure evicts the
//! least-recently-accessed entry before `set` returns.
//!
//! Expiry is checked against the tokio clock on read, so paused test time
//! drives it the same way it drives retry and suppression windows.

use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use moka::Expiry;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::time::Instant as ClockInstant;

/// Capacity and default lifetime of one cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Default entry lifetime (in seconds)
    #[serde(with = "crate::config::duration_secs")]
    pub ttl: Duration,

    /// Maximum number of entries
    pub max_entries: u64,
}

impl CacheSettings {
    pub fn new(ttl: Duration, max_entries: u64) -> Self {
        Self { ttl, max_entries }
    }
}

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    ttl: Duration,
    expires_at: ClockInstant,
}

/// Expiry that reads the lifetime stored beside each value.
struct EntryTtl;

impl<V> Expiry<String, Entry<V>> for EntryTtl {
    fn expire_after_create(&self, _key: &String, entry: &Entry<V>, _created_at: Instant) -> Option<Duration> {
        Some(entry.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &Entry<V>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// Bounded key-value store with per-entry expiry.
pub struct TtlCache<V> {
    cache: Cache<String, Entry<V>>,
    default_ttl: Duration,
}

impl<V> TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a new cache with the given configuration.
    pub fn new(settings: &CacheSettings) -> Self {
        let cache = Cache::builder()
            .max_capacity(settings.max_entries)
            .eviction_policy(EvictionPolicy::lru())
            .expire_after(EntryTtl)
            .build();

        Self {
            cache,
            default_ttl: settings.ttl,
        }
    }

    /// Get a live value. Expired entries read as a miss.
    pub fn get(&self, key: &str) -> Option<V> {
        let entry = self.cache.get(key)?;
        if entry.expires_at <= ClockInstant::now() {
            self.cache.invalidate(key);
            return None;
        }
        Some(entry.value)
    }

    /// Store a value with the default lifetime, replacing any previous entry.
    pub fn set(&self, key: impl Into<String>, value: V) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    /// Store a value with a shorter lifetime. Longer values are capped at the default.
    pub fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let ttl = ttl.min(self.default_ttl);
        let expires_at = ClockInstant::now() + ttl;
        self.cache.insert(key.into(), Entry { value, ttl, expires_at });
        // Apply capacity eviction now rather than on moka's schedule.
        self.cache.run_pending_tasks();
    }

    pub fn delete(&self, key: &str) {
        self.cache.invalidate(key);
    }

    /// Clear the cache.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// Number of live entries, after pending evictions have been applied.
    pub fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }
}

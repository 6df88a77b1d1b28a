//! Fail-open TTL cache.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use follower_core::{CacheBackend, CacheEntry, Clock, DEFAULT_CACHE_TTL_SECONDS};

/// Cache configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of entries held by the in-memory backend
    pub max_entries: usize,
    /// Default TTL in seconds
    pub default_ttl_seconds: u64,
    /// Whether the in-memory backend prunes expired entries when full
    pub auto_cleanup: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            default_ttl_seconds: DEFAULT_CACHE_TTL_SECONDS,
            auto_cleanup: true,
        }
    }
}

/// Typed get/set with expiry over a [`CacheBackend`].
///
/// The cache is an optimization only. Backend errors, undecodable payloads, and
/// failed writes are logged and reported as a miss or a `false` return; they
/// never reach the caller as errors.
///
/// In the follower-count service a hit does not spare the token-store read:
/// the durable record is still loaded so a newer stored count can win over
/// the cached one.
pub struct TtlCache<T> {
    backend: Arc<dyn CacheBackend>,
    clock: Arc<dyn Clock>,
    config: CacheConfig,
    hits: AtomicU64,
    misses: AtomicU64,
    errors: AtomicU64,
    _payload: PhantomData<fn() -> T>,
}

impl<T> TtlCache<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Creates a cache with default configuration.
    pub fn new(backend: Arc<dyn CacheBackend>, clock: Arc<dyn Clock>) -> Self {
        Self::with_config(backend, clock, CacheConfig::default())
    }

    /// Creates a cache with custom configuration.
    pub fn with_config(
        backend: Arc<dyn CacheBackend>,
        clock: Arc<dyn Clock>,
        config: CacheConfig,
    ) -> Self {
        Self {
            backend,
            clock,
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            _payload: PhantomData,
        }
    }

    fn normalize(key: &str) -> String {
        key.trim().to_lowercase()
    }

    /// Returns the cached value if its entry is still live.
    pub async fn get(&self, key: &str) -> Option<T> {
        let key = Self::normalize(key);

        let entry = match self.backend.get(&key).await {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                debug!(key = %key, "Cache miss");
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
            Err(e) => {
                error!(key = %key, error = %e, "Cache get failed, treating as miss");
                self.errors.fetch_add(1, Ordering::Relaxed);
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        let now = self.clock.now();
        if !entry.is_live(now) {
            debug!(key = %key, expires_at = entry.expires_at, now, "Cache entry expired");
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        match serde_json::from_value(entry.payload) {
            Ok(value) => {
                debug!(key = %key, "Cache hit");
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(value)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Undecodable cache payload, treating as miss");
                self.errors.fetch_add(1, Ordering::Relaxed);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Caches a value with the default TTL. Returns false if the write failed.
    pub async fn set(&self, key: &str, value: &T) -> bool {
        self.set_with_ttl(key, value, self.config.default_ttl_seconds)
            .await
    }

    /// Caches a value with a custom TTL. Returns false if the write failed.
    pub async fn set_with_ttl(&self, key: &str, value: &T, ttl_seconds: u64) -> bool {
        let key = Self::normalize(key);

        let payload = match serde_json::to_value(value) {
            Ok(payload) => payload,
            Err(e) => {
                error!(key = %key, error = %e, "Failed to encode cache payload");
                self.errors.fetch_add(1, Ordering::Relaxed);
                return false;
            }
        };

        let entry = CacheEntry::new(key.clone(), payload, self.clock.now(), ttl_seconds);
        match self.backend.put(&key, entry).await {
            Ok(()) => {
                debug!(key = %key, ttl_seconds, "Cache set");
                true
            }
            Err(e) => {
                error!(key = %key, error = %e, "Cache set failed");
                self.errors.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Cache statistics.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub errors: u64,
}

impl CacheStats {
    /// Hit rate in percent, 0 when nothing was read yet.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 * 100.0 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryCacheBackend;
    use async_trait::async_trait;
    use follower_core::{FollowerError, FollowerSnapshot, ManualClock, StoredEntry};
    use proptest::prelude::*;

    const T0: i64 = 1_700_000_000;

    struct BrokenBackend;

    #[async_trait]
    impl CacheBackend for BrokenBackend {
        async fn get(&self, _key: &str) -> follower_core::Result<Option<StoredEntry>> {
            Err(FollowerError::storage("table unavailable"))
        }

        async fn put(&self, _key: &str, _entry: StoredEntry) -> follower_core::Result<()> {
            Err(FollowerError::storage("table unavailable"))
        }
    }

    fn snapshot(count: u64) -> FollowerSnapshot {
        FollowerSnapshot {
            username: "bob".into(),
            follower_count: count,
            last_fetched_at: T0,
        }
    }

    fn make_cache() -> (TtlCache<FollowerSnapshot>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(T0));
        let backend = Arc::new(MemoryCacheBackend::new(clock.clone()));
        (TtlCache::new(backend, clock.clone()), clock)
    }

    #[tokio::test]
    async fn test_cache_set_get() {
        let (cache, _) = make_cache();
        assert!(cache.set("bob", &snapshot(500)).await);
        assert_eq!(cache.get("bob").await, Some(snapshot(500)));
    }

    #[tokio::test]
    async fn test_cache_normalize_key() {
        let (cache, _) = make_cache();
        cache.set("  BOB ", &snapshot(1)).await;
        assert!(cache.get("bob").await.is_some());
    }

    #[tokio::test]
    async fn test_cache_miss() {
        let (cache, _) = make_cache();
        assert!(cache.get("nobody").await.is_none());
        assert_eq!(cache.stats().misses, 1);
    }

    #[tokio::test]
    async fn test_cache_ttl_expiration() {
        let (cache, clock) = make_cache();
        cache.set_with_ttl("bob", &snapshot(1), 60).await;

        clock.advance(59);
        assert!(cache.get("bob").await.is_some());

        clock.advance(1);
        assert!(cache.get("bob").await.is_none());
    }

    #[tokio::test]
    async fn test_cache_fails_open_on_backend_error() {
        let clock = Arc::new(ManualClock::new(T0));
        let cache: TtlCache<FollowerSnapshot> = TtlCache::new(Arc::new(BrokenBackend), clock);

        assert!(!cache.set("bob", &snapshot(1)).await);
        assert!(cache.get("bob").await.is_none());

        let stats = cache.stats();
        assert_eq!(stats.errors, 2);
        assert_eq!(stats.hits, 0);
    }

    #[tokio::test]
    async fn test_cache_undecodable_payload_is_miss() {
        let clock = Arc::new(ManualClock::new(T0));
        let backend = Arc::new(MemoryCacheBackend::new(clock.clone()));
        backend
            .put("bob", CacheEntry::new("bob", serde_json::json!("garbage"), T0, 60))
            .await
            .unwrap();

        let cache: TtlCache<FollowerSnapshot> = TtlCache::new(backend, clock);
        assert!(cache.get("bob").await.is_none());
        assert_eq!(cache.stats().errors, 1);
    }

    #[tokio::test]
    async fn test_cache_stats_hit_rate() {
        let (cache, _) = make_cache();
        cache.set("bob", &snapshot(1)).await;
        cache.get("bob").await;
        cache.get("alice").await;
        assert_eq!(cache.stats().hit_rate(), 50.0);
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
    }

    proptest! {
        #[test]
        fn prop_set_then_get_round_trips(count in any::<u64>(), ttl in 1u64..=86_400) {
            let (cache, _) = make_cache();
            let got = runtime().block_on(async {
                cache.set_with_ttl("bob", &snapshot(count), ttl).await;
                cache.get("bob").await
            });
            prop_assert_eq!(got, Some(snapshot(count)));
        }

        #[test]
        fn prop_expired_entries_stay_absent(
            ttl in 1u64..=3_600,
            hits_before in 0usize..5,
            past_expiry in 0i64..10_000,
        ) {
            let (cache, clock) = make_cache();
            let misses = runtime().block_on(async {
                cache.set_with_ttl("bob", &snapshot(7), ttl).await;
                for _ in 0..hits_before {
                    assert!(cache.get("bob").await.is_some());
                }
                clock.advance(ttl as i64 + past_expiry);
                let mut misses = 0;
                for _ in 0..3 {
                    if cache.get("bob").await.is_none() {
                        misses += 1;
                    }
                }
                misses
            });
            prop_assert_eq!(misses, 3);
        }
    }
}

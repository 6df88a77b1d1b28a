//! In-process cache backend.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use follower_core::{CacheBackend, Clock, Result, StoredEntry};

use crate::cache::CacheConfig;

/// In-memory [`CacheBackend`].
///
/// Thread-safe. When full it first drops expired entries (if `auto_cleanup`),
/// then the entry closest to expiry.
pub struct MemoryCacheBackend {
    entries: RwLock<HashMap<String, StoredEntry>>,
    clock: Arc<dyn Clock>,
    config: CacheConfig,
}

impl MemoryCacheBackend {
    /// Creates a backend with default configuration.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_config(clock, CacheConfig::default())
    }

    /// Creates a backend with custom configuration.
    pub fn with_config(clock: Arc<dyn Clock>, config: CacheConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::with_capacity(config.max_entries)),
            clock,
            config,
        }
    }

    /// Returns the number of stored entries, live or not.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl CacheBackend for MemoryCacheBackend {
    async fn get(&self, key: &str) -> Result<Option<StoredEntry>> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn put(&self, key: &str, entry: StoredEntry) -> Result<()> {
        let mut entries = self.entries.write();

        if !entries.contains_key(key) && entries.len() >= self.config.max_entries {
            if self.config.auto_cleanup {
                let now = self.clock.now();
                entries.retain(|_, e| e.is_live(now));
            }
            if entries.len() >= self.config.max_entries {
                if let Some(oldest_key) = entries
                    .iter()
                    .min_by_key(|(_, e)| e.expires_at)
                    .map(|(k, _)| k.clone())
                {
                    entries.remove(&oldest_key);
                }
            }
        }

        entries.insert(key.to_string(), entry);
        Ok(())
    }
}

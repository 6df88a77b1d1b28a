//! Cache entries with absolute expiry.

use serde::{Deserialize, Serialize};

/// A cached payload and the epoch second at which it stops being valid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<T> {
    /// Cache key
    pub key: String,
    /// Cached value
    pub payload: T,
    /// Expiry in epoch seconds
    pub expires_at: i64,
}

/// Opaque entry as it crosses the [`CacheBackend`](crate::CacheBackend) seam.
pub type StoredEntry = CacheEntry<serde_json::Value>;

impl<T> CacheEntry<T> {
    /// Creates an entry that expires `ttl_seconds` after `now`.
    pub fn new(key: impl Into<String>, payload: T, now: i64, ttl_seconds: u64) -> Self {
        let ttl = i64::try_from(ttl_seconds).unwrap_or(i64::MAX);
        Self {
            key: key.into(),
            payload,
            expires_at: now.saturating_add(ttl),
        }
    }

    /// An entry is a hit only while `expires_at > now`.
    pub fn is_live(&self, now: i64) -> bool {
        self.expires_at > now
    }
}

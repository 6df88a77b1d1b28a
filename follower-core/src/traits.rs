//! Common traits for the follower-count service.
//!
//! These are the I/O seams of the request path. Each has an in-process
//! implementation in its own crate and a test double in the crates that
//! consume it.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    AccessToken, FollowerProfile, GraphApiError, MetricSample, RefreshedToken, StoredEntry,
    UserRecord,
};

// ═══════════════════════════════════════════════════════════════════════════════
// TOKEN STORE TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Durable per-user OAuth state, keyed by username.
///
/// Failures are fatal to the caller: the stored token is the only way to reach
/// the Graph API, so every `Err` is a `FollowerError::Storage`.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Loads a user's record. `Ok(None)` means the user is unknown.
    async fn load(&self, username: &str) -> Result<Option<UserRecord>>;

    /// Writes a record, replacing any previous one for the same username.
    async fn save(&self, record: &UserRecord) -> Result<()>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// CACHE BACKEND TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Point get/put store underneath the TTL cache.
///
/// Backends may expire entries on their own, but the reader never relies on it:
/// freshness is decided by comparing `expires_at` with the cache's clock.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Reads an entry.
    async fn get(&self, key: &str) -> Result<Option<StoredEntry>>;

    /// Writes an entry.
    async fn put(&self, key: &str, entry: StoredEntry) -> Result<()>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// GRAPH CLIENT TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Typed access to the Graph API endpoints the service needs.
///
/// Implementations classify every failure into a [`GraphApiError`] and never
/// retry; retry policy belongs to the caller.
#[async_trait]
pub trait GraphClient: Send + Sync {
    /// Fetches the token owner's username and follower count.
    async fn fetch_follower_count(
        &self,
        access_token: &AccessToken,
    ) -> std::result::Result<FollowerProfile, GraphApiError>;

    /// Exchanges a long-lived token for a fresh one.
    async fn refresh_token(
        &self,
        access_token: &AccessToken,
    ) -> std::result::Result<RefreshedToken, GraphApiError>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// METRICS SINK TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Destination for flushed metric batches.
#[async_trait]
pub trait MetricsSink: Send + Sync {
    /// Submits one batch of at most [`METRICS_BATCH_SIZE`](crate::METRICS_BATCH_SIZE) samples.
    async fn put_batch(&self, namespace: &str, batch: &[MetricSample]) -> Result<()>;
}

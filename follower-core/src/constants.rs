//! Service constants and configuration defaults.

// ═══════════════════════════════════════════════════════════════════════════════
// FRESHNESS POLICY
// ═══════════════════════════════════════════════════════════════════════════════

/// Maximum age of a stored follower count before a refetch is required.
pub const DEFAULT_FRESHNESS_WINDOW_SECONDS: i64 = 60;

/// Minimum remaining token lifetime before a proactive refresh.
pub const DEFAULT_REFRESH_MARGIN_SECONDS: i64 = 60;

/// TTL used when writing follower counts through to the cache.
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 60;

// ═══════════════════════════════════════════════════════════════════════════════
// METRICS
// ═══════════════════════════════════════════════════════════════════════════════

/// Maximum number of samples submitted to a sink in one call.
pub const METRICS_BATCH_SIZE: usize = 20;

/// Delay between the first buffered sample and the flush it schedules.
pub const DEFAULT_METRICS_FLUSH_INTERVAL_MS: u64 = 60_000;

/// Namespace attached to every submitted batch.
pub const DEFAULT_METRICS_NAMESPACE: &str = "InstagramFollowerService";

// ═══════════════════════════════════════════════════════════════════════════════
// GRAPH API
// ═══════════════════════════════════════════════════════════════════════════════

/// Base URL of the Instagram Graph API.
pub const DEFAULT_GRAPH_API_BASE_URL: &str = "https://graph.instagram.com";

/// Fields requested from the profile endpoint.
pub const GRAPH_PROFILE_FIELDS: &str = "username,followers_count";

/// Grant type for long-lived token refresh.
pub const GRAPH_REFRESH_GRANT_TYPE: &str = "ig_refresh_token";

/// HTTP client timeout for Graph API calls.
pub const DEFAULT_GRAPH_TIMEOUT_SECONDS: u64 = 10;

// ═══════════════════════════════════════════════════════════════════════════════
// REQUESTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Deadline applied to a whole follower-count request.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Longest username accepted by the request pipeline.
pub const MAX_USERNAME_LENGTH: usize = 30;

// ═══════════════════════════════════════════════════════════════════════════════
// METRIC NAMES
// ═══════════════════════════════════════════════════════════════════════════════

/// Served from the TTL cache.
pub const METRIC_CACHE_HIT: &str = "CacheHit";
/// TTL cache had no live entry.
pub const METRIC_CACHE_MISS: &str = "CacheMiss";
/// Served from the durable record inside the freshness window.
pub const METRIC_RECORD_HIT: &str = "RecordHit";
/// Access token refreshed before fetching.
pub const METRIC_TOKEN_REFRESH: &str = "TokenRefresh";
/// Graph API call failed.
pub const METRIC_API_ERROR: &str = "APIError";
/// Elapsed time of a request that reached the Graph API.
pub const METRIC_API_LATENCY: &str = "APILatency";

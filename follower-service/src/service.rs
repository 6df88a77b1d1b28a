//! Follower-count retrieval.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use follower_cache::{CacheStats, TtlCache};
use follower_core::error::{FollowerError, Result};
use follower_core::traits::{GraphClient, TokenStore};
use follower_core::types::{
    FollowerCountResult, FollowerSnapshot, GraphApiError, GraphErrorKind, MetricSample, UserRecord,
};
use follower_core::{
    Clock, DEFAULT_CACHE_TTL_SECONDS, DEFAULT_FRESHNESS_WINDOW_SECONDS,
    DEFAULT_REFRESH_MARGIN_SECONDS, METRIC_API_ERROR, METRIC_API_LATENCY, METRIC_CACHE_HIT,
    METRIC_CACHE_MISS, METRIC_RECORD_HIT, METRIC_TOKEN_REFRESH,
};
use follower_metrics::MetricsBuffer;

/// Freshness and persistence policy.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// A stored count younger than this is served without a Graph API call
    pub freshness_window_seconds: i64,
    /// Tokens with less lifetime left than this are refreshed before use
    pub refresh_margin_seconds: i64,
    /// TTL of the cache entry written after a fetch
    pub cache_ttl_seconds: u64,
    /// Return a fetched count even if saving it failed
    pub serve_unpersisted: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            freshness_window_seconds: DEFAULT_FRESHNESS_WINDOW_SECONDS,
            refresh_margin_seconds: DEFAULT_REFRESH_MARGIN_SECONDS,
            cache_ttl_seconds: DEFAULT_CACHE_TTL_SECONDS,
            serve_unpersisted: false,
        }
    }
}

/// Cache-aside follower-count lookup over the token store and Graph API.
pub struct FollowerCountService {
    store: Arc<dyn TokenStore>,
    cache: TtlCache<FollowerSnapshot>,
    graph: Arc<dyn GraphClient>,
    metrics: MetricsBuffer,
    clock: Arc<dyn Clock>,
    config: ServiceConfig,
}

impl FollowerCountService {
    /// Wires the service to its collaborators.
    ///
    /// `clock` should be the clock the cache was built with, so cache expiry
    /// and record freshness are judged against the same "now".
    pub fn new(
        store: Arc<dyn TokenStore>,
        cache: TtlCache<FollowerSnapshot>,
        graph: Arc<dyn GraphClient>,
        metrics: MetricsBuffer,
        clock: Arc<dyn Clock>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            store,
            cache,
            graph,
            metrics,
            clock,
            config,
        }
    }

    /// Returns the follower count for `username`.
    ///
    /// `username` is used verbatim as the store and cache key; callers
    /// normalize it first.
    #[instrument(skip(self))]
    pub async fn follower_count(&self, username: &str) -> Result<FollowerCountResult> {
        let started = Instant::now();

        if let Some(cached) = self.cache.get(username).await {
            self.metrics.record(MetricSample::count(METRIC_CACHE_HIT, 1.0));
            let snapshot = self.prefer_fresher_record(cached).await;
            info!(followers = snapshot.follower_count, "Returning cached follower count");
            return Ok(snapshot.into_result(true));
        }
        self.metrics.record(MetricSample::count(METRIC_CACHE_MISS, 1.0));

        let mut record = self
            .store
            .load(username)
            .await?
            .ok_or_else(|| FollowerError::not_found(username))?;

        let now = self.clock.now();
        if let Some((follower_count, last_fetched_at)) =
            record.fresh_count(now, self.config.freshness_window_seconds)
        {
            self.metrics.record(MetricSample::count(METRIC_RECORD_HIT, 1.0));
            info!(followers = follower_count, age = now - last_fetched_at, "Returning stored follower count");
            return Ok(FollowerSnapshot {
                username: record.username.clone(),
                follower_count,
                last_fetched_at,
            }
            .into_result(true));
        }

        if record.token_needs_refresh(now, self.config.refresh_margin_seconds) {
            debug!(remaining = record.token_remaining(now), "Refreshing access token");
            let refreshed = self
                .graph
                .refresh_token(&record.access_token)
                .await
                .map_err(|e| self.refresh_failed(e))?;
            record.apply_refresh(refreshed, self.clock.now());
            self.metrics.record(MetricSample::count(METRIC_TOKEN_REFRESH, 1.0));
        }

        let profile = self
            .graph
            .fetch_follower_count(&record.access_token)
            .await
            .map_err(|e| self.fetch_failed(e))?;
        if profile.username != record.username {
            debug!(provider_username = %profile.username, "Provider reports a different username");
        }
        record.record_fetch(profile.follower_count, self.clock.now());

        self.persist(&record).await?;

        let latency_ms = started.elapsed().as_secs_f64() * 1_000.0;
        self.metrics.record(MetricSample::milliseconds(METRIC_API_LATENCY, latency_ms));

        let snapshot = FollowerSnapshot {
            username: record.username.clone(),
            follower_count: profile.follower_count,
            last_fetched_at: record.last_fetched_at.unwrap_or_else(|| self.clock.now()),
        };
        self.cache
            .set_with_ttl(username, &snapshot, self.config.cache_ttl_seconds)
            .await;

        info!(followers = snapshot.follower_count, latency_ms, "Fetched follower count");
        Ok(snapshot.into_result(false))
    }

    /// Hit, miss and error counters of the follower-count cache.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// On a cache hit, a fresh durable record at least as recent as the cached
    /// value wins, since the cache is populated from it.
    ///
    /// This costs one store read per cache hit; the cache only saves Graph API
    /// calls.
    async fn prefer_fresher_record(&self, cached: FollowerSnapshot) -> FollowerSnapshot {
        let record = match self.store.load(&cached.username).await {
            Ok(Some(record)) => record,
            Ok(None) => return cached,
            Err(e) => {
                warn!(error = %e, "Record check on cache hit failed, serving cached value");
                return cached;
            }
        };

        match record.fresh_count(self.clock.now(), self.config.freshness_window_seconds) {
            Some((follower_count, last_fetched_at)) if last_fetched_at >= cached.last_fetched_at => {
                if follower_count != cached.follower_count {
                    debug!(
                        cached = cached.follower_count,
                        stored = follower_count,
                        "Cache and record disagree, using record"
                    );
                }
                FollowerSnapshot {
                    username: record.username.clone(),
                    follower_count,
                    last_fetched_at,
                }
            }
            _ => cached,
        }
    }

    /// Saves on a spawned task so a caller deadline cannot interrupt a write
    /// that has started.
    async fn persist(&self, record: &UserRecord) -> Result<()> {
        let store = Arc::clone(&self.store);
        let to_save = record.clone();
        let outcome = tokio::spawn(async move { store.save(&to_save).await })
            .await
            .map_err(|e| FollowerError::internal(format!("Persist task failed: {e}")))?;

        match outcome {
            Ok(()) => Ok(()),
            Err(e) if self.config.serve_unpersisted => {
                error!(error = %e, "Failed to persist follower count, serving unpersisted value");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Failed to persist follower count");
                Err(e)
            }
        }
    }

    fn record_api_error(&self, stage: &'static str, err: &GraphApiError) {
        self.metrics.record(
            MetricSample::count(METRIC_API_ERROR, 1.0)
                .with_dimension("stage", stage)
                .with_dimension("kind", format!("{:?}", err.kind)),
        );
    }

    /// A stale token must not be used, so any refresh failure ends the request.
    fn refresh_failed(&self, err: GraphApiError) -> FollowerError {
        self.record_api_error("refresh", &err);
        warn!(kind = ?err.kind, status = ?err.transport_status, "Token refresh failed");
        match err.kind {
            GraphErrorKind::Transport => FollowerError::from(err),
            GraphErrorKind::RateLimit | GraphErrorKind::Upstream => FollowerError::upstream(
                format!("Token refresh failed: {}", err.provider_message),
                err.transport_status,
            ),
        }
    }

    fn fetch_failed(&self, err: GraphApiError) -> FollowerError {
        self.record_api_error("fetch", &err);
        warn!(
            kind = ?err.kind,
            status = ?err.transport_status,
            retry_after = ?err.retry_after_seconds,
            "Follower count fetch failed"
        );
        FollowerError::from(err)
    }
}

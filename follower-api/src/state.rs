//! App state: token store, follower-count pipeline, metrics, config.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use follower_cache::{CacheConfig, MemoryCacheBackend, TtlCache};
use follower_core::error::Result;
use follower_core::traits::{GraphClient, MetricsSink, TokenStore};
use follower_core::{Clock, SystemClock, DEFAULT_REQUEST_TIMEOUT_MS};
use follower_graph::{GraphConfig, InstagramGraphClient};
use follower_metrics::{HttpMetricsSink, MetricsBuffer, MetricsConfig, TracingSink};
use follower_service::{FollowerCountService, ServiceConfig};
use follower_store::{FileTokenStore, MemoryTokenStore};

use crate::pipeline::RequestPipeline;

/// Server configuration, normally read from the environment.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Freshness, refresh, and persistence policy
    pub service: ServiceConfig,
    /// Metric buffering
    pub metrics: MetricsConfig,
    /// HTTP collector for metric batches; logged via tracing when unset
    pub metrics_endpoint: Option<String>,
    /// Graph API endpoint and HTTP timeout
    pub graph: GraphConfig,
    /// Deadline for one follower-count request
    pub request_timeout_ms: u64,
    /// File-backed token store; in-memory when unset
    pub user_store_path: Option<PathBuf>,
    /// Bearer token for user registration; registration is refused when unset
    pub admin_token: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            metrics: MetricsConfig::default(),
            metrics_endpoint: None,
            graph: GraphConfig::default(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            user_store_path: None,
            admin_token: None,
        }
    }
}

impl ApiConfig {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Self {
            service: ServiceConfig {
                freshness_window_seconds: parse_or(
                    "FRESHNESS_WINDOW_SECONDS",
                    var("FRESHNESS_WINDOW_SECONDS"),
                    defaults.service.freshness_window_seconds,
                ),
                refresh_margin_seconds: parse_or(
                    "REFRESH_MARGIN_SECONDS",
                    var("REFRESH_MARGIN_SECONDS"),
                    defaults.service.refresh_margin_seconds,
                ),
                cache_ttl_seconds: parse_or(
                    "CACHE_TTL_SECONDS",
                    var("CACHE_TTL_SECONDS"),
                    defaults.service.cache_ttl_seconds,
                ),
                serve_unpersisted: var("SERVE_UNPERSISTED").map(|v| v == "true").unwrap_or(false),
            },
            metrics: MetricsConfig {
                enabled: var("ENABLE_METRICS").map(|v| v == "true").unwrap_or(false),
                flush_interval_ms: parse_or(
                    "METRICS_FLUSH_INTERVAL",
                    var("METRICS_FLUSH_INTERVAL"),
                    defaults.metrics.flush_interval_ms,
                ),
                namespace: var("METRICS_NAMESPACE").unwrap_or(defaults.metrics.namespace),
            },
            metrics_endpoint: var("METRICS_ENDPOINT"),
            graph: GraphConfig {
                base_url: var("GRAPH_API_BASE_URL").unwrap_or(defaults.graph.base_url),
                timeout_seconds: parse_or(
                    "GRAPH_API_TIMEOUT_SECONDS",
                    var("GRAPH_API_TIMEOUT_SECONDS"),
                    defaults.graph.timeout_seconds,
                ),
            },
            request_timeout_ms: parse_or(
                "REQUEST_TIMEOUT_MS",
                var("REQUEST_TIMEOUT_MS"),
                defaults.request_timeout_ms,
            ),
            user_store_path: var("USER_STORE_PATH").map(PathBuf::from),
            admin_token: var("ADMIN_TOKEN"),
        }
    }
}

fn parse_or<T: FromStr>(name: &str, raw: Option<String>, default: T) -> T {
    match raw {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(variable = name, value = %raw, "Unparseable setting, using default");
            default
        }),
    }
}

/// Shared state behind every handler.
pub struct AppState {
    /// Configuration the state was built from
    pub config: ApiConfig,
    /// Durable per-user OAuth state
    pub store: Arc<dyn TokenStore>,
    /// Follower-count request path
    pub pipeline: RequestPipeline,
    /// Process-wide metric buffer
    pub metrics: MetricsBuffer,
    /// Source of "now" for registrations
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Opens the configured token store and wires the live Graph API client.
    pub async fn new(config: ApiConfig) -> Result<Self> {
        let store: Arc<dyn TokenStore> = match &config.user_store_path {
            Some(path) => {
                let store = FileTokenStore::open(path).await?;
                info!(path = ?path, users = store.len(), "Using file token store");
                Arc::new(store)
            }
            None => {
                warn!("USER_STORE_PATH not set, tokens are kept in memory only");
                Arc::new(MemoryTokenStore::new())
            }
        };
        Self::with_store(config, store, Arc::new(SystemClock))
    }

    /// Uses the given store and clock with the live Graph API client.
    pub fn with_store(
        config: ApiConfig,
        store: Arc<dyn TokenStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let graph = InstagramGraphClient::with_config(config.graph.clone())?;
        Self::with_components(config, store, Arc::new(graph), clock)
    }

    /// Assembles the state from explicit collaborators.
    pub fn with_components(
        config: ApiConfig,
        store: Arc<dyn TokenStore>,
        graph: Arc<dyn GraphClient>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let sink: Arc<dyn MetricsSink> = match &config.metrics_endpoint {
            Some(endpoint) => Arc::new(HttpMetricsSink::new(
                endpoint.as_str(),
                Duration::from_secs(config.graph.timeout_seconds),
            )?),
            None => Arc::new(TracingSink),
        };
        let metrics = MetricsBuffer::new(config.metrics.clone(), sink);

        let cache_config = CacheConfig {
            default_ttl_seconds: config.service.cache_ttl_seconds,
            ..Default::default()
        };
        let backend = MemoryCacheBackend::with_config(clock.clone(), cache_config.clone());
        let cache = TtlCache::with_config(Arc::new(backend), clock.clone(), cache_config);

        let service = FollowerCountService::new(
            store.clone(),
            cache,
            graph,
            metrics.clone(),
            clock.clone(),
            config.service.clone(),
        );
        let pipeline =
            RequestPipeline::new(service, Duration::from_millis(config.request_timeout_ms));

        Ok(Self {
            config,
            store,
            pipeline,
            metrics,
            clock,
        })
    }
}

//! # Follower API Server
//!
//! HTTP front end of the follower-count service, polled by the display
//! devices and fed by the OAuth authorization flow.
//!
//! ## Endpoints
//!
//! - `GET /health` - Liveness and version
//! - `GET /api/v1/users/:username/followers` - Current follower count
//! - `PUT /api/v1/users/:username` - Store the tokens of a newly authorized user
//!
//! ## Example
//!
//! ```rust,ignore
//! use follower_api::{ApiConfig, ApiServer};
//!
//! let server = ApiServer::new(ApiConfig::from_env()).await?;
//! server.run(([0, 0, 0, 0], 3001)).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod dto;
mod error;
mod handlers;
mod pipeline;
mod routes;
mod state;

pub use error::ApiError;
pub use pipeline::{build_registration, validate_username, PipelineResponse, RequestPipeline};
pub use routes::create_router;
pub use state::{ApiConfig, AppState};

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use follower_core::error::Result;

/// API server for the follower-count service.
pub struct ApiServer {
    state: Arc<AppState>,
}

impl ApiServer {
    /// Creates a server, opening the configured token store.
    pub async fn new(config: ApiConfig) -> Result<Self> {
        Ok(Self::from_state(AppState::new(config).await?))
    }

    /// Creates a server around prepared state.
    pub fn from_state(state: AppState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    /// Shared state.
    pub fn state(&self) -> Arc<AppState> {
        self.state.clone()
    }

    /// Creates the router with all routes configured.
    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        create_router(self.state.clone())
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    /// Serves until Ctrl-C, then flushes buffered metrics.
    pub async fn run(self, addr: impl Into<SocketAddr>) -> std::io::Result<()> {
        let addr = addr.into();
        let listener = tokio::net::TcpListener::bind(addr).await?;

        info!("Follower API server listening on {}", addr);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        let report = self.state.metrics.shutdown().await;
        info!(
            samples = report.samples,
            dropped = report.samples_dropped,
            "Server stopped"
        );
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C, graceful shutdown disabled");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

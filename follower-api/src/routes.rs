//! API route configuration.

use std::sync::Arc;

use axum::{
    routing::{get, put},
    Router,
};

use crate::handlers;
use crate::state::AppState;

/// Creates the API router with all routes configured.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))

        // Follower counts
        .route("/api/v1/users/:username/followers", get(handlers::get_followers))

        // Registration (OAuth callback hand-off)
        .route("/api/v1/users/:username", put(handlers::register_user))

        .with_state(state)
}

//! Data Transfer Objects for API requests/responses.

use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════════
// HEALTH
// ═══════════════════════════════════════════════════════════════════════════════

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub cache: CacheHealth,
}

/// Follower-count cache counters since start.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheHealth {
    pub hits: u64,
    pub misses: u64,
    pub errors: u64,
    /// Percent of reads that were hits
    pub hit_rate: f64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// REGISTRATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Outcome of the OAuth code exchange, pushed by the authorization flow.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserRequest {
    pub user_id: String,
    pub access_token: String,
    /// Token lifetime in seconds, as returned by the provider
    pub expires_in: i64,
}

/// Registration response. Never echoes the token.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserResponse {
    pub username: String,
    pub user_id: String,
    pub token_expires_at: i64,
}

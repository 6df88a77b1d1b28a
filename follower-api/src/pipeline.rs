//! Request pipeline: validate, run the service under a deadline, render.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{info_span, warn, Instrument};
use uuid::Uuid;

use follower_core::error::{FollowerError, Result};
use follower_core::types::{AccessToken, FollowerCountResult, UserRecord};
use follower_core::MAX_USERNAME_LENGTH;
use follower_cache::CacheStats;
use follower_service::FollowerCountService;

use crate::error::ApiError;

/// A fully rendered response. Every request produces one.
#[derive(Clone, Debug)]
pub struct PipelineResponse {
    /// HTTP status
    pub status: StatusCode,
    /// JSON body
    pub body: Value,
}

impl PipelineResponse {
    /// 200 with `value` as the body.
    pub fn ok<T: Serialize>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(body) => Self {
                status: StatusCode::OK,
                body,
            },
            Err(e) => ApiError::from(FollowerError::internal(format!("Failed to encode response: {e}"))).into(),
        }
    }
}

impl From<ApiError> for PipelineResponse {
    fn from(err: ApiError) -> Self {
        Self {
            status: err.status(),
            body: err.body(),
        }
    }
}

impl IntoResponse for PipelineResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Front door of the follower-count lookup.
pub struct RequestPipeline {
    service: FollowerCountService,
    timeout: Duration,
}

impl RequestPipeline {
    /// Wraps `service`; each call is abandoned after `timeout`.
    pub fn new(service: FollowerCountService, timeout: Duration) -> Self {
        Self { service, timeout }
    }

    /// Handles one request and renders the outcome.
    pub async fn handle(&self, raw_username: &str) -> PipelineResponse {
        let request_id = Uuid::new_v4();
        let span = info_span!("request", %request_id, username = %raw_username.trim());

        async move {
            match self.lookup(raw_username).await {
                Ok(result) => PipelineResponse::ok(&result),
                Err(err) => {
                    warn!(kind = %err.kind(), "Follower count request failed");
                    ApiError::from(err).into()
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Counters of the cache in front of the service.
    pub fn cache_stats(&self) -> CacheStats {
        self.service.cache_stats()
    }

    /// Validates `raw_username` and runs the service call under the deadline.
    pub async fn lookup(&self, raw_username: &str) -> Result<FollowerCountResult> {
        let username = validate_username(raw_username)?;

        match tokio::time::timeout(self.timeout, self.service.follower_count(&username)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(FollowerError::timeout(format!(
                "Request exceeded {}ms",
                self.timeout.as_millis()
            ))),
        }
    }
}

/// Trims and lowercases an Instagram username, rejecting anything that
/// cannot be one.
pub fn validate_username(raw: &str) -> Result<String> {
    let username = raw.trim();
    if username.is_empty() {
        return Err(FollowerError::validation("username", "Username is required"));
    }
    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(FollowerError::validation(
            "username",
            format!("Username must be at most {MAX_USERNAME_LENGTH} characters"),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_')
    {
        return Err(FollowerError::validation(
            "username",
            "Username may only contain letters, digits, '.' and '_'",
        ));
    }
    Ok(username.to_ascii_lowercase())
}

/// Builds the record for a freshly authorized user.
///
/// `expires_in` is the provider's token lifetime from the OAuth exchange.
pub fn build_registration(
    raw_username: &str,
    user_id: &str,
    access_token: &str,
    expires_in: i64,
    now: i64,
) -> Result<UserRecord> {
    let username = validate_username(raw_username)?;
    let user_id = user_id.trim();
    if user_id.is_empty() {
        return Err(FollowerError::validation("userId", "User id is required"));
    }
    let access_token = AccessToken::new(access_token.trim());
    if access_token.is_blank() {
        return Err(FollowerError::validation("accessToken", "Access token is required"));
    }
    if expires_in <= 0 {
        return Err(FollowerError::validation(
            "expiresIn",
            "Token lifetime must be positive",
        ));
    }
    Ok(UserRecord::from_grant(user_id, username, access_token, expires_in, now))
}

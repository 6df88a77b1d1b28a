//! API error handling.
//!
//! [`ApiError::from`] is the only place a [`FollowerError`] becomes an HTTP
//! status and wire code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};

use follower_core::error::FollowerError;

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    details: Option<Value>,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Attaches a details object. Ignored on 5xx responses.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Bad request error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
    }

    /// Missing or rejected credential.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "AUTHENTICATION_ERROR", message)
    }

    /// Internal server error.
    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", "An internal error occurred")
    }

    /// HTTP status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Wire code, e.g. `NOT_FOUND_ERROR`.
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// Response body as JSON.
    pub fn body(&self) -> Value {
        let body = ErrorBody {
            code: self.code,
            message: &self.message,
            details: if self.status.is_server_error() {
                None
            } else {
                self.details.as_ref()
            },
        };
        serde_json::to_value(body).unwrap_or_else(|_| json!({ "code": self.code }))
    }
}

/// Error response body.
#[derive(Serialize)]
struct ErrorBody<'a> {
    code: &'static str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body())).into_response()
    }
}

impl From<FollowerError> for ApiError {
    fn from(err: FollowerError) -> Self {
        match err {
            FollowerError::Validation(e) => {
                let api = ApiError::validation(e.message);
                match e.field {
                    Some(field) => api.with_details(json!({ "field": field })),
                    None => api,
                }
            }
            FollowerError::Authentication(e) => ApiError::unauthorized(e.message),
            FollowerError::NotFound(e) => ApiError::new(
                StatusCode::NOT_FOUND,
                "NOT_FOUND_ERROR",
                format!("No registered user named {}", e.username),
            ),
            FollowerError::RateLimit(e) => {
                let api = ApiError::new(StatusCode::TOO_MANY_REQUESTS, "RATE_LIMIT_ERROR", e.message);
                match e.retry_after_seconds {
                    Some(seconds) => api.with_details(json!({ "retryAfterSeconds": seconds })),
                    None => api,
                }
            }
            FollowerError::Upstream(ref e) => {
                tracing::error!(status = ?e.status, error = %err, "Upstream failure");
                ApiError::new(StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", "Upstream service error")
            }
            FollowerError::Transport(ref e) => {
                tracing::error!(timed_out = e.timed_out, error = %err, "Transport failure");
                let message = if e.timed_out {
                    "Upstream service timed out"
                } else {
                    "Upstream service unreachable"
                };
                ApiError::new(StatusCode::GATEWAY_TIMEOUT, "TRANSPORT_ERROR", message)
            }
            FollowerError::Storage(_) => {
                tracing::error!(error = %err, "Storage failure");
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR", "Storage unavailable")
            }
            FollowerError::Internal(_) => {
                tracing::error!(error = %err, "Internal error");
                ApiError::internal()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_and_code_table() {
        let cases = [
            (FollowerError::validation("username", "empty"), 400, "VALIDATION_ERROR"),
            (FollowerError::authentication("no token"), 401, "AUTHENTICATION_ERROR"),
            (FollowerError::not_found("alice"), 404, "NOT_FOUND_ERROR"),
            (FollowerError::upstream("boom", Some(400)), 502, "UPSTREAM_ERROR"),
            (FollowerError::transport("reset"), 504, "TRANSPORT_ERROR"),
            (FollowerError::timeout("deadline"), 504, "TRANSPORT_ERROR"),
            (FollowerError::storage("disk full"), 500, "STORAGE_ERROR"),
            (FollowerError::internal("bug"), 500, "INTERNAL_ERROR"),
        ];
        for (err, status, code) in cases {
            let api = ApiError::from(err);
            assert_eq!(api.status().as_u16(), status);
            assert_eq!(api.code(), code);
            assert_eq!(api.body()["code"], code);
        }
    }

    #[test]
    fn test_rate_limit_details_carry_retry_hint() {
        let err = FollowerError::from(follower_core::GraphApiError::from_status(429, Some(30), "slow"));
        let body = ApiError::from(err).body();

        assert_eq!(body["code"], "RATE_LIMIT_ERROR");
        assert_eq!(body["details"]["retryAfterSeconds"], 30);
    }

    #[test]
    fn test_server_errors_hide_provider_message() {
        let body = ApiError::from(FollowerError::upstream(
            "Invalid OAuth access token - Cannot parse access token",
            Some(400),
        ))
        .body();

        assert_eq!(body["message"], "Upstream service error");
        assert!(body.get("details").is_none());
    }

    #[test]
    fn test_details_dropped_on_5xx() {
        let body = ApiError::internal().with_details(json!({ "trace": "x" })).body();
        assert!(body.get("details").is_none());
    }

    #[test]
    fn test_validation_names_field() {
        let body = ApiError::from(FollowerError::validation("username", "Username is required")).body();
        assert_eq!(body["details"]["field"], "username");
        assert_eq!(body["message"], "Username is required");
    }
}

//! Error types for the follower-count service.
//!
//! Every failure is classified once, where it happens, into one [`FollowerError`]
//! variant. Each variant carries its own payload struct so the HTTP boundary can
//! render details without string matching. Cache failures never appear here; the
//! cache absorbs them.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::types::{GraphApiError, GraphErrorKind};

/// Result type alias using `FollowerError`.
pub type Result<T> = std::result::Result<T, FollowerError>;

// ═══════════════════════════════════════════════════════════════════════════════
// PAYLOADS
// ═══════════════════════════════════════════════════════════════════════════════

/// Bad or missing input.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// Human-readable reason
    pub message: String,
    /// Offending field, if one can be named
    pub field: Option<String>,
}

/// Missing or invalid credential.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AuthenticationError {
    /// Human-readable reason
    pub message: String,
}

/// Unknown user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NotFoundError {
    /// Username that was looked up
    pub username: String,
}

/// Upstream throttling.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RateLimitError {
    /// Human-readable reason
    pub message: String,
    /// Provider's back-off hint
    pub retry_after_seconds: Option<u64>,
}

/// Third-party API failure other than rate limiting.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UpstreamError {
    /// Human-readable reason (may contain the provider message; never rendered)
    pub message: String,
    /// HTTP status returned by the provider
    pub status: Option<u16>,
}

/// Network failure or deadline talking to the third party.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TransportError {
    /// Human-readable reason
    pub message: String,
    /// True when the failure was a deadline
    pub timed_out: bool,
}

/// Durable-store failure on a required read or write.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StorageError {
    /// Human-readable reason
    pub message: String,
}

/// Anything unclassified.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InternalError {
    /// Human-readable reason
    pub message: String,
}

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR ENUM
// ═══════════════════════════════════════════════════════════════════════════════

/// Main error type for all follower-count operations.
#[derive(Clone, Debug, Error)]
pub enum FollowerError {
    /// Input validation failed.
    #[error("Validation error: {}", .0.message)]
    Validation(ValidationError),

    /// Credential missing or rejected.
    #[error("Authentication error: {}", .0.message)]
    Authentication(AuthenticationError),

    /// No stored record for this user.
    #[error("User not found: {}", .0.username)]
    NotFound(NotFoundError),

    /// Provider throttled the request.
    #[error("Rate limited: {}", .0.message)]
    RateLimit(RateLimitError),

    /// Provider returned an error.
    #[error("Upstream error: {}", .0.message)]
    Upstream(UpstreamError),

    /// Provider could not be reached in time.
    #[error("Transport error: {}", .0.message)]
    Transport(TransportError),

    /// Durable store failed.
    #[error("Storage error: {}", .0.message)]
    Storage(StorageError),

    /// Internal invariant violation.
    #[error("Internal error: {}", .0.message)]
    Internal(InternalError),
}

/// Fieldless tag of a [`FollowerError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`FollowerError::Validation`]
    Validation,
    /// See [`FollowerError::Authentication`]
    Authentication,
    /// See [`FollowerError::NotFound`]
    NotFound,
    /// See [`FollowerError::RateLimit`]
    RateLimit,
    /// See [`FollowerError::Upstream`]
    Upstream,
    /// See [`FollowerError::Transport`]
    Transport,
    /// See [`FollowerError::Storage`]
    Storage,
    /// See [`FollowerError::Internal`]
    Internal,
}

impl ErrorKind {
    /// Stable name used in logs and metric dimensions.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Authentication => "authentication",
            ErrorKind::NotFound => "not_found",
            ErrorKind::RateLimit => "rate_limit",
            ErrorKind::Upstream => "upstream",
            ErrorKind::Transport => "transport",
            ErrorKind::Storage => "storage",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FollowerError {
    /// Validation failure on a named field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        FollowerError::Validation(ValidationError {
            message: message.into(),
            field: Some(field.into()),
        })
    }

    /// Missing or rejected credential.
    pub fn authentication(message: impl Into<String>) -> Self {
        FollowerError::Authentication(AuthenticationError {
            message: message.into(),
        })
    }

    /// Unknown user.
    pub fn not_found(username: impl Into<String>) -> Self {
        FollowerError::NotFound(NotFoundError {
            username: username.into(),
        })
    }

    /// Upstream failure with an optional provider status.
    pub fn upstream(message: impl Into<String>, status: Option<u16>) -> Self {
        FollowerError::Upstream(UpstreamError {
            message: message.into(),
            status,
        })
    }

    /// Transport failure.
    pub fn transport(message: impl Into<String>) -> Self {
        FollowerError::Transport(TransportError {
            message: message.into(),
            timed_out: false,
        })
    }

    /// Deadline exceeded.
    pub fn timeout(message: impl Into<String>) -> Self {
        FollowerError::Transport(TransportError {
            message: message.into(),
            timed_out: true,
        })
    }

    /// Durable-store failure.
    pub fn storage(message: impl Into<String>) -> Self {
        FollowerError::Storage(StorageError {
            message: message.into(),
        })
    }

    /// Unclassified failure.
    pub fn internal(message: impl Into<String>) -> Self {
        FollowerError::Internal(InternalError {
            message: message.into(),
        })
    }

    /// Returns the fieldless tag of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FollowerError::Validation(_) => ErrorKind::Validation,
            FollowerError::Authentication(_) => ErrorKind::Authentication,
            FollowerError::NotFound(_) => ErrorKind::NotFound,
            FollowerError::RateLimit(_) => ErrorKind::RateLimit,
            FollowerError::Upstream(_) => ErrorKind::Upstream,
            FollowerError::Transport(_) => ErrorKind::Transport,
            FollowerError::Storage(_) => ErrorKind::Storage,
            FollowerError::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<GraphApiError> for FollowerError {
    fn from(err: GraphApiError) -> Self {
        match err.kind {
            GraphErrorKind::RateLimit => FollowerError::RateLimit(RateLimitError {
                message: "Graph API rate limit exceeded".into(),
                retry_after_seconds: err.retry_after_seconds,
            }),
            GraphErrorKind::Upstream => FollowerError::Upstream(UpstreamError {
                message: err.provider_message,
                status: err.transport_status,
            }),
            GraphErrorKind::Transport => FollowerError::Transport(TransportError {
                message: err.provider_message,
                timed_out: false,
            }),
        }
    }
}

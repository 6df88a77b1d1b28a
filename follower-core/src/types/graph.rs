//! Graph API payloads and failures.

use serde::{Deserialize, Serialize};

use crate::types::AccessToken;

/// Profile fields returned by the follower-count endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowerProfile {
    /// Username as reported by the provider
    pub username: String,
    /// Current follower count
    pub follower_count: u64,
}

/// Result of a long-lived token refresh.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefreshedToken {
    /// New access token
    pub access_token: AccessToken,
    /// Lifetime of the new token in seconds
    pub expires_in_seconds: i64,
}

/// Classification of a Graph API failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GraphErrorKind {
    /// HTTP 429
    RateLimit,
    /// Any other non-2xx, or an unreadable success body
    Upstream,
    /// Connection failure or timeout
    Transport,
}

/// Failure returned by a [`GraphClient`](crate::GraphClient).
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("Graph API {kind:?} error (status {transport_status:?}): {provider_message}")]
pub struct GraphApiError {
    /// Classification
    pub kind: GraphErrorKind,
    /// HTTP status, if a response was received
    pub transport_status: Option<u16>,
    /// Back-off hint, present only for rate limits
    pub retry_after_seconds: Option<u64>,
    /// Provider's error message
    pub provider_message: String,
}

impl GraphApiError {
    /// Classifies a non-2xx HTTP response.
    pub fn from_status(
        status: u16,
        retry_after_seconds: Option<u64>,
        provider_message: impl Into<String>,
    ) -> Self {
        if status == 429 {
            Self {
                kind: GraphErrorKind::RateLimit,
                transport_status: Some(status),
                retry_after_seconds,
                provider_message: provider_message.into(),
            }
        } else {
            Self {
                kind: GraphErrorKind::Upstream,
                transport_status: Some(status),
                retry_after_seconds: None,
                provider_message: provider_message.into(),
            }
        }
    }

    /// Connection or timeout failure.
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: GraphErrorKind::Transport,
            transport_status: None,
            retry_after_seconds: None,
            provider_message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(429, GraphErrorKind::RateLimit ; "too many requests")]
    #[test_case(400, GraphErrorKind::Upstream ; "bad request")]
    #[test_case(401, GraphErrorKind::Upstream ; "unauthorized")]
    #[test_case(500, GraphErrorKind::Upstream ; "server error")]
    #[test_case(503, GraphErrorKind::Upstream ; "unavailable")]
    fn test_status_classification(status: u16, expected: GraphErrorKind) {
        assert_eq!(GraphApiError::from_status(status, Some(30), "x").kind, expected);
    }

    #[test]
    fn test_retry_hint_only_on_rate_limit() {
        assert_eq!(GraphApiError::from_status(429, Some(30), "x").retry_after_seconds, Some(30));
        assert_eq!(GraphApiError::from_status(500, Some(30), "x").retry_after_seconds, None);
    }
}

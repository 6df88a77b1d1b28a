//! Graph API client.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use url::Url;

use follower_core::error::{FollowerError, Result};
use follower_core::traits::GraphClient;
use follower_core::types::{
    AccessToken, FollowerProfile, GraphApiError, GraphErrorKind, RefreshedToken,
};
use follower_core::{
    DEFAULT_GRAPH_API_BASE_URL, DEFAULT_GRAPH_TIMEOUT_SECONDS, GRAPH_PROFILE_FIELDS,
    GRAPH_REFRESH_GRANT_TYPE,
};

/// Graph API client configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GraphConfig {
    /// API base URL (e.g., "https://graph.instagram.com")
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GRAPH_API_BASE_URL.into(),
            timeout_seconds: DEFAULT_GRAPH_TIMEOUT_SECONDS,
        }
    }
}

impl GraphConfig {
    /// Creates a config pointing at another base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }
}

/// HTTP client for the Instagram Graph API.
pub struct InstagramGraphClient {
    base_url: Url,
    http_client: reqwest::Client,
}

impl InstagramGraphClient {
    /// Creates a client with default configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(GraphConfig::default())
    }

    /// Creates a client with custom configuration.
    pub fn with_config(config: GraphConfig) -> Result<Self> {
        let mut base_url = Url::parse(&config.base_url).map_err(|e| {
            FollowerError::validation("base_url", format!("Invalid Graph API base URL: {e}"))
        })?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| FollowerError::internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url,
            http_client,
        })
    }

    fn endpoint(&self, path: &str) -> std::result::Result<Url, GraphApiError> {
        self.base_url
            .join(path)
            .map_err(|e| GraphApiError::transport(format!("Invalid endpoint URL: {e}")))
    }

    /// Performs a GET and decodes a 2xx JSON body, classifying every failure.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> std::result::Result<T, GraphApiError> {
        let url = self.endpoint(path)?;

        let response = self
            .http_client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| GraphApiError::transport(describe_transport_error(&e)))?;

        let status = response.status();
        let retry_after = parse_retry_after(response.headers());
        let body = response
            .bytes()
            .await
            .map_err(|e| GraphApiError::transport(describe_transport_error(&e)))?;

        if !status.is_success() {
            let message = provider_message(&body)
                .unwrap_or_else(|| format!("Graph API returned HTTP {}", status.as_u16()));
            warn!(status = status.as_u16(), retry_after, "Graph API request failed");
            return Err(GraphApiError::from_status(status.as_u16(), retry_after, message));
        }

        serde_json::from_slice(&body).map_err(|e| GraphApiError {
            kind: GraphErrorKind::Upstream,
            transport_status: Some(status.as_u16()),
            retry_after_seconds: None,
            provider_message: format!("Unreadable Graph API response: {e}"),
        })
    }
}

#[async_trait]
impl GraphClient for InstagramGraphClient {
    #[instrument(skip_all)]
    async fn fetch_follower_count(
        &self,
        access_token: &AccessToken,
    ) -> std::result::Result<FollowerProfile, GraphApiError> {
        let profile: ProfileResponse = self
            .get_json(
                "me",
                &[
                    ("fields", GRAPH_PROFILE_FIELDS),
                    ("access_token", access_token.expose()),
                ],
            )
            .await?;

        debug!(username = %profile.username, followers = profile.followers_count, "Fetched profile");
        Ok(FollowerProfile {
            username: profile.username,
            follower_count: profile.followers_count,
        })
    }

    #[instrument(skip_all)]
    async fn refresh_token(
        &self,
        access_token: &AccessToken,
    ) -> std::result::Result<RefreshedToken, GraphApiError> {
        let refreshed: RefreshResponse = self
            .get_json(
                "refresh_access_token",
                &[
                    ("grant_type", GRAPH_REFRESH_GRANT_TYPE),
                    ("access_token", access_token.expose()),
                ],
            )
            .await?;

        debug!(expires_in = refreshed.expires_in, "Refreshed access token");
        Ok(RefreshedToken {
            access_token: AccessToken::new(refreshed.access_token),
            expires_in_seconds: refreshed.expires_in,
        })
    }
}

/// Profile endpoint response.
#[derive(Debug, Deserialize)]
struct ProfileResponse {
    username: String,
    followers_count: u64,
}

/// Token refresh response.
#[derive(Deserialize)]
struct RefreshResponse {
    access_token: String,
    expires_in: i64,
}

/// Error bodies come as `{"error": {"message": ...}}` or `{"error_message": ...}`.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<ErrorDetail>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

fn provider_message(body: &[u8]) -> Option<String> {
    let parsed: ErrorResponse = serde_json::from_slice(body).ok()?;
    parsed
        .error
        .and_then(|e| e.message)
        .or(parsed.error_message)
}

fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

fn describe_transport_error(err: &reqwest::Error) -> String {
    let kind = if err.is_timeout() {
        "timed out"
    } else if err.is_connect() {
        "connection failed"
    } else {
        "request failed"
    };
    // Display of a request error embeds the URL, and with it the access token.
    let detail = match err.url() {
        Some(url) => err.to_string().replace(url.as_str(), "<graph-api>"),
        None => err.to_string(),
    };
    format!("Graph API {kind}: {detail}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> InstagramGraphClient {
        InstagramGraphClient::with_config(GraphConfig::with_base_url(server.uri())).unwrap()
    }

    fn token() -> AccessToken {
        AccessToken::new("IGQVJ-test")
    }

    #[tokio::test]
    async fn test_fetch_follower_count() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me"))
            .and(query_param("fields", "username,followers_count"))
            .and(query_param("access_token", "IGQVJ-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "17841400",
                "username": "bob",
                "followers_count": 500
            })))
            .expect(1)
            .mount(&server)
            .await;

        let profile = client_for(&server).fetch_follower_count(&token()).await.unwrap();
        assert_eq!(
            profile,
            FollowerProfile {
                username: "bob".into(),
                follower_count: 500
            }
        );
    }

    #[tokio::test]
    async fn test_refresh_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/refresh_access_token"))
            .and(query_param("grant_type", "ig_refresh_token"))
            .and(query_param("access_token", "IGQVJ-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "IGQVJ-new",
                "token_type": "bearer",
                "expires_in": 5184000
            })))
            .expect(1)
            .mount(&server)
            .await;

        let refreshed = client_for(&server).refresh_token(&token()).await.unwrap();
        assert_eq!(refreshed.access_token.expose(), "IGQVJ-new");
        assert_eq!(refreshed.expires_in_seconds, 5_184_000);
    }

    #[tokio::test]
    async fn test_rate_limit_carries_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me"))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("retry-after", "30")
                    .set_body_json(json!({
                        "error": { "message": "Application request limit reached", "code": 4 }
                    })),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_follower_count(&token()).await.unwrap_err();
        assert_eq!(err.kind, GraphErrorKind::RateLimit);
        assert_eq!(err.transport_status, Some(429));
        assert_eq!(err.retry_after_seconds, Some(30));
        assert_eq!(err.provider_message, "Application request limit reached");
    }

    #[tokio::test]
    async fn test_upstream_error_uses_error_message_field() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/refresh_access_token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error_type": "OAuthException",
                "code": 400,
                "error_message": "Invalid refresh token"
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).refresh_token(&token()).await.unwrap_err();
        assert_eq!(err.kind, GraphErrorKind::Upstream);
        assert_eq!(err.transport_status, Some(400));
        assert_eq!(err.retry_after_seconds, None);
        assert_eq!(err.provider_message, "Invalid refresh token");
    }

    #[tokio::test]
    async fn test_upstream_error_without_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_follower_count(&token()).await.unwrap_err();
        assert_eq!(err.kind, GraphErrorKind::Upstream);
        assert_eq!(err.provider_message, "Graph API returned HTTP 503");
    }

    #[tokio::test]
    async fn test_unreadable_success_body_is_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_follower_count(&token()).await.unwrap_err();
        assert_eq!(err.kind, GraphErrorKind::Upstream);
        assert_eq!(err.transport_status, Some(200));
    }

    #[tokio::test]
    async fn test_connection_failure_is_transport() {
        // Nothing listens on port 1.
        let client =
            InstagramGraphClient::with_config(GraphConfig::with_base_url("http://127.0.0.1:1"))
                .unwrap();

        let err = client.fetch_follower_count(&token()).await.unwrap_err();
        assert_eq!(err.kind, GraphErrorKind::Transport);
        assert_eq!(err.transport_status, None);
        assert!(!err.provider_message.contains("IGQVJ-test"));
    }

    #[tokio::test]
    async fn test_timeout_is_transport() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_secs(3))
                    .set_body_json(json!({ "username": "bob", "followers_count": 1 })),
            )
            .mount(&server)
            .await;

        let client = InstagramGraphClient::with_config(GraphConfig {
            base_url: server.uri(),
            timeout_seconds: 1,
        })
        .unwrap();

        let err = client.fetch_follower_count(&token()).await.unwrap_err();
        assert_eq!(err.kind, GraphErrorKind::Transport);
        assert!(err.provider_message.contains("timed out"));
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let result = InstagramGraphClient::with_config(GraphConfig::with_base_url("not a url"));
        assert!(matches!(result, Err(FollowerError::Validation(_))));
    }

    #[test]
    fn test_base_url_path_is_preserved() {
        let client =
            InstagramGraphClient::with_config(GraphConfig::with_base_url("http://proxy.local/v19.0"))
                .unwrap();
        assert_eq!(client.endpoint("me").unwrap().as_str(), "http://proxy.local/v19.0/me");
    }
}

//! Metrics sinks.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, instrument};

use follower_core::error::{FollowerError, Result};
use follower_core::traits::MetricsSink;
use follower_core::types::MetricSample;

/// Writes every batch to the log.
///
/// Used when no metrics endpoint is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

#[async_trait]
impl MetricsSink for TracingSink {
    async fn put_batch(&self, namespace: &str, batch: &[MetricSample]) -> Result<()> {
        info!(namespace, size = batch.len(), "Metric batch");
        for sample in batch {
            debug!(
                namespace,
                name = %sample.name,
                value = sample.value,
                unit = ?sample.unit,
                "Metric"
            );
        }
        Ok(())
    }
}

/// Posts batches as JSON to an HTTP collector.
///
/// Body: `{"namespace": "...", "metricData": [sample, ...]}`. Any non-2xx
/// status is a failed batch; the response body is not read.
pub struct HttpMetricsSink {
    endpoint: String,
    http_client: reqwest::Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PutMetricData<'a> {
    namespace: &'a str,
    metric_data: &'a [MetricSample],
}

impl HttpMetricsSink {
    /// Creates a sink posting to `endpoint`.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let endpoint = endpoint.into();
        url::Url::parse(&endpoint).map_err(|e| {
            FollowerError::validation("metrics_endpoint", format!("Invalid metrics endpoint: {e}"))
        })?;

        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FollowerError::internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            endpoint,
            http_client,
        })
    }
}

#[async_trait]
impl MetricsSink for HttpMetricsSink {
    #[instrument(skip(self, batch), fields(size = batch.len()))]
    async fn put_batch(&self, namespace: &str, batch: &[MetricSample]) -> Result<()> {
        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&PutMetricData {
                namespace,
                metric_data: batch,
            })
            .send()
            .await
            .map_err(|e| FollowerError::transport(format!("Metrics sink unreachable: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FollowerError::upstream(
                format!("Metrics sink returned HTTP {}", status.as_u16()),
                Some(status.as_u16()),
            ));
        }

        debug!("Metric batch accepted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn batch() -> Vec<MetricSample> {
        vec![
            MetricSample::count("CacheHit", 1.0),
            MetricSample::milliseconds("APILatency", 120.0).with_dimension("path", "fetch"),
        ]
    }

    #[tokio::test]
    async fn test_tracing_sink_accepts_everything() {
        assert!(TracingSink.put_batch("Test", &batch()).await.is_ok());
    }

    #[tokio::test]
    async fn test_http_sink_posts_batch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/metrics"))
            .and(body_partial_json(serde_json::json!({
                "namespace": "InstagramFollowerService",
                "metricData": [
                    { "name": "CacheHit", "value": 1.0, "unit": "Count" },
                    { "name": "APILatency", "unit": "Milliseconds", "dimensions": { "path": "fetch" } }
                ]
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let sink = HttpMetricsSink::new(format!("{}/metrics", server.uri()), Duration::from_secs(5)).unwrap();
        sink.put_batch("InstagramFollowerService", &batch()).await.unwrap();
    }

    #[tokio::test]
    async fn test_http_sink_rejection_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let sink = HttpMetricsSink::new(server.uri(), Duration::from_secs(5)).unwrap();
        let err = sink.put_batch("Test", &batch()).await.unwrap_err();
        assert!(matches!(err, FollowerError::Upstream(_)));
    }

    #[test]
    fn test_http_sink_rejects_bad_endpoint() {
        assert!(HttpMetricsSink::new("::nope::", Duration::from_secs(1)).is_err());
    }
}

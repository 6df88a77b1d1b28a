//! Metric observations.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unit of a metric value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricUnit {
    /// Plain counter
    Count,
    /// Duration in milliseconds
    Milliseconds,
    /// Ratio in percent
    Percent,
}

/// One counter or latency observation awaiting flush.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSample {
    /// Metric name, e.g. `CacheHit`
    pub name: String,
    /// Observed value
    pub value: f64,
    /// Unit of `value`
    pub unit: MetricUnit,
    /// Dimension tags
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dimensions: BTreeMap<String, String>,
    /// Observation time
    pub timestamp: DateTime<Utc>,
}

impl MetricSample {
    /// Creates a sample stamped with the current time.
    pub fn new(name: impl Into<String>, value: f64, unit: MetricUnit) -> Self {
        Self {
            name: name.into(),
            value,
            unit,
            dimensions: BTreeMap::new(),
            timestamp: Utc::now(),
        }
    }

    /// Counter sample.
    pub fn count(name: impl Into<String>, value: f64) -> Self {
        Self::new(name, value, MetricUnit::Count)
    }

    /// Latency sample.
    pub fn milliseconds(name: impl Into<String>, millis: f64) -> Self {
        Self::new(name, millis, MetricUnit::Milliseconds)
    }

    /// Adds a dimension tag.
    pub fn with_dimension(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.dimensions.insert(name.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_builders() {
        let sample = MetricSample::count("APIError", 1.0).with_dimension("kind", "rate_limit");
        assert_eq!(sample.unit, MetricUnit::Count);
        assert_eq!(sample.dimensions.get("kind").map(String::as_str), Some("rate_limit"));

        let latency = MetricSample::milliseconds("APILatency", 42.0);
        assert_eq!(latency.unit, MetricUnit::Milliseconds);
    }

    #[test]
    fn test_unit_wire_names() {
        assert_eq!(serde_json::to_value(MetricUnit::Milliseconds).unwrap(), "Milliseconds");
        assert_eq!(serde_json::to_value(MetricUnit::Percent).unwrap(), "Percent");
    }
}

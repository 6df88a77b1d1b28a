//! # Follower Metrics
//!
//! Process-wide buffering of counter and latency observations.
//!
//! Samples are appended by [`MetricsBuffer::record`]; the first sample after an
//! idle period arms a single timer, and when it fires the whole buffer is
//! drained and submitted to a [`MetricsSink`](follower_core::MetricsSink) in
//! batches of [`METRICS_BATCH_SIZE`](follower_core::METRICS_BATCH_SIZE).
//!
//! Delivery is best-effort and at most once per sample: a failed batch is
//! logged and dropped, and samples still buffered when the process exits
//! without [`MetricsBuffer::shutdown`] are lost.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod buffer;
mod sink;

pub use buffer::{FlushReport, MetricsBuffer, MetricsConfig};
pub use sink::{HttpMetricsSink, TracingSink};

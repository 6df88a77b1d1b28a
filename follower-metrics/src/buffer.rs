//! Buffered metrics with a single-flight flush timer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use follower_core::traits::MetricsSink;
use follower_core::types::MetricSample;
use follower_core::{DEFAULT_METRICS_FLUSH_INTERVAL_MS, DEFAULT_METRICS_NAMESPACE, METRICS_BATCH_SIZE};

/// Metrics configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// When false, `record` is a no-op
    pub enabled: bool,
    /// Delay between the first buffered sample and its flush
    pub flush_interval_ms: u64,
    /// Namespace passed to the sink with every batch
    pub namespace: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            flush_interval_ms: DEFAULT_METRICS_FLUSH_INTERVAL_MS,
            namespace: DEFAULT_METRICS_NAMESPACE.into(),
        }
    }
}

/// Outcome of one flush.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Samples drained from the buffer
    pub samples: usize,
    /// Batches the sink accepted
    pub batches_sent: usize,
    /// Batches the sink rejected
    pub batches_failed: usize,
    /// Samples lost with the rejected batches
    pub samples_dropped: usize,
}

/// Process-wide metric buffer.
///
/// Cheap to clone; clones share one buffer. `record` may be called from any
/// number of tasks concurrently. At most one flush timer is armed and at most
/// one flush runs at a time.
#[derive(Clone)]
pub struct MetricsBuffer {
    inner: Arc<Inner>,
}

struct Inner {
    config: MetricsConfig,
    sink: Arc<dyn MetricsSink>,
    samples: Mutex<Vec<MetricSample>>,
    timer_armed: AtomicBool,
    flush_lock: tokio::sync::Mutex<()>,
}

impl MetricsBuffer {
    /// Creates a buffer that flushes into `sink`.
    pub fn new(config: MetricsConfig, sink: Arc<dyn MetricsSink>) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                sink,
                samples: Mutex::new(Vec::new()),
                timer_armed: AtomicBool::new(false),
                flush_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Buffers a sample and arms the flush timer if none is pending.
    pub fn record(&self, sample: MetricSample) {
        if !self.inner.config.enabled {
            return;
        }
        self.inner.samples.lock().push(sample);
        self.arm_timer();
    }

    fn arm_timer(&self) {
        if self
            .inner
            .timer_armed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                self.inner.timer_armed.store(false, Ordering::Release);
                warn!("No async runtime, metrics flush not scheduled");
                return;
            }
        };

        let inner = Arc::clone(&self.inner);
        let interval = Duration::from_millis(inner.config.flush_interval_ms);
        debug!(interval_ms = inner.config.flush_interval_ms, "Metrics flush scheduled");
        handle.spawn(async move {
            tokio::time::sleep(interval).await;
            // Disarm before draining so samples recorded during the flush
            // schedule the next one.
            inner.timer_armed.store(false, Ordering::Release);
            inner.flush().await;
        });
    }

    /// Drains the buffer into the sink now.
    pub async fn flush(&self) -> FlushReport {
        self.inner.flush().await
    }

    /// Best-effort final flush before the process exits.
    pub async fn shutdown(&self) -> FlushReport {
        let pending = self.len();
        info!(pending, "Flushing metrics before shutdown");
        self.inner.flush().await
    }

    /// Number of buffered samples.
    pub fn len(&self) -> usize {
        self.inner.samples.lock().len()
    }

    /// Returns true if nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.inner.samples.lock().is_empty()
    }

    /// Returns true if a flush timer is armed.
    pub fn flush_pending(&self) -> bool {
        self.inner.timer_armed.load(Ordering::Acquire)
    }
}

impl Inner {
    async fn flush(&self) -> FlushReport {
        let _guard = self.flush_lock.lock().await;

        let samples = std::mem::take(&mut *self.samples.lock());
        if samples.is_empty() {
            return FlushReport::default();
        }

        let mut report = FlushReport {
            samples: samples.len(),
            ..Default::default()
        };

        for (index, batch) in samples.chunks(METRICS_BATCH_SIZE).enumerate() {
            match self.sink.put_batch(&self.config.namespace, batch).await {
                Ok(()) => report.batches_sent += 1,
                Err(e) => {
                    report.batches_failed += 1;
                    report.samples_dropped += batch.len();
                    error!(batch = index, size = batch.len(), error = %e, "Failed to submit metric batch");
                }
            }
        }

        if report.batches_failed == 0 {
            debug!(samples = report.samples, batches = report.batches_sent, "Metrics flushed");
        } else {
            warn!(
                samples = report.samples,
                sent = report.batches_sent,
                failed = report.batches_failed,
                dropped = report.samples_dropped,
                "Metrics flush partially failed"
            );
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use follower_core::FollowerError;

    #[derive(Default)]
    struct RecordingSink {
        batches: Mutex<Vec<Vec<MetricSample>>>,
        calls: Mutex<usize>,
        fail_batch: Option<usize>,
    }

    impl RecordingSink {
        fn failing_on(batch: usize) -> Self {
            Self {
                fail_batch: Some(batch),
                ..Default::default()
            }
        }

        fn batch_sizes(&self) -> Vec<usize> {
            self.batches.lock().iter().map(Vec::len).collect()
        }

        fn total(&self) -> usize {
            self.batch_sizes().iter().sum()
        }
    }

    #[async_trait]
    impl MetricsSink for RecordingSink {
        async fn put_batch(&self, namespace: &str, batch: &[MetricSample]) -> follower_core::Result<()> {
            assert_eq!(namespace, "Test");
            let call = {
                let mut calls = self.calls.lock();
                let call = *calls;
                *calls += 1;
                call
            };
            if self.fail_batch == Some(call) {
                return Err(FollowerError::upstream("sink unavailable", Some(503)));
            }
            self.batches.lock().push(batch.to_vec());
            Ok(())
        }
    }

    fn config(interval_ms: u64) -> MetricsConfig {
        MetricsConfig {
            enabled: true,
            flush_interval_ms: interval_ms,
            namespace: "Test".into(),
        }
    }

    fn sample(i: usize) -> MetricSample {
        MetricSample::count("CacheHit", i as f64)
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_flush_partitions_into_batches() {
        let sink = Arc::new(RecordingSink::default());
        let buffer = MetricsBuffer::new(config(60_000), sink.clone());
        for i in 0..45 {
            buffer.record(sample(i));
        }

        let report = buffer.flush().await;

        assert_eq!(sink.batch_sizes(), vec![20, 20, 5]);
        assert_eq!(report.batches_sent, 3);
        assert_eq!(report.samples, 45);
        assert!(buffer.is_empty());
    }

    #[tokio::test]
    async fn test_exact_multiple_of_batch_size() {
        let sink = Arc::new(RecordingSink::default());
        let buffer = MetricsBuffer::new(config(60_000), sink.clone());
        for i in 0..40 {
            buffer.record(sample(i));
        }

        buffer.flush().await;
        assert_eq!(sink.batch_sizes(), vec![20, 20]);
    }

    #[tokio::test]
    async fn test_failed_batch_is_dropped_and_buffer_cleared() {
        let sink = Arc::new(RecordingSink::failing_on(1));
        let buffer = MetricsBuffer::new(config(60_000), sink.clone());
        for i in 0..50 {
            buffer.record(sample(i));
        }

        let report = buffer.flush().await;

        assert_eq!(report.batches_sent, 2);
        assert_eq!(report.batches_failed, 1);
        assert_eq!(report.samples_dropped, 20);
        assert_eq!(sink.batch_sizes(), vec![20, 10]);
        assert!(buffer.is_empty());
    }

    #[tokio::test]
    async fn test_empty_flush_is_noop() {
        let sink = Arc::new(RecordingSink::default());
        let buffer = MetricsBuffer::new(config(60_000), sink.clone());
        assert_eq!(buffer.flush().await, FlushReport::default());
        assert_eq!(*sink.calls.lock(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_flushes_once_after_interval() {
        let sink = Arc::new(RecordingSink::default());
        let buffer = MetricsBuffer::new(config(1_000), sink.clone());

        for i in 0..45 {
            buffer.record(sample(i));
        }
        assert!(buffer.flush_pending());

        tokio::time::sleep(Duration::from_millis(999)).await;
        settle().await;
        assert!(sink.batch_sizes().is_empty());

        tokio::time::sleep(Duration::from_millis(2)).await;
        settle().await;
        assert_eq!(sink.batch_sizes(), vec![20, 20, 5]);
        assert!(buffer.is_empty());
        assert!(!buffer.flush_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_record_after_flush_arms_new_timer() {
        let sink = Arc::new(RecordingSink::default());
        let buffer = MetricsBuffer::new(config(1_000), sink.clone());

        buffer.record(sample(0));
        tokio::time::sleep(Duration::from_millis(1_001)).await;
        settle().await;
        assert_eq!(sink.batch_sizes(), vec![1]);

        buffer.record(sample(1));
        assert!(buffer.flush_pending());
        tokio::time::sleep(Duration::from_millis(1_001)).await;
        settle().await;
        assert_eq!(sink.batch_sizes(), vec![1, 1]);
    }

    #[tokio::test]
    async fn test_disabled_buffer_records_nothing() {
        let sink = Arc::new(RecordingSink::default());
        let buffer = MetricsBuffer::new(
            MetricsConfig {
                enabled: false,
                ..config(1_000)
            },
            sink,
        );
        buffer.record(sample(0));
        assert!(buffer.is_empty());
        assert!(!buffer.flush_pending());
    }

    #[test]
    fn test_record_without_runtime_keeps_sample() {
        let buffer = MetricsBuffer::new(config(1_000), Arc::new(RecordingSink::default()));
        buffer.record(sample(0));
        assert_eq!(buffer.len(), 1);
        assert!(!buffer.flush_pending());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_record_loses_nothing() {
        let sink = Arc::new(RecordingSink::default());
        let buffer = MetricsBuffer::new(config(60_000), sink.clone());

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let buffer = buffer.clone();
                tokio::spawn(async move {
                    for i in 0..100 {
                        buffer.record(sample(i));
                    }
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(buffer.len(), 800);
        let report = buffer.shutdown().await;
        assert_eq!(report.batches_sent, 40);
        assert_eq!(sink.total(), 800);
    }
}

//! Periodic driver of push exporters.

use std::{sync::Arc, time::Duration};

use bmc_metrics::ResourceMetrics;
use tokio::{runtime::Handle, sync::oneshot, task::JoinHandle};

use crate::exporter::{ExportResult, PushMetricExporter};

/// Source of metric snapshots, e.g. an aggregation layer collecting instrument data.
pub trait MetricProducer: Send + 'static {
    /// Produces a snapshot for a single export cycle.
    fn produce(&mut self) -> ResourceMetrics;
}

impl<F> MetricProducer for F
where
    F: FnMut() -> ResourceMetrics + Send + 'static,
{
    fn produce(&mut self) -> ResourceMetrics {
        self()
    }
}

/// Reader periodically producing snapshots and exporting them.
///
/// The reader is started explicitly with [`Self::start()`] and stopped with the returned [`ReaderHandle`].
/// On shutdown, the reader performs a final export and then shuts the exporter down.
#[derive(Debug, Clone, Copy)]
pub struct PeriodicReader {
    interval: Duration,
    export_timeout: Duration,
}

impl Default for PeriodicReader {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            export_timeout: Duration::from_millis(500),
        }
    }
}

impl PeriodicReader {
    /// Creates a reader with the specified interval between exports and the default
    /// export timeout (500ms).
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            ..Self::default()
        }
    }

    /// Sets the timeout for a single export. An export exceeding the timeout is logged,
    /// and the reader waits for it to complete before the next export or exporter shutdown,
    /// so that exports never overlap.
    #[must_use]
    pub fn with_export_timeout(mut self, timeout: Duration) -> Self {
        self.export_timeout = timeout;
        self
    }

    /// Starts exporting snapshots from the `producer` on the `runtime`.
    pub fn start<E, P>(self, exporter: Arc<E>, producer: P, runtime: &Handle) -> ReaderHandle
    where
        E: PushMetricExporter + 'static,
        P: MetricProducer,
    {
        let (shutdown_sender, shutdown) = oneshot::channel();
        let task = runtime.spawn(self.run(exporter, producer, shutdown));
        ReaderHandle {
            shutdown_sender: Some(shutdown_sender),
            task,
        }
    }

    async fn run<E, P>(
        self,
        exporter: Arc<E>,
        mut producer: P,
        mut shutdown: oneshot::Receiver<()>,
    ) -> bool
    where
        E: PushMetricExporter + 'static,
        P: MetricProducer,
    {
        let interval = self.interval;
        tracing::info!("Starting periodic metrics reader with export interval {interval:?}");

        loop {
            let mut shutdown_requested = false;
            if tokio::time::timeout(interval, &mut shutdown).await.is_ok() {
                tracing::info!("Stop signal received, periodic metrics reader is shutting down");
                shutdown_requested = true;
            }

            self.export(&exporter, producer.produce()).await;
            if shutdown_requested {
                break;
            }
        }
        exporter.shutdown(self.export_timeout)
    }

    async fn export<E>(&self, exporter: &Arc<E>, snapshot: ResourceMetrics)
    where
        E: PushMetricExporter + 'static,
    {
        let exporter = Arc::clone(exporter);
        // Exports are synchronous; run them off the async workers so that a slow export
        // doesn't stall other tasks.
        let mut export_task = tokio::task::spawn_blocking(move || exporter.export(&snapshot));
        let result = match tokio::time::timeout(self.export_timeout, &mut export_task).await {
            Ok(result) => result,
            Err(_) => {
                let timeout = self.export_timeout;
                tracing::warn!("Metrics export takes longer than {timeout:?}; waiting for it");
                // Exports must not overlap.
                export_task.await
            }
        };

        match result {
            Ok(ExportResult::Success) => { /* exported successfully */ }
            Ok(ExportResult::Failure) => {
                tracing::warn!("Metrics export has failed");
            }
            Err(err) => {
                tracing::error!(%err, "Metrics export has panicked");
            }
        }
    }
}

/// Handle to a started [`PeriodicReader`].
///
/// Dropping the handle without calling [`Self::shutdown()`] stops the reader as well
/// (including the final export), but doesn't wait for it.
#[derive(Debug)]
#[must_use = "Reader should be `shutdown()` explicitly"]
pub struct ReaderHandle {
    shutdown_sender: Option<oneshot::Sender<()>>,
    task: JoinHandle<bool>,
}

impl ReaderHandle {
    /// Stops the reader: performs a final export and shuts down the exporter.
    /// Returns the result of the exporter shutdown.
    pub async fn shutdown(mut self) -> bool {
        if let Some(sender) = self.shutdown_sender.take() {
            sender.send(()).ok();
        }
        match (&mut self.task).await {
            Ok(is_shut_down) => is_shut_down,
            Err(err) => {
                tracing::error!(%err, "Periodic metrics reader has panicked");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    };

    use bmc_metrics::{
        data::{AggregationTemporality, InstrumentKind, ScopeMetrics},
        InstrumentationScope, Resource,
    };

    use super::*;
    use crate::{
        exporter::{PushMetricExporter, TextMetricsExporter},
        testonly::RecordingTransport,
    };

    fn producer(counter: Arc<AtomicUsize>) -> impl MetricProducer {
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            let mut snapshot = ResourceMetrics::new(Arc::new(Resource::empty()));
            snapshot.scope_metrics.push(ScopeMetrics {
                scope: InstrumentationScope::new("reader_test"),
                metrics: vec![],
            });
            snapshot
        }
    }

    #[tokio::test]
    async fn reader_exports_periodically_and_on_shutdown() {
        let transport = Arc::new(RecordingTransport::default());
        let exporter = Arc::new(TextMetricsExporter::from_transport(Arc::clone(&transport)));
        let produced = Arc::new(AtomicUsize::new(0));

        let reader = PeriodicReader::new(Duration::from_millis(20));
        let handle = reader.start(
            Arc::clone(&exporter),
            producer(Arc::clone(&produced)),
            &Handle::current(),
        );
        tokio::time::sleep(Duration::from_millis(150)).await;
        let exports_before_shutdown = transport.payloads().len();
        assert!(exports_before_shutdown >= 2, "{exports_before_shutdown}");

        assert!(handle.shutdown().await);
        assert!(exporter.is_shut_down());
        let payloads = transport.payloads();
        assert!(payloads.len() > exports_before_shutdown);
        assert_eq!(payloads.len(), produced.load(Ordering::SeqCst));
        assert!(payloads
            .iter()
            .all(|payload| payload.body.contains("scope name\t: reader_test")));
    }

    #[derive(Debug, Default)]
    struct SlowExporter {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        exports: AtomicUsize,
        exports_after_shutdown: AtomicUsize,
        is_shut_down: AtomicBool,
    }

    impl PushMetricExporter for SlowExporter {
        fn export(&self, _snapshot: &ResourceMetrics) -> ExportResult {
            let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(50));
            if self.is_shut_down.load(Ordering::SeqCst) {
                self.exports_after_shutdown.fetch_add(1, Ordering::SeqCst);
            }
            self.exports.fetch_add(1, Ordering::SeqCst);
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            ExportResult::Success
        }

        fn force_flush(&self, _timeout: Duration) -> bool {
            true
        }

        fn shutdown(&self, _timeout: Duration) -> bool {
            self.is_shut_down.store(true, Ordering::SeqCst);
            true
        }

        fn aggregation_temporality(&self, _kind: InstrumentKind) -> AggregationTemporality {
            AggregationTemporality::Cumulative
        }
    }

    #[tokio::test]
    async fn slow_exports_do_not_overlap() {
        let exporter = Arc::new(SlowExporter::default());
        let produced = Arc::new(AtomicUsize::new(0));

        let handle = PeriodicReader::new(Duration::from_millis(10))
            .with_export_timeout(Duration::from_millis(5))
            .start(
                Arc::clone(&exporter),
                producer(Arc::clone(&produced)),
                &Handle::current(),
            );
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(handle.shutdown().await);

        assert!(exporter.is_shut_down.load(Ordering::SeqCst));
        assert_eq!(exporter.max_in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(exporter.in_flight.load(Ordering::SeqCst), 0);
        assert_eq!(exporter.exports_after_shutdown.load(Ordering::SeqCst), 0);
        let exports = exporter.exports.load(Ordering::SeqCst);
        assert!(exports >= 2, "{exports}");
        assert_eq!(exports, produced.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn reader_shutdown_before_first_tick() {
        let transport = Arc::new(RecordingTransport::default());
        let exporter = Arc::new(TextMetricsExporter::from_transport(Arc::clone(&transport)));
        let produced = Arc::new(AtomicUsize::new(0));

        let handle = PeriodicReader::new(Duration::from_secs(3_600)).start(
            Arc::clone(&exporter),
            producer(Arc::clone(&produced)),
            &Handle::current(),
        );
        assert!(handle.shutdown().await);

        // Only the final export is performed.
        assert_eq!(transport.payloads().len(), 1);
        assert_eq!(produced.load(Ordering::SeqCst), 1);
        assert_eq!(
            exporter.export(&ResourceMetrics::new(Arc::new(Resource::empty()))),
            ExportResult::Failure
        );
    }
}

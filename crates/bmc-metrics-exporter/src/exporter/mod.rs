//! `MetricsExporter` and closely related types.

use std::{
    fmt,
    time::{Duration, Instant},
};

use bmc_metrics::{
    data::{AggregationTemporality, InstrumentKind},
    render_exposition, render_text, Format, ResourceMetrics, TranslationError, TranslationOptions,
};
use tokio::runtime::Handle;

use crate::{
    policy::DeliveryPolicy,
    state::ExportState,
    transport::{HttpTransport, Payload, Transport},
};


/// Outcome of a single [`PushMetricExporter::export()`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "Export result should be checked"]
pub enum ExportResult {
    /// Snapshot was rendered and handed over to the transport. This does not mean
    /// that the payload was delivered.
    Success,
    /// Snapshot was not exported, e.g. because the exporter is shut down.
    Failure,
}

/// Push-based metric exporter driven by a periodic reader.
///
/// All methods may be called concurrently from different threads.
pub trait PushMetricExporter: Send + Sync {
    /// Exports a metric snapshot. The snapshot is only borrowed for the duration of the call.
    fn export(&self, snapshot: &ResourceMetrics) -> ExportResult;

    /// Flushes buffered data. Returns `true` on success.
    fn force_flush(&self, timeout: Duration) -> bool;

    /// Shuts the exporter down. All subsequent exports fail. Idempotent; returns `true` on success.
    fn shutdown(&self, timeout: Duration) -> bool;

    /// Returns the aggregation temporality expected by the exporter for the instrument `kind`.
    fn aggregation_temporality(&self, kind: InstrumentKind) -> AggregationTemporality;
}

/// Renderer of metric snapshots into payloads.
pub trait Render: fmt::Debug + Send + Sync + 'static {
    /// Human-readable renderer name used in logs.
    const NAME: &'static str;

    /// Returns the HTTP content type of rendered payloads.
    fn content_type(&self) -> &'static str;

    /// Renders the `snapshot`.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be represented in the rendered format.
    fn render(&self, snapshot: &ResourceMetrics) -> Result<String, TranslationError>;
}

/// Human-readable diagnostic text renderer. See [`render_text()`] for the format.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiagnosticText;

impl DiagnosticText {
    /// Content type of rendered payloads.
    pub const CONTENT_TYPE: &'static str = "text/plain; charset=utf-8";
}

impl Render for DiagnosticText {
    const NAME: &'static str = "diagnostic text";

    fn content_type(&self) -> &'static str {
        Self::CONTENT_TYPE
    }

    fn render(&self, snapshot: &ResourceMetrics) -> Result<String, TranslationError> {
        Ok(render_text(snapshot))
    }
}

/// Prometheus / OpenMetrics exposition renderer. See [`render_exposition()`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Exposition {
    format: Format,
    options: TranslationOptions,
}

impl Render for Exposition {
    const NAME: &'static str = "exposition";

    fn content_type(&self) -> &'static str {
        self.format.content_type()
    }

    fn render(&self, snapshot: &ResourceMetrics) -> Result<String, TranslationError> {
        render_exposition(snapshot, &self.options, self.format)
    }
}

/// Metrics exporter rendering snapshots with `R` and handing them over to the transport `T`.
///
/// The exporter is active after creation and can be shut down once; exports after the shutdown
/// fail without rendering or delivery. Exports never block on network I/O.
///
/// # Examples
///
/// See crate-level docs for the examples of usage.
pub struct MetricsExporter<R, T = HttpTransport> {
    renderer: R,
    transport: T,
    state: ExportState,
    temporality: AggregationTemporality,
}

/// Exporter of human-readable diagnostic text.
pub type TextMetricsExporter<T = HttpTransport> = MetricsExporter<DiagnosticText, T>;
/// Exporter of Prometheus / OpenMetrics exposition text.
pub type ExpositionMetricsExporter<T = HttpTransport> = MetricsExporter<Exposition, T>;

impl<R: Render, T: Transport> fmt::Debug for MetricsExporter<R, T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("MetricsExporter")
            .field("renderer", &self.renderer)
            .field("transport", &self.transport)
            .field("is_shut_down", &self.state.is_shut_down())
            .field("temporality", &self.temporality)
            .finish()
    }
}

impl<R: Render + Default> MetricsExporter<R> {
    /// Creates an exporter delivering payloads over HTTP according to the `policy`.
    /// The delivery worker is spawned on the `runtime`.
    pub fn new(policy: DeliveryPolicy, runtime: &Handle) -> Self {
        Self::from_transport(HttpTransport::new(policy, runtime))
    }
}

impl<R: Render + Default, T: Transport> MetricsExporter<R, T> {
    /// Creates an exporter with a custom transport.
    pub fn from_transport(transport: T) -> Self {
        tracing::info!("Created {} metrics exporter", R::NAME);
        Self {
            renderer: R::default(),
            transport,
            state: ExportState::default(),
            temporality: AggregationTemporality::default(),
        }
    }
}

impl<R: Render, T: Transport> MetricsExporter<R, T> {
    /// Sets the aggregation temporality reported for all instrument kinds.
    /// By default, [`AggregationTemporality::Cumulative`] is used.
    #[must_use]
    pub fn with_temporality(mut self, temporality: AggregationTemporality) -> Self {
        self.temporality = temporality;
        self
    }

    /// Returns the transport used by this exporter.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Checks whether this exporter is shut down.
    pub fn is_shut_down(&self) -> bool {
        self.state.is_shut_down()
    }
}

impl<T: Transport> MetricsExporter<Exposition, T> {
    /// Sets the exposition [`Format`]. By default, [`Format::Prometheus`] is used.
    #[must_use]
    pub fn with_format(mut self, format: Format) -> Self {
        self.renderer.format = format;
        self
    }

    /// Sets snapshot translation options.
    #[must_use]
    pub fn with_options(mut self, options: TranslationOptions) -> Self {
        self.renderer.options = options;
        self
    }
}

impl<R: Render, T: Transport> PushMetricExporter for MetricsExporter<R, T> {
    fn export(&self, snapshot: &ResourceMetrics) -> ExportResult {
        if self.state.is_shut_down() {
            return ExportResult::Failure;
        }

        let started_at = Instant::now();
        let body = match self.renderer.render(snapshot) {
            Ok(body) => body,
            Err(err) => {
                tracing::error!(%err, "Failed rendering metrics snapshot");
                return ExportResult::Failure;
            }
        };
        let latency = started_at.elapsed();
        let payload_size = body.len();
        tracing::debug!(
            latency_sec = latency.as_secs_f64(),
            payload_size,
            "Rendered metrics using {} renderer in {latency:?} (payload size: {payload_size}B)",
            R::NAME
        );

        self.transport.send_event(Payload {
            body,
            content_type: self.renderer.content_type(),
        });
        ExportResult::Success
    }

    fn force_flush(&self, _timeout: Duration) -> bool {
        // Deliveries are fire-and-forget; there is nothing to wait for.
        true
    }

    fn shutdown(&self, _timeout: Duration) -> bool {
        if self.state.shut_down() {
            tracing::info!("{} metrics exporter is shut down", R::NAME);
        }
        true
    }

    fn aggregation_temporality(&self, _kind: InstrumentKind) -> AggregationTemporality {
        self.temporality
    }
}

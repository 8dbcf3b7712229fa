//! Push-based exporters delivering [`bmc_metrics`] snapshots to a remote collector.
//!
//! # Overview
//!
//! - [`MetricsExporter`] renders snapshots and hands the rendered payloads over to a [`Transport`].
//!   Two variants are provided: [`TextMetricsExporter`] producing human-readable diagnostic text,
//!   and [`ExpositionMetricsExporter`] producing Prometheus / OpenMetrics exposition text.
//! - Exporters implement the [`PushMetricExporter`] lifecycle: they can be shut down once,
//!   after which all exports fail without side effects.
//! - [`HttpTransport`] delivers payloads with `POST` requests in the background, according to
//!   a [`DeliveryPolicy`] (TLS verification, connection pool size, retries, success callback).
//!   Delivery policies are usually built from a serializable [`DeliveryConfig`].
//! - [`PeriodicReader`] drives an exporter on a fixed interval.
//!
//! # Examples
//!
//! ```no_run
//! use bmc_metrics::{Format, Resource, ResourceMetrics};
//! use bmc_metrics_exporter::{
//!     DeliveryConfig, ExpositionMetricsExporter, PeriodicReader, SuccessHandler,
//! };
//! use std::{sync::Arc, time::Duration};
//!
//! # async fn test() -> anyhow::Result<()> {
//! let policy = DeliveryConfig::new("https://collector.local:8443/metrics")
//!     .into_policy()?
//!     .with_success_handler(SuccessHandler::new(|_request, response| {
//!         println!("Delivered metrics: {}", response.status);
//!     }));
//! let runtime = tokio::runtime::Handle::current();
//! let exporter = ExpositionMetricsExporter::new(policy, &runtime)
//!     .with_format(Format::OpenMetricsForPrometheus);
//!
//! let resource = Arc::new(Resource::empty());
//! let producer = move || ResourceMetrics::new(resource.clone());
//! let reader = PeriodicReader::new(Duration::from_secs(5))
//!     .start(Arc::new(exporter), producer, &runtime);
//! // Do something else...
//! reader.shutdown().await;
//! # Ok(())
//! # }
//! ```

// Linter settings.
#![warn(missing_debug_implementations, missing_docs, bare_trait_objects)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::must_use_candidate, clippy::module_name_repetitions)]

mod exporter;
mod policy;
mod reader;
mod state;
#[cfg(test)]
mod testonly;
mod tls;
mod transport;

pub use crate::{
    exporter::{
        DiagnosticText, ExportResult, Exposition, ExpositionMetricsExporter, MetricsExporter,
        PushMetricExporter, Render, TextMetricsExporter,
    },
    policy::{
        DeliveryConfig, DeliveryPolicy, DeliveryRequest, DeliveryResponse, PolicyError,
        SuccessHandler, TlsConfig, TlsMode,
    },
    reader::{MetricProducer, PeriodicReader, ReaderHandle},
    tls::TlsError,
    transport::{DeliveryError, HttpTransport, Payload, Transport},
};

//! Metric snapshot data model and renderers.
//!
//! # Overview
//!
//! - A [`ResourceMetrics`] snapshot describes all metrics collected for a [`Resource`] during
//!   a single export cycle: metric records grouped by [`InstrumentationScope`], each record containing
//!   points (sums, histograms or last values) together with their [`Attributes`].
//! - Snapshots are traversed with [`walk()`], which invokes a [`SnapshotVisitor`] for each scope,
//!   metric record and point. Dropped points and malformed histograms never reach visitors.
//! - [`render_text()`] renders a snapshot into a human-readable diagnostic text block per scope.
//! - [`render_exposition()`] translates a snapshot into [`MetricFamily`]s and encodes them
//!   in the Prometheus or OpenMetrics text [`Format`].
//!
//! # Examples
//!
//! ```
//! use bmc_metrics::{
//!     data::*, render_exposition, render_text, Format, Resource, TranslationOptions,
//! };
//! use std::{sync::Arc, time::SystemTime};
//!
//! let now = SystemTime::now();
//! let point = PointData::Sum(SumPoint {
//!     value: NumericValue::I64(42),
//!     is_monotonic: true,
//! });
//! let metric = MetricData {
//!     instrument: InstrumentDescriptor::new(
//!         "redfish_requests",
//!         InstrumentKind::Counter,
//!         InstrumentValueType::I64,
//!     )
//!     .with_description("Number of processed Redfish requests"),
//!     aggregation_temporality: AggregationTemporality::Cumulative,
//!     start_ts: now,
//!     end_ts: now,
//!     points: vec![PointDataAttributes::new(
//!         point,
//!         [("method".to_owned(), "GET".into())].into(),
//!     )],
//! };
//! let mut snapshot = ResourceMetrics::new(Arc::new(Resource::empty()));
//! snapshot.scope_metrics.push(ScopeMetrics {
//!     scope: InstrumentationScope::new("bmcweb"),
//!     metrics: vec![metric],
//! });
//!
//! let text = render_text(&snapshot);
//! assert!(text.contains("instrument name\t: redfish_requests"));
//!
//! let options = TranslationOptions::default();
//! let exposition = render_exposition(&snapshot, &options, Format::Prometheus)?;
//! assert!(exposition.contains(
//!     "redfish_requests{method=\"GET\",otel_scope_name=\"bmcweb\"} 42"
//! ));
//! # Ok::<_, bmc_metrics::TranslationError>(())
//! ```

// Linter settings.
#![warn(missing_debug_implementations, missing_docs, bare_trait_objects)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::must_use_candidate, clippy::module_name_repetitions)]

mod attributes;
pub mod data;
mod exposition;
mod format;
mod text;
mod walker;

pub use crate::{
    attributes::{AttributeValue, Attributes},
    data::{InstrumentationScope, Resource, ResourceMetrics},
    exposition::{
        encode_families, render_exposition, translate, FamilyType, MetricFamily, Sample,
        SampleValue, TranslationError, TranslationOptions,
    },
    format::Format,
    text::{render_text, TextRenderer},
    walker::{walk, Point, SnapshotVisitor},
};

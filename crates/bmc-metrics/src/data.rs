//! Data model of a metric snapshot: resource, instrumentation scopes, metric records and points.
//!
//! The model is read-only for all consumers in this workspace. A [`ResourceMetrics`] snapshot
//! is produced by an upstream aggregation layer right before an export cycle and discarded
//! once the export call returns.

use std::{fmt, sync::Arc, time::SystemTime};

use crate::attributes::Attributes;

/// Numeric value of a point. Renderers must branch on the variant explicitly; values
/// are never converted between the variants implicitly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericValue {
    /// Signed integer value.
    I64(i64),
    /// Floating-point value.
    F64(f64),
}

impl NumericValue {
    /// Returns this value as a floating-point number.
    #[allow(clippy::cast_precision_loss)] // OK for exposition
    pub fn as_f64(self) -> f64 {
        match self {
            Self::I64(value) => value as f64,
            Self::F64(value) => value,
        }
    }
}

impl fmt::Display for NumericValue {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I64(value) => write!(formatter, "{value}"),
            Self::F64(value) => write!(formatter, "{value}"),
        }
    }
}

impl From<i64> for NumericValue {
    fn from(value: i64) -> Self {
        Self::I64(value)
    }
}

impl From<f64> for NumericValue {
    fn from(value: f64) -> Self {
        Self::F64(value)
    }
}

/// Aggregation temporality of reported values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AggregationTemporality {
    /// Values are reported as deltas since the previous export.
    Delta,
    /// Values are reported as cumulative since the start of the collection.
    #[default]
    Cumulative,
}

/// Kind of a metric instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum InstrumentKind {
    /// Monotonic counter.
    Counter,
    /// Counter that can go up or down.
    UpDownCounter,
    /// Histogram of observed values.
    Histogram,
    /// Synchronous gauge.
    Gauge,
    /// Monotonic counter observed via a callback.
    ObservableCounter,
    /// Up / down counter observed via a callback.
    ObservableUpDownCounter,
    /// Gauge observed via a callback.
    ObservableGauge,
}

impl InstrumentKind {
    /// All supported instrument kinds.
    pub const ALL: [Self; 7] = [
        Self::Counter,
        Self::UpDownCounter,
        Self::Histogram,
        Self::Gauge,
        Self::ObservableCounter,
        Self::ObservableUpDownCounter,
        Self::ObservableGauge,
    ];
}

/// Type of values recorded by an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstrumentValueType {
    /// Signed integers.
    I64,
    /// Floating-point values.
    F64,
}

/// Descriptor of the instrument that produced a [`MetricData`] record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentDescriptor {
    /// Instrument name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Measurement unit, e.g. `ms` or `By`. May be empty.
    pub unit: String,
    /// Instrument kind.
    pub kind: InstrumentKind,
    /// Type of recorded values.
    pub value_type: InstrumentValueType,
}

impl InstrumentDescriptor {
    /// Creates a descriptor with an empty description and unit.
    pub fn new(name: impl Into<String>, kind: InstrumentKind, value_type: InstrumentValueType) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            unit: String::new(),
            kind,
            value_type,
        }
    }

    /// Sets the instrument description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the measurement unit.
    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }
}

/// Sum aggregation (counters and up / down counters).
#[derive(Debug, Clone, PartialEq)]
pub struct SumPoint {
    /// Aggregated value.
    pub value: NumericValue,
    /// Whether the sum can only increase.
    pub is_monotonic: bool,
}

/// Minimum and maximum recorded by a histogram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinMax {
    /// Minimum observed value.
    pub min: NumericValue,
    /// Maximum observed value.
    pub max: NumericValue,
}

/// Explicit-bucket histogram aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramPoint {
    /// Number of observations.
    pub count: u64,
    /// Sum of observations.
    pub sum: NumericValue,
    /// Extremes of observations; present only if the aggregation records them.
    pub min_max: Option<MinMax>,
    /// Ascending upper bucket boundaries.
    pub boundaries: Vec<f64>,
    /// Per-bucket (non-cumulative) counts. Has one more element than `boundaries`; the last
    /// element counts observations above the last boundary.
    pub counts: Vec<u64>,
}

impl HistogramPoint {
    /// Checks that bucket counts match the boundaries.
    pub fn is_well_formed(&self) -> bool {
        self.counts.len() == self.boundaries.len() + 1
    }
}

/// Last observed value (gauges).
#[derive(Debug, Clone, PartialEq)]
pub struct LastValuePoint {
    /// When the value was observed.
    pub timestamp: SystemTime,
    /// Whether a value was observed during the collection interval.
    pub is_valid: bool,
    /// Observed value.
    pub value: NumericValue,
}

/// Aggregated data of a single point.
#[derive(Debug, Clone, PartialEq)]
pub enum PointData {
    /// Sum aggregation.
    Sum(SumPoint),
    /// Histogram aggregation.
    Histogram(HistogramPoint),
    /// Last-value aggregation.
    LastValue(LastValuePoint),
    /// Dropped point. Carries no data and is never rendered.
    Drop,
}

/// Point data together with the attributes identifying its series.
#[derive(Debug, Clone, PartialEq)]
pub struct PointDataAttributes {
    /// Series attributes.
    pub attributes: Attributes,
    /// Point data.
    pub point_data: PointData,
}

impl PointDataAttributes {
    /// Creates a point with the specified attributes.
    pub fn new(point_data: PointData, attributes: Attributes) -> Self {
        Self {
            attributes,
            point_data,
        }
    }
}

/// Data of a single instrument collected over an interval.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricData {
    /// Instrument descriptor.
    pub instrument: InstrumentDescriptor,
    /// Temporality of the reported values.
    pub aggregation_temporality: AggregationTemporality,
    /// Start of the collection interval.
    pub start_ts: SystemTime,
    /// End of the collection interval; never earlier than `start_ts`.
    pub end_ts: SystemTime,
    /// Points in the order they were collected.
    pub points: Vec<PointDataAttributes>,
}

/// Identity of an instrumentation library.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct InstrumentationScope {
    /// Scope name.
    pub name: String,
    /// Scope version. May be empty.
    pub version: String,
    /// Schema URL. May be empty.
    pub schema_url: String,
}

impl InstrumentationScope {
    /// Creates a scope with the specified name and an empty version and schema URL.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the scope version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Sets the schema URL.
    #[must_use]
    pub fn with_schema_url(mut self, schema_url: impl Into<String>) -> Self {
        self.schema_url = schema_url.into();
        self
    }
}

/// Metrics produced by a single instrumentation scope.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeMetrics {
    /// Scope identity.
    pub scope: InstrumentationScope,
    /// Metric records in collection order.
    pub metrics: Vec<MetricData>,
}

/// Identifying attributes of the process / service emitting metrics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resource {
    attributes: Attributes,
}

impl Resource {
    /// Creates a resource with the specified attributes.
    pub fn new(attributes: Attributes) -> Self {
        Self { attributes }
    }

    /// Creates a resource without attributes.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns attributes of this resource.
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }
}

/// Snapshot of all metrics for a resource exported during a single export cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceMetrics {
    /// Resource shared by all metrics in the snapshot.
    pub resource: Arc<Resource>,
    /// Metrics grouped by instrumentation scope.
    pub scope_metrics: Vec<ScopeMetrics>,
}

impl ResourceMetrics {
    /// Creates an empty snapshot for the specified resource.
    pub fn new(resource: Arc<Resource>) -> Self {
        Self {
            resource,
            scope_metrics: Vec::new(),
        }
    }

    /// Returns the total number of points in this snapshot, including dropped ones.
    pub fn point_count(&self) -> usize {
        self.scope_metrics
            .iter()
            .flat_map(|scope| &scope.metrics)
            .map(|metric| metric.points.len())
            .sum()
    }
}

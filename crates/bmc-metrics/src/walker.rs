//! Traversal of [`ResourceMetrics`] snapshots shared by all renderers.

use crate::{
    attributes::Attributes,
    data::{
        HistogramPoint, InstrumentationScope, LastValuePoint, MetricData, PointData, Resource,
        ResourceMetrics, SumPoint,
    },
};

/// Point data passed to a [`SnapshotVisitor`]. Unlike [`PointData`], this type has no variant
/// for dropped points; they never reach visitors.
#[derive(Debug, Clone, Copy)]
pub enum Point<'a> {
    /// Sum aggregation.
    Sum(&'a SumPoint),
    /// Histogram aggregation with well-formed buckets.
    Histogram(&'a HistogramPoint),
    /// Last-value aggregation.
    LastValue(&'a LastValuePoint),
}

impl<'a> Point<'a> {
    /// Returns `None` for dropped and malformed points.
    fn new(data: &'a PointData, metric: &MetricData) -> Option<Self> {
        match data {
            PointData::Sum(sum) => Some(Self::Sum(sum)),
            PointData::Histogram(histogram) if histogram.is_well_formed() => {
                Some(Self::Histogram(histogram))
            }
            PointData::Histogram(histogram) => {
                tracing::warn!(
                    metric = %metric.instrument.name,
                    boundaries = histogram.boundaries.len(),
                    counts = histogram.counts.len(),
                    "Skipping histogram point with bucket counts not matching boundaries"
                );
                None
            }
            PointData::LastValue(last_value) => Some(Self::LastValue(last_value)),
            PointData::Drop => None,
        }
    }
}

/// Visitor of snapshot contents.
///
/// Callbacks are invoked in snapshot order: for each scope, [`Self::visit_scope()`]; then for each
/// metric record in the scope, [`Self::visit_metric()`], [`Self::visit_point()`] for each rendered point
/// and [`Self::visit_resource()`]; finally, [`Self::end_scope()`].
pub trait SnapshotVisitor {
    /// Error returned by the visitor. The walker itself never fails.
    type Error;

    /// Starts visiting an instrumentation scope.
    fn visit_scope(&mut self, scope: &InstrumentationScope) -> Result<(), Self::Error>;

    /// Starts visiting a metric record.
    fn visit_metric(&mut self, metric: &MetricData) -> Result<(), Self::Error>;

    /// Visits a single point of the last visited metric record.
    fn visit_point(
        &mut self,
        metric: &MetricData,
        point: Point<'_>,
        attributes: &Attributes,
    ) -> Result<(), Self::Error>;

    /// Visits the snapshot resource after all points of a metric record are visited.
    fn visit_resource(
        &mut self,
        _metric: &MetricData,
        _resource: &Resource,
    ) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Finishes visiting an instrumentation scope.
    fn end_scope(&mut self, _scope: &InstrumentationScope) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Walks the `snapshot` invoking `visitor` callbacks.
///
/// Dropped points are skipped, as are histogram points whose `counts` do not have exactly one
/// more element than `boundaries` (a warning is logged for the latter).
///
/// # Errors
///
/// Proxies errors returned by the `visitor`.
pub fn walk<V: SnapshotVisitor>(snapshot: &ResourceMetrics, visitor: &mut V) -> Result<(), V::Error> {
    for scope_metrics in &snapshot.scope_metrics {
        visitor.visit_scope(&scope_metrics.scope)?;
        for metric in &scope_metrics.metrics {
            visitor.visit_metric(metric)?;
            for point in &metric.points {
                if let Some(view) = Point::new(&point.point_data, metric) {
                    visitor.visit_point(metric, view, &point.attributes)?;
                }
            }
            visitor.visit_resource(metric, &snapshot.resource)?;
        }
        visitor.end_scope(&scope_metrics.scope)?;
    }
    Ok(())
}

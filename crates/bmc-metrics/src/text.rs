//! Diagnostic text rendering of metric snapshots.

use std::{
    fmt,
    time::{SystemTime, UNIX_EPOCH},
};

use chrono::{DateTime, Utc};

use crate::{
    attributes::Attributes,
    data::{InstrumentationScope, MetricData, Resource, ResourceMetrics},
    walker::{walk, Point, SnapshotVisitor},
};

// Separators between field labels and values; they differ between fields.
const TAB: &str = "\t: ";
const DOUBLE_TAB: &str = "\t\t: ";
const PADDED: &str = "     : ";

/// Renders metric snapshots into a human-readable block per instrumentation scope.
///
/// Each block is enclosed in braces and contains the scope identity, then for each metric record
/// its interval and descriptor, every non-dropped point with its attributes, and the resource
/// attributes.
#[derive(Debug)]
pub struct TextRenderer<W> {
    writer: W,
}

impl<W: fmt::Write> TextRenderer<W> {
    /// Creates a renderer writing to the specified `writer`.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Renders the `snapshot`.
    ///
    /// # Errors
    ///
    /// Proxies formatting errors of the underlying writer.
    pub fn render(&mut self, snapshot: &ResourceMetrics) -> fmt::Result {
        walk(snapshot, self)
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_field(
        &mut self,
        label: &str,
        separator: &str,
        value: impl fmt::Display,
    ) -> fmt::Result {
        write!(self.writer, "\n  {label}{separator}{value}")
    }

    fn write_list<T: fmt::Display>(&mut self, label: &str, values: &[T]) -> fmt::Result {
        write!(self.writer, "\n  {label}{PADDED}[")?;
        for (i, value) in values.iter().enumerate() {
            if i > 0 {
                self.writer.write_str(", ")?;
            }
            write!(self.writer, "{value}")?;
        }
        self.writer.write_str("]")
    }

    fn write_attributes(&mut self, attributes: &Attributes) -> fmt::Result {
        for (name, value) in attributes {
            write!(self.writer, "\n\t{name}: {value}")?;
        }
        Ok(())
    }
}

/// Formats a timestamp using the preferred date / time representation in UTC,
/// e.g. `Mon Oct 19 18:21:00 2026`.
fn format_time(timestamp: SystemTime) -> impl fmt::Display {
    DateTime::<Utc>::from(timestamp).format("%c")
}

fn nanos_since_epoch(timestamp: SystemTime) -> u128 {
    timestamp
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_nanos())
}

impl<W: fmt::Write> SnapshotVisitor for TextRenderer<W> {
    type Error = fmt::Error;

    fn visit_scope(&mut self, scope: &InstrumentationScope) -> fmt::Result {
        self.writer.write_str("{")?;
        self.write_field("scope name", TAB, &scope.name)?;
        self.write_field("schema url", TAB, &scope.schema_url)?;
        self.write_field("version", TAB, &scope.version)
    }

    fn visit_metric(&mut self, metric: &MetricData) -> fmt::Result {
        self.write_field("start time", TAB, format_time(metric.start_ts))?;
        self.write_field("end time", TAB, format_time(metric.end_ts))?;
        self.write_field("instrument name", TAB, &metric.instrument.name)?;
        self.write_field("description", TAB, &metric.instrument.description)?;
        self.write_field("unit", DOUBLE_TAB, &metric.instrument.unit)
    }

    fn visit_point(
        &mut self,
        _metric: &MetricData,
        point: Point<'_>,
        attributes: &Attributes,
    ) -> fmt::Result {
        match point {
            Point::Sum(sum) => {
                self.write_field("type", DOUBLE_TAB, "SumPointData")?;
                self.write_field("value", DOUBLE_TAB, sum.value)?;
            }
            Point::Histogram(histogram) => {
                self.write_field("type", PADDED, "HistogramPointData")?;
                self.write_field("count", PADDED, histogram.count)?;
                self.write_field("sum", PADDED, histogram.sum)?;
                if let Some(min_max) = &histogram.min_max {
                    self.write_field("min", PADDED, min_max.min)?;
                    self.write_field("max", PADDED, min_max.max)?;
                }
                self.write_list("buckets", &histogram.boundaries)?;
                self.write_list("counts", &histogram.counts)?;
            }
            Point::LastValue(last_value) => {
                self.write_field("type", PADDED, "LastValuePointData")?;
                let timestamp = nanos_since_epoch(last_value.timestamp);
                self.write_field("timestamp", PADDED, timestamp)?;
                self.write_field("valid", PADDED, last_value.is_valid)?;
                self.write_field("value", PADDED, last_value.value)?;
            }
        }

        self.writer.write_str("\n  attributes\t\t: ")?;
        self.write_attributes(attributes)
    }

    fn visit_resource(&mut self, _metric: &MetricData, resource: &Resource) -> fmt::Result {
        self.writer.write_str("\n  resources\t:")?;
        self.write_attributes(resource.attributes())
    }

    fn end_scope(&mut self, _scope: &InstrumentationScope) -> fmt::Result {
        self.writer.write_str("\n}\n")
    }
}

/// Renders the `snapshot` into a string using [`TextRenderer`].
pub fn render_text(snapshot: &ResourceMetrics) -> String {
    let mut renderer = TextRenderer::new(String::with_capacity(1_024));
    renderer.render(snapshot).unwrap();
    // ^ `unwrap()` is safe; writing to a string never fails.
    renderer.into_inner()
}

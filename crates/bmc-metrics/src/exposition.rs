//! Translation of metric snapshots into metric families and their exposition text encoding.
//!
//! Translation maps snapshot points to Prometheus / OpenMetrics concepts:
//!
//! - Monotonic sums become counters, non-monotonic sums and last values become gauges,
//!   histograms become histograms with an implicit `+Inf` bucket.
//! - Metric, unit and label names are sanitized to the characters allowed by the exposition format.
//! - Point attributes become labels. Optionally, the instrumentation scope is attached
//!   as `otel_scope_name` / `otel_scope_version` labels, and resource attributes are reported
//!   as labels of a `target_info` gauge.
//!
//! Encoding is performed by [`prometheus-client`](https://docs.rs/prometheus-client/).

use std::{collections::HashMap, fmt};

use prometheus_client::{
    collector::Collector,
    encoding::{text, DescriptorEncoder, MetricEncoder, NoLabelSet},
    metrics::MetricType,
    registry::{Registry, Unit},
};

use crate::{
    attributes::Attributes,
    data::{InstrumentationScope, MetricData, NumericValue, Resource, ResourceMetrics},
    format::{Format, PrometheusWrapper},
    walker::{walk, Point, SnapshotVisitor},
};

const SCOPE_NAME_LABEL: &str = "otel_scope_name";
const BUCKET_LABEL: &str = "le";
/// Separator of values of attributes mapping to the same label name.
const MERGED_VALUES_SEPARATOR: char = ';';
const SCOPE_VERSION_LABEL: &str = "otel_scope_version";
const TARGET_INFO_NAME: &str = "target_info";
const TARGET_INFO_HELP: &str = "Target metadata";

/// Error translating or encoding a metric snapshot.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum TranslationError {
    /// Metric name cannot be represented in the exposition format.
    #[error("metric name `{0}` cannot be represented in exposition format")]
    InvalidName(String),
    /// Several instruments map to the same metric family, but with different types.
    #[error("metric family `{name}` is reported both as {existing:?} and {new:?}")]
    ConflictingType {
        /// Name of the metric family.
        name: String,
        /// Type of the already translated family.
        existing: FamilyType,
        /// Conflicting type.
        new: FamilyType,
    },
    /// Monotonic sum has a negative value.
    #[error("monotonic sum `{0}` has a negative value")]
    NegativeCounter(String),
    /// Encoding translated families has failed.
    #[error("failed encoding metric families")]
    Encode(#[from] fmt::Error),
}

/// Options for [`translate()`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranslationOptions {
    /// Attach `otel_scope_name` and `otel_scope_version` labels to every sample. Enabled by default.
    pub scope_labels: bool,
    /// Report resource attributes as a `target_info` gauge. Disabled by default.
    pub target_info: bool,
}

impl Default for TranslationOptions {
    fn default() -> Self {
        Self {
            scope_labels: true,
            target_info: false,
        }
    }
}

/// Type of a [`MetricFamily`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FamilyType {
    /// Monotonically increasing counter.
    Counter,
    /// Value that can go up or down.
    Gauge,
    /// Explicit-bucket histogram.
    Histogram,
}

impl From<FamilyType> for MetricType {
    fn from(ty: FamilyType) -> Self {
        match ty {
            FamilyType::Counter => Self::Counter,
            FamilyType::Gauge => Self::Gauge,
            FamilyType::Histogram => Self::Histogram,
        }
    }
}

/// Value of a single [`Sample`].
#[derive(Debug, Clone, PartialEq)]
pub enum SampleValue {
    /// Counter value; integer values are never negative.
    Counter(NumericValue),
    /// Gauge value.
    Gauge(NumericValue),
    /// Histogram value.
    Histogram {
        /// Sum of observations.
        sum: f64,
        /// Number of observations.
        count: u64,
        /// Pairs of upper bucket bounds and non-cumulative bucket counts. The last bound
        /// is `f64::MAX`, which is encoded as `+Inf`.
        buckets: Vec<(f64, u64)>,
    },
}

impl SampleValue {
    fn family_type(&self) -> FamilyType {
        match self {
            Self::Counter(_) => FamilyType::Counter,
            Self::Gauge(_) => FamilyType::Gauge,
            Self::Histogram { .. } => FamilyType::Histogram,
        }
    }

    fn encode(&self, encoder: &mut MetricEncoder<'_>) -> fmt::Result {
        match self {
            Self::Counter(NumericValue::I64(value)) => {
                let value = u64::try_from(*value).map_err(|_| fmt::Error)?;
                encoder.encode_counter::<NoLabelSet, _, f64>(&value, None)
            }
            Self::Counter(NumericValue::F64(value)) => {
                encoder.encode_counter::<NoLabelSet, _, f64>(value, None)
            }
            Self::Gauge(NumericValue::I64(value)) => encoder.encode_gauge(value),
            Self::Gauge(NumericValue::F64(value)) => encoder.encode_gauge(value),
            Self::Histogram {
                sum,
                count,
                buckets,
            } => encoder.encode_histogram::<NoLabelSet>(*sum, *count, buckets, None),
        }
    }
}

/// Single series of a [`MetricFamily`].
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Label names and values identifying the series.
    pub labels: Vec<(String, String)>,
    /// Sample value.
    pub value: SampleValue,
}

/// Metric family: a named group of series sharing type, help and unit.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricFamily {
    /// Sanitized family name, excluding the unit suffix.
    pub name: String,
    /// Help text.
    pub help: String,
    /// Sanitized measurement unit.
    pub unit: Option<String>,
    /// Family type.
    pub metric_type: FamilyType,
    /// Series in the order they were translated.
    pub samples: Vec<Sample>,
}

fn sanitize(raw: &str, allow_colons: bool) -> String {
    let mut sanitized: String = raw
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '_' || (allow_colons && ch == ':') {
                ch
            } else {
                '_'
            }
        })
        .collect();
    if sanitized.starts_with(|ch: char| ch.is_ascii_digit()) {
        sanitized.insert(0, '_');
    }
    sanitized
}

fn sanitize_metric_name(raw: &str) -> Option<String> {
    let name = sanitize(raw, true);
    (!name.is_empty() && name.chars().any(|ch| ch != '_')).then_some(name)
}

fn sanitize_label_name(raw: &str) -> String {
    sanitize(raw, false)
}

/// The encoder writes label values as is, so quotes, backslashes and line breaks are escaped here.
fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Converts `attributes` to labels. Attributes with an empty name or a name in `reserved` are skipped;
/// values of attributes whose sanitized names coincide are joined with `;` (in attribute name order).
fn attribute_labels(attributes: &Attributes, reserved: &[&str]) -> Vec<(String, String)> {
    let mut labels: Vec<(String, String)> = Vec::with_capacity(attributes.len());
    for (name, value) in attributes {
        let name = sanitize_label_name(name);
        if name.is_empty() || reserved.contains(&name.as_str()) {
            continue;
        }
        let value = escape_label_value(&value.to_string());
        if let Some((_, merged)) = labels.iter_mut().find(|(existing, _)| *existing == name) {
            merged.push(MERGED_VALUES_SEPARATOR);
            merged.push_str(&value);
        } else {
            labels.push((name, value));
        }
    }
    labels
}

fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

#[derive(Debug)]
struct FamilyInfo {
    name: String,
    help: String,
    unit: Option<String>,
}

impl FamilyInfo {
    fn new(metric: &MetricData) -> Result<Self, TranslationError> {
        let instrument = &metric.instrument;
        let mut name = sanitize_metric_name(&instrument.name)
            .ok_or_else(|| TranslationError::InvalidName(instrument.name.clone()))?;
        let unit = Some(sanitize(&instrument.unit, false)).filter(|unit| !unit.is_empty());

        if let Some(unit) = &unit {
            // The encoder appends the unit to the name on its own.
            if let Some(stripped) = name.strip_suffix(unit.as_str()) {
                if let Some(stripped) = stripped.strip_suffix('_').filter(|s| !s.is_empty()) {
                    name = stripped.to_owned();
                }
            }
        }
        Ok(Self {
            name,
            help: escape_help(&instrument.description),
            unit,
        })
    }
}

/// Snapshot visitor producing metric families.
#[derive(Debug)]
struct Translator {
    options: TranslationOptions,
    scope_labels: Vec<(String, String)>,
    current_family: Option<FamilyInfo>,
    families: Vec<MetricFamily>,
    family_indices: HashMap<String, usize>,
}

impl Translator {
    fn new(options: TranslationOptions) -> Self {
        Self {
            options,
            scope_labels: Vec::new(),
            current_family: None,
            families: Vec::new(),
            family_indices: HashMap::new(),
        }
    }

    fn push_sample(&mut self, sample: Sample) -> Result<(), TranslationError> {
        let Some(info) = &self.current_family else {
            return Ok(());
        };
        let metric_type = sample.value.family_type();
        let key = match &info.unit {
            Some(unit) => format!("{}_{unit}", info.name),
            None => info.name.clone(),
        };

        if let Some(&idx) = self.family_indices.get(&key) {
            let family = &mut self.families[idx];
            if family.metric_type != metric_type {
                return Err(TranslationError::ConflictingType {
                    name: key,
                    existing: family.metric_type,
                    new: metric_type,
                });
            }
            family.samples.push(sample);
        } else {
            self.family_indices.insert(key, self.families.len());
            self.families.push(MetricFamily {
                name: info.name.clone(),
                help: info.help.clone(),
                unit: info.unit.clone(),
                metric_type,
                samples: vec![sample],
            });
        }
        Ok(())
    }

    /// Scope labels and the histogram bucket label take precedence over point attributes.
    fn labels(&self, attributes: &Attributes, is_histogram: bool) -> Vec<(String, String)> {
        let mut reserved: Vec<&str> = self
            .scope_labels
            .iter()
            .map(|(name, _)| name.as_str())
            .collect();
        if is_histogram {
            reserved.push(BUCKET_LABEL);
        }
        let mut labels = attribute_labels(attributes, &reserved);
        labels.extend(self.scope_labels.iter().cloned());
        labels
    }

    fn target_info(resource: &Resource) -> Option<MetricFamily> {
        if resource.attributes().is_empty() {
            return None;
        }
        let labels = attribute_labels(resource.attributes(), &[]);
        Some(MetricFamily {
            name: TARGET_INFO_NAME.to_owned(),
            help: TARGET_INFO_HELP.to_owned(),
            unit: None,
            metric_type: FamilyType::Gauge,
            samples: vec![Sample {
                labels,
                value: SampleValue::Gauge(NumericValue::I64(1)),
            }],
        })
    }
}

impl SnapshotVisitor for Translator {
    type Error = TranslationError;

    fn visit_scope(&mut self, scope: &InstrumentationScope) -> Result<(), Self::Error> {
        self.scope_labels.clear();
        if self.options.scope_labels {
            self.scope_labels.push((
                SCOPE_NAME_LABEL.to_owned(),
                escape_label_value(&scope.name),
            ));
            if !scope.version.is_empty() {
                self.scope_labels.push((
                    SCOPE_VERSION_LABEL.to_owned(),
                    escape_label_value(&scope.version),
                ));
            }
        }
        Ok(())
    }

    fn visit_metric(&mut self, metric: &MetricData) -> Result<(), Self::Error> {
        self.current_family = Some(FamilyInfo::new(metric)?);
        Ok(())
    }

    fn visit_point(
        &mut self,
        metric: &MetricData,
        point: Point<'_>,
        attributes: &Attributes,
    ) -> Result<(), Self::Error> {
        let value = match point {
            Point::Sum(sum) if sum.is_monotonic => {
                let is_negative = match sum.value {
                    NumericValue::I64(value) => value < 0,
                    NumericValue::F64(value) => value < 0.0,
                };
                if is_negative {
                    return Err(TranslationError::NegativeCounter(
                        metric.instrument.name.clone(),
                    ));
                }
                SampleValue::Counter(sum.value)
            }
            Point::Sum(sum) => SampleValue::Gauge(sum.value),
            Point::LastValue(last_value) if last_value.is_valid => {
                SampleValue::Gauge(last_value.value)
            }
            Point::LastValue(_) => return Ok(()),
            Point::Histogram(histogram) => {
                let mut buckets: Vec<_> = histogram
                    .boundaries
                    .iter()
                    .copied()
                    .zip(histogram.counts.iter().copied())
                    .collect();
                let overflow_count = histogram.counts.last().copied().unwrap_or(0);
                buckets.push((f64::MAX, overflow_count));
                SampleValue::Histogram {
                    sum: histogram.sum.as_f64(),
                    count: histogram.count,
                    buckets,
                }
            }
        };

        let is_histogram = matches!(value, SampleValue::Histogram { .. });
        let sample = Sample {
            labels: self.labels(attributes, is_histogram),
            value,
        };
        self.push_sample(sample)
    }

    fn end_scope(&mut self, _scope: &InstrumentationScope) -> Result<(), Self::Error> {
        self.current_family = None;
        Ok(())
    }
}

/// Translates the `snapshot` into metric families.
///
/// Dropped points and invalid last values are skipped.
///
/// # Errors
///
/// Returns an error if a metric cannot be represented in the exposition format.
pub fn translate(
    snapshot: &ResourceMetrics,
    options: &TranslationOptions,
) -> Result<Vec<MetricFamily>, TranslationError> {
    let mut translator = Translator::new(*options);
    walk(snapshot, &mut translator)?;
    let mut families = translator.families;
    if options.target_info {
        families.extend(Translator::target_info(&snapshot.resource));
    }
    Ok(families)
}

#[derive(Debug)]
struct FamiliesCollector(Vec<MetricFamily>);

impl Collector for FamiliesCollector {
    fn encode(&self, mut encoder: DescriptorEncoder<'_>) -> fmt::Result {
        for family in &self.0 {
            let unit = family.unit.clone().map(Unit::Other);
            let mut metric_encoder = encoder.encode_descriptor(
                &family.name,
                &family.help,
                unit.as_ref(),
                family.metric_type.into(),
            )?;
            for sample in &family.samples {
                if sample.labels.is_empty() {
                    sample.value.encode(&mut metric_encoder)?;
                } else {
                    let mut family_encoder = metric_encoder.encode_family(&sample.labels)?;
                    sample.value.encode(&mut family_encoder)?;
                }
            }
        }
        Ok(())
    }
}

/// Encodes `families` to the `writer` in the specified text `format`.
///
/// # Errors
///
/// Proxies formatting errors of the provided `writer`.
pub fn encode_families<W: fmt::Write>(
    families: Vec<MetricFamily>,
    writer: &mut W,
    format: Format,
) -> fmt::Result {
    let mut registry = Registry::default();
    registry.register_collector(Box::new(FamiliesCollector(families)));

    match format {
        Format::OpenMetrics => text::encode(writer, &registry),
        Format::Prometheus | Format::OpenMetricsForPrometheus => {
            let remove_eof_terminator = matches!(format, Format::Prometheus);
            let mut wrapper = PrometheusWrapper::new(writer, remove_eof_terminator);
            text::encode(&mut wrapper, &registry)?;
            wrapper.flush()
        }
    }
}

/// Translates the `snapshot` and encodes it in the specified text `format`.
///
/// # Errors
///
/// Returns an error if translation fails; see [`translate()`].
pub fn render_exposition(
    snapshot: &ResourceMetrics,
    options: &TranslationOptions,
    format: Format,
) -> Result<String, TranslationError> {
    let families = translate(snapshot, options)?;
    let mut buffer = String::with_capacity(1_024);
    encode_families(families, &mut buffer, format)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use std::{
        sync::Arc,
        time::{Duration, SystemTime, UNIX_EPOCH},
    };

    use assert_matches::assert_matches;

    use super::*;
    use crate::data::{
        AggregationTemporality, HistogramPoint, InstrumentDescriptor, InstrumentKind,
        InstrumentValueType, LastValuePoint, PointData, PointDataAttributes, ScopeMetrics,
        SumPoint,
    };

    fn metric(
        name: &str,
        kind: InstrumentKind,
        unit: &str,
        points: Vec<PointDataAttributes>,
    ) -> MetricData {
        let timestamp = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        MetricData {
            instrument: InstrumentDescriptor::new(name, kind, InstrumentValueType::F64)
                .with_description(format!("Test {name}."))
                .with_unit(unit),
            aggregation_temporality: AggregationTemporality::Cumulative,
            start_ts: timestamp,
            end_ts: timestamp,
            points,
        }
    }

    fn labeled(point_data: PointData, method: &str) -> PointDataAttributes {
        PointDataAttributes::new(point_data, [("http.method".to_owned(), method.into())].into())
    }

    fn counter(value: NumericValue) -> PointData {
        PointData::Sum(SumPoint {
            value,
            is_monotonic: true,
        })
    }

    fn snapshot(metrics: Vec<MetricData>) -> ResourceMetrics {
        let resource = Resource::new([("service.name".to_owned(), "bmcweb".into())].into());
        ResourceMetrics {
            resource: Arc::new(resource),
            scope_metrics: vec![ScopeMetrics {
                scope: InstrumentationScope::new("my_metric").with_version("1.2.0"),
                metrics,
            }],
        }
    }

    fn lines(rendered: &str) -> Vec<&str> {
        rendered.lines().collect()
    }

    #[test]
    fn rendering_counters() {
        let snapshot = snapshot(vec![metric(
            "requests",
            InstrumentKind::Counter,
            "",
            vec![
                labeled(counter(NumericValue::I64(42)), "GET"),
                labeled(counter(NumericValue::F64(3.5)), "POST"),
            ],
        )]);
        let options = TranslationOptions::default();
        let rendered = render_exposition(&snapshot, &options, Format::Prometheus).unwrap();
        let lines = lines(&rendered);

        for expected_line in [
            "# HELP requests Test requests.",
            "# TYPE requests counter",
            r#"requests{http_method="GET",otel_scope_name="my_metric",otel_scope_version="1.2.0"} 42"#,
            r#"requests{http_method="POST",otel_scope_name="my_metric",otel_scope_version="1.2.0"} 3.5"#,
        ] {
            assert!(lines.contains(&expected_line), "{lines:#?}");
        }
        assert!(!lines.contains(&"# EOF"));
    }

    #[test]
    fn escaping_label_values() {
        let attributes = [("path".to_owned(), "a\"b\\c\nd".into())].into();
        let mut snapshot = snapshot(vec![metric(
            "requests",
            InstrumentKind::Counter,
            "",
            vec![PointDataAttributes::new(
                counter(NumericValue::I64(1)),
                attributes,
            )],
        )]);
        snapshot.resource = Arc::new(Resource::new(
            [("host.name".to_owned(), "bmc \"primary\"".into())].into(),
        ));
        let options = TranslationOptions {
            scope_labels: false,
            target_info: true,
        };
        let rendered = render_exposition(&snapshot, &options, Format::Prometheus).unwrap();
        let lines = lines(&rendered);

        assert!(
            lines.contains(&r#"requests{path="a\"b\\c\nd"} 1"#),
            "{lines:#?}"
        );
        assert!(
            lines.contains(&r#"target_info{host_name="bmc \"primary\""} 1"#),
            "{lines:#?}"
        );
        // Line breaks inside values must not split samples.
        assert!(
            lines.iter().all(|line| line.starts_with('#')
                || line.starts_with("requests{")
                || line.starts_with("target_info{")),
            "{lines:#?}"
        );
    }

    #[test]
    fn resolving_label_name_collisions() {
        let attributes = [
            ("a.b".to_owned(), "1".into()),
            ("a_b".to_owned(), "2".into()),
            ("otel_scope_name".to_owned(), "x".into()),
            (String::new(), "e".into()),
        ]
        .into();
        let snapshot = snapshot(vec![metric(
            "requests",
            InstrumentKind::Counter,
            "",
            vec![PointDataAttributes::new(
                counter(NumericValue::I64(1)),
                attributes,
            )],
        )]);
        let families = translate(&snapshot, &TranslationOptions::default()).unwrap();

        let expected_labels = [
            ("a_b", "1;2"),
            ("otel_scope_name", "my_metric"),
            ("otel_scope_version", "1.2.0"),
        ]
        .map(|(name, value)| (name.to_owned(), value.to_owned()));
        assert_eq!(families[0].samples[0].labels, expected_labels);

        let rendered =
            render_exposition(&snapshot, &TranslationOptions::default(), Format::Prometheus)
                .unwrap();
        assert!(
            rendered.contains(
                r#"requests{a_b="1;2",otel_scope_name="my_metric",otel_scope_version="1.2.0"} 1"#
            ),
            "{rendered}"
        );
    }

    #[test]
    fn bucket_label_is_reserved_for_histograms() {
        let attributes: Attributes = [
            ("le".to_owned(), "5".into()),
            ("path".to_owned(), "/redfish".into()),
        ]
        .into();
        let histogram = PointData::Histogram(HistogramPoint {
            count: 1,
            sum: NumericValue::F64(3.0),
            min_max: None,
            boundaries: vec![5.0],
            counts: vec![1, 0],
        });
        let snapshot = snapshot(vec![
            metric(
                "latency",
                InstrumentKind::Histogram,
                "",
                vec![PointDataAttributes::new(histogram, attributes.clone())],
            ),
            metric(
                "requests",
                InstrumentKind::Counter,
                "",
                vec![PointDataAttributes::new(
                    counter(NumericValue::I64(1)),
                    attributes,
                )],
            ),
        ]);
        let options = TranslationOptions {
            scope_labels: false,
            ..TranslationOptions::default()
        };
        let families = translate(&snapshot, &options).unwrap();

        let path_label = ("path".to_owned(), "/redfish".to_owned());
        assert_eq!(families[0].samples[0].labels, [path_label.clone()]);
        assert_eq!(
            families[1].samples[0].labels,
            [("le".to_owned(), "5".to_owned()), path_label]
        );
    }

    #[test]
    fn rendering_open_metrics() {
        let snapshot = snapshot(vec![metric(
            "requests",
            InstrumentKind::Counter,
            "",
            vec![labeled(counter(NumericValue::I64(1)), "GET")],
        )]);
        let options = TranslationOptions {
            scope_labels: false,
            ..TranslationOptions::default()
        };
        let rendered = render_exposition(&snapshot, &options, Format::OpenMetrics).unwrap();
        let lines = lines(&rendered);

        assert!(
            lines.contains(&r#"requests_total{http_method="GET"} 1"#),
            "{lines:#?}"
        );
        assert_eq!(*lines.last().unwrap(), "# EOF");
    }

    #[test]
    fn rendering_gauges() {
        let up_down = PointData::Sum(SumPoint {
            value: NumericValue::I64(-3),
            is_monotonic: false,
        });
        let last_value = PointData::LastValue(LastValuePoint {
            timestamp: SystemTime::now(),
            is_valid: true,
            value: NumericValue::F64(0.5),
        });
        let invalid_last_value = PointData::LastValue(LastValuePoint {
            timestamp: SystemTime::now(),
            is_valid: false,
            value: NumericValue::F64(100.0),
        });
        let snapshot = snapshot(vec![
            metric(
                "queue_depth",
                InstrumentKind::UpDownCounter,
                "",
                vec![labeled(up_down, "GET")],
            ),
            metric(
                "cpu_load",
                InstrumentKind::ObservableGauge,
                "",
                vec![
                    labeled(last_value, "GET"),
                    labeled(invalid_last_value, "POST"),
                ],
            ),
        ]);
        let options = TranslationOptions {
            scope_labels: false,
            ..TranslationOptions::default()
        };
        let rendered = render_exposition(&snapshot, &options, Format::Prometheus).unwrap();
        let lines = lines(&rendered);

        for expected_line in [
            "# TYPE queue_depth gauge",
            r#"queue_depth{http_method="GET"} -3"#,
            "# TYPE cpu_load gauge",
            r#"cpu_load{http_method="GET"} 0.5"#,
        ] {
            assert!(lines.contains(&expected_line), "{lines:#?}");
        }
        assert!(!rendered.contains("POST"), "{lines:#?}");
    }

    #[test]
    fn rendering_histograms() {
        let histogram = PointData::Histogram(HistogramPoint {
            count: 11,
            sum: NumericValue::F64(620.5),
            min_max: None,
            boundaries: vec![0.0, 50.0, 100.0],
            counts: vec![2, 5, 3, 1],
        });
        let snapshot = snapshot(vec![metric(
            "latency",
            InstrumentKind::Histogram,
            "ms",
            vec![PointDataAttributes::new(histogram, Attributes::new())],
        )]);
        let options = TranslationOptions {
            scope_labels: false,
            ..TranslationOptions::default()
        };
        let rendered = render_exposition(&snapshot, &options, Format::Prometheus).unwrap();
        let lines = lines(&rendered);

        for expected_line in [
            "# TYPE latency_ms histogram",
            "# UNIT latency_ms ms",
            "latency_ms_sum 620.5",
            "latency_ms_count 11",
            r#"latency_ms_bucket{le="0.0"} 2"#,
            r#"latency_ms_bucket{le="50.0"} 7"#,
            r#"latency_ms_bucket{le="100.0"} 10"#,
            r#"latency_ms_bucket{le="+Inf"} 11"#,
        ] {
            assert!(lines.contains(&expected_line), "{lines:#?}");
        }
    }

    #[test]
    fn translating_families_across_scopes() {
        let mut snapshot = snapshot(vec![metric(
            "requests",
            InstrumentKind::Counter,
            "",
            vec![labeled(counter(NumericValue::I64(1)), "GET")],
        )]);
        let mut other_scope = snapshot.scope_metrics[0].clone();
        other_scope.scope = InstrumentationScope::new("other");
        snapshot.scope_metrics.push(other_scope);

        let families = translate(&snapshot, &TranslationOptions::default()).unwrap();
        assert_eq!(families.len(), 1);
        let samples = &families[0].samples;
        assert_eq!(samples.len(), 2);
        assert!(samples[1]
            .labels
            .contains(&(SCOPE_NAME_LABEL.to_owned(), "other".to_owned())));
    }

    #[test]
    fn sanitizing_names() {
        let snapshot = snapshot(vec![metric(
            "my-metric.counter_total",
            InstrumentKind::Counter,
            "counter-unit",
            vec![labeled(counter(NumericValue::I64(1)), "GET")],
        )]);
        let families = translate(&snapshot, &TranslationOptions::default()).unwrap();
        assert_eq!(families[0].name, "my_metric_counter_total");
        assert_eq!(families[0].unit.as_deref(), Some("counter_unit"));
        assert_eq!(families[0].samples[0].labels[0].0, "http_method");

        assert_eq!(sanitize_metric_name("2xx"), Some("_2xx".to_owned()));
        assert_eq!(sanitize_metric_name("ns:requests"), Some("ns:requests".to_owned()));
        assert_eq!(sanitize_metric_name("..."), None);
        assert_eq!(sanitize_label_name("a:b"), "a_b");
    }

    #[test]
    fn unit_suffix_is_not_duplicated() {
        let snapshot = snapshot(vec![metric(
            "request_latency_ms",
            InstrumentKind::Histogram,
            "ms",
            vec![],
        )]);
        let mut translator = Translator::new(TranslationOptions::default());
        translator
            .visit_metric(&snapshot.scope_metrics[0].metrics[0])
            .unwrap();
        let info = translator.current_family.unwrap();
        assert_eq!(info.name, "request_latency");
        assert_eq!(info.unit.as_deref(), Some("ms"));
    }

    #[test]
    fn reporting_target_info() {
        let snapshot = snapshot(vec![]);
        let options = TranslationOptions {
            target_info: true,
            ..TranslationOptions::default()
        };
        let rendered = render_exposition(&snapshot, &options, Format::Prometheus).unwrap();
        let lines = lines(&rendered);

        assert!(lines.contains(&"# TYPE target_info gauge"), "{lines:#?}");
        assert!(
            lines.contains(&r#"target_info{service_name="bmcweb"} 1"#),
            "{lines:#?}"
        );
    }

    #[test]
    fn translation_errors() {
        let snapshot = snapshot(vec![metric(
            "???",
            InstrumentKind::Counter,
            "",
            vec![labeled(counter(NumericValue::I64(1)), "GET")],
        )]);
        let err = translate(&snapshot, &TranslationOptions::default()).unwrap_err();
        assert_matches!(err, TranslationError::InvalidName(name) if name == "???");

        let snapshot = self::snapshot(vec![metric(
            "requests",
            InstrumentKind::Counter,
            "",
            vec![labeled(counter(NumericValue::I64(-1)), "GET")],
        )]);
        let err = translate(&snapshot, &TranslationOptions::default()).unwrap_err();
        assert_matches!(err, TranslationError::NegativeCounter(name) if name == "requests");

        let gauge = PointData::Sum(SumPoint {
            value: NumericValue::I64(1),
            is_monotonic: false,
        });
        let snapshot = self::snapshot(vec![
            metric(
                "requests",
                InstrumentKind::Counter,
                "",
                vec![labeled(counter(NumericValue::I64(1)), "GET")],
            ),
            metric(
                "requests",
                InstrumentKind::UpDownCounter,
                "",
                vec![labeled(gauge, "GET")],
            ),
        ]);
        let err = translate(&snapshot, &TranslationOptions::default()).unwrap_err();
        assert_matches!(
            err,
            TranslationError::ConflictingType {
                existing: FamilyType::Counter,
                new: FamilyType::Gauge,
                ..
            }
        );
    }

    #[test]
    fn help_is_escaped() {
        assert_eq!(escape_help("line\nbreak \\"), "line\\nbreak \\\\");
    }
}

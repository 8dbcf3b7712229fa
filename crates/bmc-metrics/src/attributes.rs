//! Attribute values attached to resources and metric points.

use std::{collections::BTreeMap, fmt};

/// Ordered mapping of attribute names to values.
///
/// Ordering is by attribute name, so that rendering a set of attributes is deterministic.
pub type Attributes = BTreeMap<String, AttributeValue>;

/// Value of a single attribute.
///
/// Arrays are homogeneous: each array variant holds values of a single scalar type.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// String value.
    String(String),
    /// Boolean value.
    Bool(bool),
    /// Signed integer value.
    I64(i64),
    /// Floating-point value.
    F64(f64),
    /// Array of strings.
    StringArray(Vec<String>),
    /// Array of booleans.
    BoolArray(Vec<bool>),
    /// Array of signed integers.
    I64Array(Vec<i64>),
    /// Array of floating-point values.
    F64Array(Vec<f64>),
}

fn write_array<T: fmt::Display>(formatter: &mut fmt::Formatter<'_>, values: &[T]) -> fmt::Result {
    formatter.write_str("[")?;
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            formatter.write_str(",")?;
        }
        write!(formatter, "{value}")?;
    }
    formatter.write_str("]")
}

/// Scalars are formatted as is; arrays are formatted as `[v1,v2,...]`.
impl fmt::Display for AttributeValue {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(value) => formatter.write_str(value),
            Self::Bool(value) => write!(formatter, "{value}"),
            Self::I64(value) => write!(formatter, "{value}"),
            Self::F64(value) => write!(formatter, "{value}"),
            Self::StringArray(values) => write_array(formatter, values),
            Self::BoolArray(values) => write_array(formatter, values),
            Self::I64Array(values) => write_array(formatter, values),
            Self::F64Array(values) => write_array(formatter, values),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::I64(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::F64(value)
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(values: Vec<String>) -> Self {
        Self::StringArray(values)
    }
}

impl From<Vec<bool>> for AttributeValue {
    fn from(values: Vec<bool>) -> Self {
        Self::BoolArray(values)
    }
}

impl From<Vec<i64>> for AttributeValue {
    fn from(values: Vec<i64>) -> Self {
        Self::I64Array(values)
    }
}

impl From<Vec<f64>> for AttributeValue {
    fn from(values: Vec<f64>) -> Self {
        Self::F64Array(values)
    }
}

//! Entry metadata and metadata filters.
//!
//! Metadata is a closed set of scalar values keyed by string. Filters are
//! evaluated against it before ranking, so only admissible entries ever reach
//! the context packer.
//!
//! Comparison rules:
//! - integers and floats compare numerically with each other
//! - strings compare lexicographically (ISO-8601 timestamps sort correctly)
//! - booleans support equality only

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// A scalar metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

/// Metadata attached to an entry. Ordered so serialization is stable.
pub type Metadata = BTreeMap<String, MetadataValue>;

impl MetadataValue {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Equality across numeric representations (`1 == 1.0`).
    pub fn loosely_equals(&self, other: &MetadataValue) -> bool {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }

    /// Ordering for range filters. `None` when the values are not comparable.
    pub fn compare(&self, other: &MetadataValue) -> Option<Ordering> {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            _ => self.as_f64()?.partial_cmp(&other.as_f64()?),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl std::fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Inclusive/exclusive bounds for a range filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<MetadataValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gte: Option<MetadataValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<MetadataValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lte: Option<MetadataValue>,
}

impl FilterRange {
    fn contains(&self, value: &MetadataValue) -> bool {
        let check = |bound: &Option<MetadataValue>, ok: fn(Ordering) -> bool| match bound {
            None => true,
            Some(b) => value.compare(b).is_some_and(ok),
        };
        check(&self.gt, Ordering::is_gt)
            && check(&self.gte, Ordering::is_ge)
            && check(&self.lt, Ordering::is_lt)
            && check(&self.lte, Ordering::is_le)
    }
}

/// A condition on a single metadata key.
///
/// Deserializes from a bare scalar (equality) or from an object such as
/// `{"gte": 10, "lt": 20}` (range).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterCondition {
    Equals(MetadataValue),
    Range(FilterRange),
}

impl FilterCondition {
    pub fn matches(&self, value: &MetadataValue) -> bool {
        match self {
            Self::Equals(expected) => value.loosely_equals(expected),
            Self::Range(range) => range.contains(value),
        }
    }
}

/// Metadata filters: every key must be present and satisfy its condition.
pub type Filters = BTreeMap<String, FilterCondition>;

/// Whether `metadata` satisfies every condition in `filters`.
pub fn matches_filters(filters: &Filters, metadata: &Metadata) -> bool {
    filters.iter().all(|(key, condition)| {
        metadata
            .get(key)
            .is_some_and(|value| condition.matches(value))
    })
}

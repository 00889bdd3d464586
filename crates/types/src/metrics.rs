//! Metric and measurement types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Kind of a recorded metric
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    Counter,
    Gauge,
    Histogram,
    Summary,
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricType::Counter => write!(f, "counter"),
            MetricType::Gauge => write!(f, "gauge"),
            MetricType::Histogram => write!(f, "histogram"),
            MetricType::Summary => write!(f, "summary"),
        }
    }
}

/// Value of a metric dimension
///
/// Dimensions carry structured context alongside a metric (model name,
/// provider, token counts, ...). Known primitive kinds are modeled
/// explicitly; anything else goes through the opaque `Other` slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum DimensionValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Other(serde_json::Value),
}

impl From<bool> for DimensionValue {
    fn from(v: bool) -> Self {
        DimensionValue::Bool(v)
    }
}

impl From<i64> for DimensionValue {
    fn from(v: i64) -> Self {
        DimensionValue::Int(v)
    }
}

impl From<f64> for DimensionValue {
    fn from(v: f64) -> Self {
        DimensionValue::Float(v)
    }
}

impl From<&str> for DimensionValue {
    fn from(v: &str) -> Self {
        DimensionValue::String(v.to_string())
    }
}

impl From<String> for DimensionValue {
    fn from(v: String) -> Self {
        DimensionValue::String(v)
    }
}

/// A single timestamped measurement
///
/// Metrics are immutable once stored; processors may rewrite the value and
/// tags only on the ingestion path, before the metric reaches the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metric {
    /// Metric name
    pub name: String,
    /// Metric kind
    #[serde(rename = "type")]
    pub metric_type: MetricType,
    /// Measured value
    pub value: f64,
    /// Timestamp, stamped at ingestion
    pub timestamp: DateTime<Utc>,
    /// Tags/labels
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,
    /// Structured dimensions
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub dimensions: HashMap<String, DimensionValue>,
}

impl Metric {
    /// Create a new metric stamped with the current time
    pub fn new(name: impl Into<String>, metric_type: MetricType, value: f64) -> Self {
        Self {
            name: name.into(),
            metric_type,
            value,
            timestamp: Utc::now(),
            tags: HashMap::new(),
            dimensions: HashMap::new(),
        }
    }

    /// Add a tag
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Add a dimension
    pub fn with_dimension(
        mut self,
        key: impl Into<String>,
        value: impl Into<DimensionValue>,
    ) -> Self {
        self.dimensions.insert(key.into(), value.into());
        self
    }

    /// Override the ingestion timestamp
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_creation() {
        let metric = Metric::new("latency", MetricType::Gauge, 123.45)
            .with_tag("provider", "anthropic")
            .with_dimension("input_tokens", 512_i64);

        assert_eq!(metric.name, "latency");
        assert_eq!(metric.metric_type, MetricType::Gauge);
        assert_eq!(metric.value, 123.45);
        assert_eq!(metric.tags.get("provider").map(String::as_str), Some("anthropic"));
        assert_eq!(
            metric.dimensions.get("input_tokens"),
            Some(&DimensionValue::Int(512))
        );
    }

    #[test]
    fn test_metric_type_display() {
        assert_eq!(MetricType::Counter.to_string(), "counter");
        assert_eq!(MetricType::Summary.to_string(), "summary");
    }

    #[test]
    fn test_metric_type_serde() {
        let json = serde_json::to_string(&MetricType::Histogram).unwrap();
        assert_eq!(json, "\"histogram\"");

        let parsed: MetricType = serde_json::from_str("\"gauge\"").unwrap();
        assert_eq!(parsed, MetricType::Gauge);
    }

    #[test]
    fn test_dimension_value_from() {
        assert_eq!(DimensionValue::from(true), DimensionValue::Bool(true));
        assert_eq!(DimensionValue::from(42_i64), DimensionValue::Int(42));
        assert_eq!(DimensionValue::from(1.5_f64), DimensionValue::Float(1.5));
        assert_eq!(
            DimensionValue::from("gpt-4"),
            DimensionValue::String("gpt-4".to_string())
        );
    }

    #[test]
    fn test_metric_serialization_roundtrip() {
        let metric = Metric::new("error_rate", MetricType::Counter, 3.0)
            .with_tag("model", "claude-3-opus")
            .with_dimension("streaming", true);

        let json = serde_json::to_string(&metric).unwrap();
        let parsed: Metric = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.name, metric.name);
        assert_eq!(parsed.value, metric.value);
        assert_eq!(parsed.tags, metric.tags);
    }
}

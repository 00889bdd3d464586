//! Time series types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Ordered sequence of values for one metric name
///
/// `values[i]` corresponds to `timestamps[i]`; the two vectors always have
/// the same length.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeries {
    /// Metric name this series belongs to
    pub name: String,
    /// Ordered values
    pub values: Vec<f64>,
    /// Ordered timestamps, parallel to `values`
    pub timestamps: Vec<DateTime<Utc>>,
    /// Tags snapshot from the first metric seen for this series
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,
    /// Unit of measurement, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl TimeSeries {
    /// Create an empty series
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Vec::new(),
            timestamps: Vec::new(),
            tags: HashMap::new(),
            unit: None,
        }
    }

    /// Number of points in the series
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the series holds no points
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// View the series as (timestamp, value) data points
    pub fn data_points(&self) -> Vec<DataPoint> {
        self.timestamps
            .iter()
            .zip(self.values.iter())
            .map(|(&timestamp, &value)| DataPoint { timestamp, value })
            .collect()
    }
}

/// A single (timestamp, value) observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

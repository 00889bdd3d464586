//! In-memory metric storage
//!
//! Holds the append-only metric log and the per-name bounded series buffers.
//! Lock discipline lives in the engine; this module is plain data.

use chrono::{DateTime, Duration, Utc};
use llm_verifier_types::{Metric, MetricType, TimeSeries};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Bounded FIFO buffer backing one time series
///
/// Oldest points are evicted once the buffer reaches its capacity.
#[derive(Debug, Clone)]
pub struct SeriesBuffer {
    name: String,
    values: VecDeque<f64>,
    timestamps: VecDeque<DateTime<Utc>>,
    tags: HashMap<String, String>,
    capacity: usize,
}

impl SeriesBuffer {
    /// Create an empty buffer with the given capacity
    pub fn new(name: impl Into<String>, capacity: usize, tags: HashMap<String, String>) -> Self {
        Self {
            name: name.into(),
            values: VecDeque::with_capacity(capacity),
            timestamps: VecDeque::with_capacity(capacity),
            tags,
            capacity,
        }
    }

    /// Append a point, evicting the oldest one at capacity
    pub fn push(&mut self, value: f64, timestamp: DateTime<Utc>) {
        if self.values.len() >= self.capacity {
            self.values.pop_front();
            self.timestamps.pop_front();
        }
        self.values.push_back(value);
        self.timestamps.push_back(timestamp);
    }

    /// Number of stored points
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the buffer holds no points
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Timestamp of the oldest stored point
    pub fn oldest(&self) -> Option<DateTime<Utc>> {
        self.timestamps.front().copied()
    }

    /// Timestamp of the newest stored point
    pub fn newest(&self) -> Option<DateTime<Utc>> {
        self.timestamps.back().copied()
    }

    /// Stored values in insertion order
    pub fn values(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }

    /// Drop points with timestamps at or before the cutoff
    pub fn evict_before(&mut self, cutoff: DateTime<Utc>) {
        while let Some(&front) = self.timestamps.front() {
            if front > cutoff {
                break;
            }
            self.timestamps.pop_front();
            self.values.pop_front();
        }
    }

    /// Snapshot the buffer into an owned time series
    pub fn snapshot(&self) -> TimeSeries {
        TimeSeries {
            name: self.name.clone(),
            values: self.values.iter().copied().collect(),
            timestamps: self.timestamps.iter().copied().collect(),
            tags: self.tags.clone(),
            unit: None,
        }
    }
}

/// Per-series statistics in a metrics summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesStats {
    /// Number of stored points
    pub data_points: usize,
    /// Oldest stored timestamp
    pub oldest: DateTime<Utc>,
    /// Newest stored timestamp
    pub newest: DateTime<Utc>,
}

/// Snapshot of store-wide state, produced by `metrics_summary`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSummary {
    /// Total metrics in the flat log
    pub total_metrics: usize,
    /// Number of live time series
    pub time_series_count: usize,
    /// Number of registered processors
    pub processors_count: usize,
    /// Metric count per type
    pub type_distribution: HashMap<MetricType, usize>,
    /// Per-series statistics
    pub time_series_stats: HashMap<String, SeriesStats>,
    /// Metrics recorded in the trailing hour
    pub recent_metrics_hour: usize,
}

/// Append-only metric log plus per-name bounded series
#[derive(Debug)]
pub struct MetricStore {
    metrics: Vec<Metric>,
    series: HashMap<String, SeriesBuffer>,
    max_series_size: usize,
}

impl MetricStore {
    /// Create an empty store
    pub fn new(max_series_size: usize) -> Self {
        Self {
            metrics: Vec::new(),
            series: HashMap::new(),
            max_series_size,
        }
    }

    /// Append a metric to the log and its series, creating the series on
    /// first sight of the name
    pub fn append(&mut self, metric: Metric) {
        let buffer = self
            .series
            .entry(metric.name.clone())
            .or_insert_with(|| {
                SeriesBuffer::new(metric.name.clone(), self.max_series_size, metric.tags.clone())
            });
        buffer.push(metric.value, metric.timestamp);
        self.metrics.push(metric);
    }

    /// Metrics in the flat log, in insertion order
    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    /// Look up a series buffer by name
    pub fn series(&self, name: &str) -> Option<&SeriesBuffer> {
        self.series.get(name)
    }

    /// Number of live series
    pub fn series_count(&self) -> usize {
        self.series.len()
    }

    /// Remove log entries and series points at or before the cutoff; series
    /// left empty are dropped from the map entirely
    pub fn sweep(&mut self, cutoff: DateTime<Utc>) {
        self.metrics.retain(|m| m.timestamp > cutoff);

        self.series.retain(|_, buffer| {
            buffer.evict_before(cutoff);
            !buffer.is_empty()
        });
    }

    /// Produce a summary of the current store state
    pub fn summary(&self, now: DateTime<Utc>, processors_count: usize) -> MetricsSummary {
        let mut type_distribution: HashMap<MetricType, usize> = HashMap::new();
        for metric in &self.metrics {
            *type_distribution.entry(metric.metric_type).or_insert(0) += 1;
        }

        let time_series_stats = self
            .series
            .iter()
            .filter_map(|(name, buffer)| {
                let oldest = buffer.oldest()?;
                let newest = buffer.newest()?;
                Some((
                    name.clone(),
                    SeriesStats {
                        data_points: buffer.len(),
                        oldest,
                        newest,
                    },
                ))
            })
            .collect();

        let hour_ago = now - Duration::hours(1);
        let recent_metrics_hour = self
            .metrics
            .iter()
            .filter(|m| m.timestamp > hour_ago)
            .count();

        MetricsSummary {
            total_metrics: self.metrics.len(),
            time_series_count: self.series.len(),
            processors_count,
            type_distribution,
            time_series_stats,
            recent_metrics_hour,
        }
    }
}

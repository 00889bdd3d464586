//! Query and aggregation types
//!
//! Filtering, grouping, and scalar aggregation over the stored metric log.
//! The engine holds the read lock and hands this module plain slices.

use chrono::{DateTime, Utc};
use llm_verifier_types::{Metric, TimeSeries};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{AnalyticsError, Result};

/// Scalar reduction applied to each produced series
///
/// The percentile markers are accepted for API compatibility but fall back
/// to the last value in the series; percentile computation lives in the
/// processor pipeline, not the query layer.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    #[default]
    Sum,
    Avg,
    Min,
    Max,
    Count,
    P50,
    P90,
    P95,
    P99,
}

/// Inclusive time bounds for a query; `None` means unbounded
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct QueryTimeRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl QueryTimeRange {
    /// Whether a timestamp falls within the bounds
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        if self.from.is_some_and(|from| timestamp < from) {
            return false;
        }
        if self.to.is_some_and(|to| timestamp > to) {
            return false;
        }
        true
    }
}

/// A filter/aggregation request against the stored metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyticsQuery {
    /// Metric names to include; empty means all
    pub metric_names: Vec<String>,
    /// Exact-match tag filters; a metric missing any key is excluded
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,
    /// Time bounds
    #[serde(default)]
    pub time_range: QueryTimeRange,
    /// Scalar aggregation per series
    #[serde(default)]
    pub aggregation: Aggregation,
    /// Grouping fields: `name`, `type`, or a tag key
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group_by: Vec<String>,
}

/// Prediction details attached to `predict_metrics` results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionInfo {
    /// Requested prediction horizon in seconds
    pub horizon_secs: u64,
    /// Model used for the forecast
    pub model: String,
    /// Goodness of fit (R²) of the regression
    pub accuracy: f64,
}

/// Informational counters attached to every query result
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultMetadata {
    /// Metrics that survived filtering
    pub metric_count: usize,
    /// Series produced
    pub time_series_count: usize,
    /// Groups produced
    pub groups_count: usize,
    /// Configured retention period in seconds
    pub retention_period_secs: u64,
    /// Present only on prediction results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction: Option<PredictionInfo>,
}

/// Result of an analytics query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsResult {
    /// The query that produced this result
    pub query: AnalyticsQuery,
    /// Produced series (empty for grouped queries)
    pub time_series: Vec<TimeSeries>,
    /// Scalar aggregate per series name
    pub aggregated: HashMap<String, f64>,
    /// Grouped series, keyed by composite group key
    pub groups: HashMap<String, Vec<TimeSeries>>,
    /// Informational counters
    pub metadata: ResultMetadata,
    /// Wall-clock time spent executing the query
    pub execution_time: Duration,
}

/// Reject queries the execution path cannot handle
pub(crate) fn validate(query: &AnalyticsQuery) -> Result<()> {
    if !query.group_by.is_empty() && query.metric_names.is_empty() {
        return Err(AnalyticsError::Validation(
            "grouped queries require at least one metric name".to_string(),
        ));
    }
    Ok(())
}

/// Apply name, tag, and time filters to the metric log
pub(crate) fn filter_metrics<'a>(metrics: &'a [Metric], query: &AnalyticsQuery) -> Vec<&'a Metric> {
    metrics
        .iter()
        .filter(|metric| {
            if !query.metric_names.is_empty() && !query.metric_names.contains(&metric.name) {
                return false;
            }
            for (key, value) in &query.tags {
                if metric.tags.get(key) != Some(value) {
                    return false;
                }
            }
            query.time_range.contains(metric.timestamp)
        })
        .collect()
}

/// Group metrics by a composite key built from the requested fields
///
/// Each field contributes the metric name, the stringified type, or the tag
/// value (`"unknown"` when the tag is absent); parts are joined with `|`.
pub(crate) fn group_metrics<'a>(
    metrics: &[&'a Metric],
    group_by: &[String],
) -> HashMap<String, Vec<&'a Metric>> {
    let mut groups: HashMap<String, Vec<&Metric>> = HashMap::new();

    for metric in metrics {
        let key = group_by
            .iter()
            .map(|field| match field.as_str() {
                "name" => metric.name.clone(),
                "type" => metric.metric_type.to_string(),
                tag => metric
                    .tags
                    .get(tag)
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
            })
            .collect::<Vec<_>>()
            .join("|");

        groups.entry(key).or_default().push(metric);
    }

    groups
}

/// Convert filtered metrics into a series, tagging it from the first metric
pub(crate) fn metrics_to_series(metrics: &[&Metric], name: &str) -> TimeSeries {
    let mut series = TimeSeries::new(name);
    if let Some(first) = metrics.first() {
        series.tags = first.tags.clone();
    }
    for metric in metrics {
        series.values.push(metric.value);
        series.timestamps.push(metric.timestamp);
    }
    series
}

/// Reduce each series to a scalar according to the aggregation kind
pub(crate) fn aggregate_series(
    series_list: &[TimeSeries],
    aggregation: Aggregation,
) -> HashMap<String, f64> {
    let mut result = HashMap::new();

    for series in series_list {
        if series.values.is_empty() {
            continue;
        }

        let value = match aggregation {
            Aggregation::Sum => series.values.iter().sum(),
            Aggregation::Avg => series.values.iter().sum::<f64>() / series.values.len() as f64,
            Aggregation::Min => series.values.iter().copied().fold(f64::INFINITY, f64::min),
            Aggregation::Max => series
                .values
                .iter()
                .copied()
                .fold(f64::NEG_INFINITY, f64::max),
            Aggregation::Count => series.values.len() as f64,
            // Percentiles are not computed here; fall back to the most
            // recent value
            Aggregation::P50 | Aggregation::P90 | Aggregation::P95 | Aggregation::P99 => {
                *series.values.last().unwrap_or(&0.0)
            }
        };

        result.insert(series.name.clone(), value);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use llm_verifier_types::MetricType;

    fn gauge_at(name: &str, value: f64, timestamp: DateTime<Utc>) -> Metric {
        Metric::new(name, MetricType::Gauge, value).with_timestamp(timestamp)
    }

    #[test]
    fn test_validate_rejects_grouping_without_names() {
        let query = AnalyticsQuery {
            group_by: vec!["type".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            validate(&query),
            Err(AnalyticsError::Validation(_))
        ));
    }

    #[test]
    fn test_filter_by_name_membership() {
        let now = Utc::now();
        let metrics = vec![
            gauge_at("a", 1.0, now),
            gauge_at("b", 2.0, now),
            gauge_at("c", 3.0, now),
        ];
        let query = AnalyticsQuery {
            metric_names: vec!["a".to_string(), "c".to_string()],
            ..Default::default()
        };

        let filtered = filter_metrics(&metrics, &query);
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered[0].name, "a");
        assert_eq!(filtered[1].name, "c");
    }

    #[test]
    fn test_filter_missing_tag_key_excludes() {
        let now = Utc::now();
        let metrics = vec![
            gauge_at("a", 1.0, now).with_tag("provider", "anthropic"),
            gauge_at("a", 2.0, now),
        ];
        let mut tags = HashMap::new();
        tags.insert("provider".to_string(), "anthropic".to_string());
        let query = AnalyticsQuery {
            tags,
            ..Default::default()
        };

        let filtered = filter_metrics(&metrics, &query);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].value, 1.0);
    }

    #[test]
    fn test_time_bounds_are_inclusive() {
        let now = Utc::now();
        let range = QueryTimeRange {
            from: Some(now),
            to: Some(now + ChronoDuration::minutes(10)),
        };

        assert!(range.contains(now));
        assert!(range.contains(now + ChronoDuration::minutes(10)));
        assert!(!range.contains(now - ChronoDuration::seconds(1)));
        assert!(!range.contains(now + ChronoDuration::minutes(11)));
    }

    #[test]
    fn test_group_key_composition() {
        let now = Utc::now();
        let metrics = vec![
            gauge_at("latency", 1.0, now).with_tag("provider", "anthropic"),
            gauge_at("latency", 2.0, now).with_tag("provider", "openai"),
            gauge_at("latency", 3.0, now),
        ];
        let refs: Vec<&Metric> = metrics.iter().collect();

        let groups = group_metrics(
            &refs,
            &["name".to_string(), "provider".to_string()],
        );

        assert_eq!(groups.len(), 3);
        assert!(groups.contains_key("latency|anthropic"));
        assert!(groups.contains_key("latency|openai"));
        assert!(groups.contains_key("latency|unknown"));
    }

    #[test]
    fn test_group_by_type_field() {
        let now = Utc::now();
        let metrics = vec![
            Metric::new("a", MetricType::Counter, 1.0).with_timestamp(now),
            Metric::new("b", MetricType::Gauge, 2.0).with_timestamp(now),
        ];
        let refs: Vec<&Metric> = metrics.iter().collect();

        let groups = group_metrics(&refs, &["type".to_string()]);
        assert!(groups.contains_key("counter"));
        assert!(groups.contains_key("gauge"));
    }

    #[test]
    fn test_aggregations() {
        let series = TimeSeries {
            name: "x".to_string(),
            values: vec![1.0, 2.0, 3.0, 4.0],
            timestamps: vec![Utc::now(); 4],
            tags: HashMap::new(),
            unit: None,
        };
        let list = vec![series];

        assert_eq!(aggregate_series(&list, Aggregation::Sum)["x"], 10.0);
        assert_eq!(aggregate_series(&list, Aggregation::Avg)["x"], 2.5);
        assert_eq!(aggregate_series(&list, Aggregation::Min)["x"], 1.0);
        assert_eq!(aggregate_series(&list, Aggregation::Max)["x"], 4.0);
        assert_eq!(aggregate_series(&list, Aggregation::Count)["x"], 4.0);
    }

    #[test]
    fn test_percentile_marker_falls_back_to_last_value() {
        let series = TimeSeries {
            name: "x".to_string(),
            values: vec![5.0, 1.0, 9.0],
            timestamps: vec![Utc::now(); 3],
            tags: HashMap::new(),
            unit: None,
        };
        let list = vec![series];

        assert_eq!(aggregate_series(&list, Aggregation::P95)["x"], 9.0);
        assert_eq!(aggregate_series(&list, Aggregation::P50)["x"], 9.0);
    }

    #[test]
    fn test_empty_series_skipped_in_aggregation() {
        let list = vec![TimeSeries::new("empty")];
        assert!(aggregate_series(&list, Aggregation::Sum).is_empty());
    }

    #[test]
    fn test_series_tags_snapshot_from_first_metric() {
        let now = Utc::now();
        let metrics = vec![
            gauge_at("a", 1.0, now).with_tag("k", "v1"),
            gauge_at("a", 2.0, now).with_tag("k", "v2"),
        ];
        let refs: Vec<&Metric> = metrics.iter().collect();

        let series = metrics_to_series(&refs, "a");
        assert_eq!(series.tags.get("k").map(String::as_str), Some("v1"));
        assert_eq!(series.values, vec![1.0, 2.0]);
    }
}

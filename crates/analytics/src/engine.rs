//! The analytics engine
//!
//! Owns the metric store behind a single `RwLock` and runs every incoming
//! metric through the registered processor pipeline before storage. Queries
//! and summaries take the read lock; recording and cleanup take the write
//! lock.

use chrono::{Duration, Utc};
use llm_verifier_types::Metric;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::config::AnalyticsConfig;
use crate::error::{AnalyticsError, Result};
use crate::processors::{
    AlertHandler, AlertProcessor, AnomalyDetector, DefaultAlertHandler, DerivativeCalculator,
    MetricProcessor, MovingAverageCalculator, PercentileCalculator, RateCalculator,
};
use crate::query::{
    aggregate_series, filter_metrics, group_metrics, metrics_to_series, validate, AnalyticsQuery,
    AnalyticsResult, PredictionInfo, ResultMetadata,
};
use crate::store::{MetricStore, MetricsSummary};
use crate::trends::{linear_fit, PerformanceTrend, TrendAnalyzer, MIN_POINTS};

/// Streaming analytics over verification metrics
///
/// Metrics are transformed by the processor pipeline in registration order
/// and then appended to the in-memory store. The engine itself is
/// synchronous; callers drive `cleanup` on whatever cadence
/// [`AnalyticsConfig::flush_interval`] suggests.
pub struct AnalyticsEngine {
    config: AnalyticsConfig,
    store: RwLock<MetricStore>,
    processors: RwLock<Vec<Arc<dyn MetricProcessor>>>,
    analyzer: TrendAnalyzer,
}

impl AnalyticsEngine {
    /// Create an engine with an empty processor pipeline
    pub fn new(config: AnalyticsConfig) -> Result<Self> {
        config.validate()?;
        let store = MetricStore::new(config.max_time_series_size);
        Ok(Self {
            config,
            store: RwLock::new(store),
            processors: RwLock::new(Vec::new()),
            analyzer: TrendAnalyzer::new(),
        })
    }

    /// Create an engine with the standard pipeline: anomaly detection, rate
    /// calculation, percentiles, moving averages, derivatives, and threshold
    /// alerting feeding the given handler
    pub fn with_default_pipeline(
        config: AnalyticsConfig,
        alert_handler: Arc<dyn AlertHandler>,
    ) -> Result<Self> {
        let engine = Self::new(config)?;
        engine.add_processor(Arc::new(AnomalyDetector::new(3.0, 100)));
        engine.add_processor(Arc::new(RateCalculator::new()));
        engine.add_processor(Arc::new(PercentileCalculator::new(100)));
        engine.add_processor(Arc::new(MovingAverageCalculator::new()));
        engine.add_processor(Arc::new(DerivativeCalculator::new()));
        engine.add_processor(Arc::new(AlertProcessor::new(alert_handler)));
        Ok(engine)
    }

    /// As [`with_default_pipeline`](Self::with_default_pipeline) with the
    /// in-memory [`DefaultAlertHandler`]
    pub fn with_defaults(config: AnalyticsConfig) -> Result<Self> {
        Self::with_default_pipeline(config, Arc::new(DefaultAlertHandler::new()))
    }

    /// The active configuration
    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Append a processor to the end of the pipeline
    pub fn add_processor(&self, processor: Arc<dyn MetricProcessor>) {
        debug!(processor = processor.name(), "registering processor");
        self.processors.write().push(processor);
    }

    /// Number of registered processors
    pub fn processors_count(&self) -> usize {
        self.processors.read().len()
    }

    /// Run a metric through the pipeline and store the result
    ///
    /// The pipeline executes under the store's write lock, so concurrent
    /// writers observe processor state and storage order consistently.
    pub fn record_metric(&self, metric: Metric) {
        let processors = self.processors.read();
        let mut store = self.store.write();
        let processed = processors
            .iter()
            .fold(metric, |metric, processor| processor.process(metric));
        store.append(processed);
    }

    /// Record a batch of metrics in order
    pub fn record_metrics(&self, metrics: impl IntoIterator<Item = Metric>) {
        for metric in metrics {
            self.record_metric(metric);
        }
    }

    /// Execute a filter/group/aggregate query over the stored metrics
    pub fn query(&self, query: AnalyticsQuery) -> Result<AnalyticsResult> {
        let started = Instant::now();
        validate(&query)?;

        let store = self.store.read();
        let filtered = filter_metrics(store.metrics(), &query);
        let metric_count = filtered.len();

        let mut time_series = Vec::new();
        let mut groups = HashMap::new();

        if query.group_by.is_empty() {
            let names: Vec<String> = if query.metric_names.is_empty() {
                // Distinct names in first-seen order
                let mut seen = HashSet::new();
                let mut names = Vec::new();
                for metric in &filtered {
                    if seen.insert(metric.name.as_str()) {
                        names.push(metric.name.clone());
                    }
                }
                names
            } else {
                query.metric_names.clone()
            };

            for name in names {
                let subset: Vec<&Metric> = filtered
                    .iter()
                    .copied()
                    .filter(|m| m.name == name)
                    .collect();
                if !subset.is_empty() {
                    time_series.push(metrics_to_series(&subset, &name));
                }
            }
        } else {
            // Validation guarantees at least one requested name
            let label = &query.metric_names[0];
            for (key, members) in group_metrics(&filtered, &query.group_by) {
                groups.insert(key, vec![metrics_to_series(&members, label)]);
            }
        }
        drop(store);

        let aggregated = aggregate_series(&time_series, query.aggregation);

        let metadata = ResultMetadata {
            metric_count,
            time_series_count: time_series.len(),
            groups_count: groups.len(),
            retention_period_secs: self.config.retention_period_secs,
            prediction: None,
        };

        let execution_time = started.elapsed();
        debug!(
            metric_count,
            series = metadata.time_series_count,
            groups = metadata.groups_count,
            elapsed_us = execution_time.as_micros() as u64,
            "query executed"
        );

        Ok(AnalyticsResult {
            query,
            time_series,
            aggregated,
            groups,
            metadata,
            execution_time,
        })
    }

    /// Summarize the current store and pipeline state
    pub fn metrics_summary(&self) -> MetricsSummary {
        let processors_count = self.processors.read().len();
        self.store.read().summary(Utc::now(), processors_count)
    }

    /// Analyze the trend of one stored series
    pub fn trends(&self, metric_name: &str) -> Result<PerformanceTrend> {
        let snapshot = self
            .store
            .read()
            .series(metric_name)
            .map(|buffer| buffer.snapshot())
            .ok_or_else(|| AnalyticsError::NotFound(metric_name.to_string()))?;

        self.analyzer.analyze(metric_name, &snapshot.data_points())
    }

    /// Predict future values of one stored series by linear regression
    ///
    /// Produces one predicted point per whole hour of the horizon, as a
    /// series named `{metric_name}_predicted` tagged `type=prediction`.
    pub fn predict_metrics(&self, metric_name: &str, horizon: Duration) -> Result<AnalyticsResult> {
        let started = Instant::now();

        if !self.config.enable_predictions {
            return Err(AnalyticsError::Configuration(
                "predictions are disabled".to_string(),
            ));
        }

        let steps = horizon.num_hours();
        if steps < 1 {
            return Err(AnalyticsError::Validation(
                "prediction horizon must be at least one hour".to_string(),
            ));
        }

        let snapshot = self
            .store
            .read()
            .series(metric_name)
            .map(|buffer| buffer.snapshot())
            .ok_or_else(|| AnalyticsError::NotFound(metric_name.to_string()))?;

        if snapshot.len() < MIN_POINTS {
            return Err(AnalyticsError::InsufficientData {
                operation: "prediction".to_string(),
                required: MIN_POINTS,
                actual: snapshot.len(),
            });
        }

        let fit = linear_fit(&snapshot.values).ok_or(AnalyticsError::InsufficientData {
            operation: "prediction".to_string(),
            required: MIN_POINTS,
            actual: snapshot.len(),
        })?;

        let last_timestamp = snapshot
            .timestamps
            .last()
            .copied()
            .unwrap_or_else(Utc::now);

        let mut predicted = llm_verifier_types::TimeSeries::new(format!("{metric_name}_predicted"));
        predicted
            .tags
            .insert("type".to_string(), "prediction".to_string());
        for step in 1..=steps {
            let x = (snapshot.len() as i64 - 1 + step) as f64;
            predicted.values.push(fit.predict(x));
            predicted
                .timestamps
                .push(last_timestamp + Duration::hours(step));
        }

        let query = AnalyticsQuery {
            metric_names: vec![metric_name.to_string()],
            ..Default::default()
        };

        let metadata = ResultMetadata {
            metric_count: snapshot.len(),
            time_series_count: 1,
            groups_count: 0,
            retention_period_secs: self.config.retention_period_secs,
            prediction: Some(PredictionInfo {
                horizon_secs: horizon.num_seconds().max(0) as u64,
                model: "linear_regression".to_string(),
                accuracy: fit.r_squared,
            }),
        };

        let execution_time = started.elapsed();
        debug!(
            metric = metric_name,
            steps,
            accuracy = fit.r_squared,
            "prediction computed"
        );

        Ok(AnalyticsResult {
            query,
            time_series: vec![predicted],
            aggregated: HashMap::new(),
            groups: HashMap::new(),
            metadata,
            execution_time,
        })
    }

    /// Remove stored data older than the retention period and let processors
    /// drop their stale per-key state
    pub fn cleanup(&self) {
        let cutoff = Utc::now() - self.config.retention_period();

        let mut store = self.store.write();
        let before = store.metrics().len();
        store.sweep(cutoff);
        let removed = before - store.metrics().len();
        let series_remaining = store.series_count();
        drop(store);

        for processor in self.processors.read().iter() {
            processor.evict_stale(cutoff);
        }

        info!(removed, series_remaining, "cleanup completed");
    }
}

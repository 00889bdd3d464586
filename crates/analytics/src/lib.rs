//! Streaming analytics for LLM provider verification metrics
//!
//! An in-memory engine that ingests verification metrics (latency, accuracy,
//! throughput, error rates) through a pipeline of online processors, stores
//! them in bounded per-name time series, and answers filter/group/aggregate
//! queries plus trend analysis and linear forecasting.
//!
//! ```no_run
//! use analytics::{AnalyticsConfig, AnalyticsEngine, AnalyticsQuery};
//! use llm_verifier_types::{Metric, MetricType};
//!
//! # fn main() -> analytics::Result<()> {
//! let engine = AnalyticsEngine::with_defaults(AnalyticsConfig::default())?;
//!
//! engine.record_metric(
//!     Metric::new("verification_latency_ms", MetricType::Gauge, 142.0)
//!         .with_tag("provider", "anthropic"),
//! );
//!
//! let result = engine.query(AnalyticsQuery {
//!     metric_names: vec!["verification_latency_ms".to_string()],
//!     ..Default::default()
//! })?;
//! println!("{} series", result.time_series.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod processors;
pub mod query;
pub mod store;
pub mod trends;

pub use config::AnalyticsConfig;
pub use engine::AnalyticsEngine;
pub use error::{AnalyticsError, Result};
pub use processors::{
    Alert, AlertHandler, AlertProcessor, AnomalyDetector, DefaultAlertHandler,
    DerivativeCalculator, MetricProcessor, MovingAverageCalculator, PercentileCalculator,
    RateCalculator, ThresholdConfig,
};
pub use query::{
    Aggregation, AnalyticsQuery, AnalyticsResult, PredictionInfo, QueryTimeRange, ResultMetadata,
};
pub use store::{MetricsSummary, SeriesStats};
pub use trends::{
    classify_direction, linear_fit, Anomaly, AnomalySeverity, ForecastPoint, LinearFit,
    PerformanceTrend, TimeRange, TrendAnalyzer, TrendDirection,
};

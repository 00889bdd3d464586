//! Online metric processors
//!
//! Processors are stateful transforms applied to every metric on the
//! ingestion path, before storage. They run serially in registration order,
//! each consuming the previous one's output, which allows composition
//! (e.g. rate calculation feeding threshold alerting).
//!
//! Processors must be non-blocking and bounded in time and space by their
//! configured window sizes: the pipeline executes while the engine holds its
//! write lock, so a slow processor stalls all ingestion.

mod alert;
mod anomaly;
mod derivative;
mod moving_average;
mod percentile;
mod rate;

pub use alert::{Alert, AlertHandler, AlertProcessor, DefaultAlertHandler, ThresholdConfig};
pub use anomaly::AnomalyDetector;
pub use derivative::DerivativeCalculator;
pub use moving_average::MovingAverageCalculator;
pub use percentile::PercentileCalculator;
pub use rate::RateCalculator;

use chrono::{DateTime, Utc};
use llm_verifier_types::Metric;

/// A stateful, composable online transform applied to every metric
/// pre-storage
///
/// Implementations own their internal state behind their own lock and must
/// never panic; a processor that cannot compute its transform passes the
/// metric through unchanged.
pub trait MetricProcessor: Send + Sync {
    /// Transform a metric, possibly rewriting its value and tags
    fn process(&self, metric: Metric) -> Metric;

    /// Stable processor name
    fn name(&self) -> &str;

    /// Drop per-key internal state last touched at or before the cutoff
    ///
    /// Called by the engine's cleanup sweep so processor-local maps do not
    /// grow without bound alongside the retention-managed store.
    fn evict_stale(&self, _cutoff: DateTime<Utc>) {}
}

//! Rate-of-change computation between consecutive observations

use chrono::{DateTime, Utc};
use llm_verifier_types::Metric;
use parking_lot::Mutex;
use std::collections::HashMap;

use super::MetricProcessor;

#[derive(Clone, Copy)]
struct LastValue {
    value: f64,
    timestamp: DateTime<Utc>,
}

/// Replaces each metric's value with its derivative against the previous
/// observation of the same name
///
/// The first observation for a name only seeds the cache. The cache always
/// stores the raw incoming value, and is updated even when the time delta is
/// zero or negative (in which case the value passes through unchanged).
pub struct DerivativeCalculator {
    last_values: Mutex<HashMap<String, LastValue>>,
}

impl DerivativeCalculator {
    pub fn new() -> Self {
        Self {
            last_values: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for DerivativeCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricProcessor for DerivativeCalculator {
    fn process(&self, mut metric: Metric) -> Metric {
        let mut last_values = self.last_values.lock();
        let raw_value = metric.value;

        if let Some(last) = last_values.get(&metric.name) {
            let time_diff = (metric.timestamp - last.timestamp).num_milliseconds() as f64 / 1000.0;
            if time_diff > 0.0 {
                let derivative = (raw_value - last.value) / time_diff;

                metric
                    .tags
                    .insert("derivative".to_string(), format!("{:.6}", derivative));
                metric.tags.insert(
                    "time_diff_seconds".to_string(),
                    format!("{:.2}", time_diff),
                );
                metric.value = derivative;
            }
        }

        last_values.insert(
            metric.name.clone(),
            LastValue {
                value: raw_value,
                timestamp: metric.timestamp,
            },
        );

        metric
    }

    fn name(&self) -> &str {
        "derivative_calculator"
    }

    fn evict_stale(&self, cutoff: DateTime<Utc>) {
        self.last_values
            .lock()
            .retain(|_, last| last.timestamp > cutoff);
    }
}

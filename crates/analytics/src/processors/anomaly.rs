//! Z-score anomaly detection over a rolling window

use chrono::{DateTime, Utc};
use llm_verifier_types::Metric;
use parking_lot::Mutex;
use std::collections::VecDeque;

use super::MetricProcessor;

/// Flags metrics whose value deviates from the rolling mean by more than a
/// configured number of standard deviations
///
/// The rolling history is shared across all metric names flowing through the
/// pipeline, not partitioned per name. Mixed-magnitude metric streams will
/// therefore cross-contaminate the window; feed this processor a dedicated
/// pipeline per metric family if that matters.
pub struct AnomalyDetector {
    threshold: f64,
    window_size: usize,
    historical: Mutex<VecDeque<f64>>,
}

impl AnomalyDetector {
    /// Create a detector flagging values more than `threshold` standard
    /// deviations from the mean of the last `window_size` observations
    ///
    /// The window size is clamped to at least 1; an empty window would make
    /// the rolling statistics NaN and suppress every flag.
    pub fn new(threshold: f64, window_size: usize) -> Self {
        let window_size = window_size.max(1);
        Self {
            threshold,
            window_size,
            historical: Mutex::new(VecDeque::with_capacity(window_size)),
        }
    }

    /// Population mean and standard deviation of the window
    fn window_stats(window: &VecDeque<f64>) -> (f64, f64) {
        let n = window.len() as f64;
        let mean = window.iter().sum::<f64>() / n;
        let variance = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        (mean, variance.sqrt())
    }
}

impl MetricProcessor for AnomalyDetector {
    fn process(&self, mut metric: Metric) -> Metric {
        let mut historical = self.historical.lock();

        // Only judge once the window is fully warmed up
        if historical.len() >= self.window_size {
            let (mean, std_dev) = Self::window_stats(&historical);

            // With zero spread, any differing value is anomalous and an
            // equal value is not; avoids dividing by zero
            let z_score = if std_dev == 0.0 {
                if metric.value == mean {
                    0.0
                } else {
                    f64::INFINITY
                }
            } else {
                ((metric.value - mean) / std_dev).abs()
            };

            if z_score > self.threshold {
                metric.tags.insert("anomaly".to_string(), "true".to_string());
                metric
                    .tags
                    .insert("z_score".to_string(), format!("{:.2}", z_score));
            }
        }

        historical.push_back(metric.value);
        if historical.len() > self.window_size {
            historical.pop_front();
        }

        metric
    }

    fn name(&self) -> &str {
        "anomaly_detector"
    }

    fn evict_stale(&self, _cutoff: DateTime<Utc>) {
        // Single shared window, already bounded by window_size
    }
}

//! Rolling-window percentile tagging

use chrono::{DateTime, Utc};
use llm_verifier_types::Metric;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

use super::MetricProcessor;

const PERCENTILES: [(&str, f64); 4] = [("p50", 0.5), ("p90", 0.9), ("p95", 0.95), ("p99", 0.99)];

struct PercentileWindow {
    values: VecDeque<f64>,
    last_seen: DateTime<Utc>,
}

/// Tags each metric with p50/p90/p95/p99 over a bounded rolling window
///
/// Windows are keyed by metric name, or by the `percentile_window` tag when
/// present. Ranks use nearest-rank selection: `index = floor(p * len)`
/// clamped to `len - 1`. The metric value itself is never altered.
pub struct PercentileCalculator {
    window_size: usize,
    windows: Mutex<HashMap<String, PercentileWindow>>,
}

impl PercentileCalculator {
    /// Create a calculator with the given window size, clamped to at least 1
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size: window_size.max(1),
            windows: Mutex::new(HashMap::new()),
        }
    }
}

impl MetricProcessor for PercentileCalculator {
    fn process(&self, mut metric: Metric) -> Metric {
        let key = metric
            .tags
            .get("percentile_window")
            .cloned()
            .unwrap_or_else(|| metric.name.clone());

        let mut windows = self.windows.lock();
        let window = windows.entry(key).or_insert_with(|| PercentileWindow {
            values: VecDeque::with_capacity(self.window_size),
            last_seen: metric.timestamp,
        });

        window.last_seen = metric.timestamp;
        window.values.push_back(metric.value);
        if window.values.len() > self.window_size {
            window.values.pop_front();
        }

        let mut sorted: Vec<f64> = window.values.iter().copied().collect();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        if !sorted.is_empty() {
            for (tag, percentile) in PERCENTILES {
                let index = ((sorted.len() as f64 * percentile) as usize).min(sorted.len() - 1);
                metric
                    .tags
                    .insert(tag.to_string(), format!("{:.2}", sorted[index]));
            }
        }

        metric
    }

    fn name(&self) -> &str {
        "percentile_calculator"
    }

    fn evict_stale(&self, cutoff: DateTime<Utc>) {
        self.windows
            .lock()
            .retain(|_, window| window.last_seen > cutoff);
    }
}

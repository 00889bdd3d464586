//! Rolling arithmetic mean smoothing

use chrono::{DateTime, Utc};
use llm_verifier_types::Metric;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

use super::MetricProcessor;

const DEFAULT_WINDOW_SIZE: usize = 10;

struct AverageWindow {
    values: VecDeque<f64>,
    last_seen: DateTime<Utc>,
}

/// Replaces each metric's value with its rolling arithmetic mean
///
/// Windows are keyed by metric name, or by the `ma_window` tag when present.
/// The window size defaults to 10 and can be overridden per key with
/// [`set_window_size`](MovingAverageCalculator::set_window_size).
pub struct MovingAverageCalculator {
    windows: Mutex<HashMap<String, AverageWindow>>,
    window_sizes: Mutex<HashMap<String, usize>>,
}

impl MovingAverageCalculator {
    pub fn new() -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            window_sizes: Mutex::new(HashMap::new()),
        }
    }

    /// Override the window size for one key
    pub fn set_window_size(&self, key: impl Into<String>, size: usize) {
        self.window_sizes.lock().insert(key.into(), size.max(1));
    }
}

impl Default for MovingAverageCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricProcessor for MovingAverageCalculator {
    fn process(&self, mut metric: Metric) -> Metric {
        let key = metric
            .tags
            .get("ma_window")
            .cloned()
            .unwrap_or_else(|| metric.name.clone());

        let window_size = self
            .window_sizes
            .lock()
            .get(&key)
            .copied()
            .unwrap_or(DEFAULT_WINDOW_SIZE);

        let mut windows = self.windows.lock();
        let window = windows.entry(key).or_insert_with(|| AverageWindow {
            values: VecDeque::with_capacity(window_size),
            last_seen: metric.timestamp,
        });

        window.last_seen = metric.timestamp;
        window.values.push_back(metric.value);
        while window.values.len() > window_size {
            window.values.pop_front();
        }

        let avg = window.values.iter().sum::<f64>() / window.values.len() as f64;

        metric
            .tags
            .insert("moving_average".to_string(), format!("{:.2}", avg));
        metric.tags.insert(
            "ma_window_size".to_string(),
            window.values.len().to_string(),
        );
        metric.value = avg;

        metric
    }

    fn name(&self) -> &str {
        "moving_average_calculator"
    }

    fn evict_stale(&self, cutoff: DateTime<Utc>) {
        self.windows
            .lock()
            .retain(|_, window| window.last_seen > cutoff);
    }
}

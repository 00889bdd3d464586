//! Sliding-window event rate calculation

use chrono::{DateTime, Duration, Utc};
use llm_verifier_types::Metric;
use parking_lot::Mutex;
use std::collections::HashMap;

use super::MetricProcessor;

struct CounterData {
    total_count: u64,
    last_update: DateTime<Utc>,
    window: Vec<DateTime<Utc>>,
}

/// Rewrites each metric's value to its events-per-hour rate
///
/// Counters are keyed by metric name, or by the `counter` tag when present so
/// several metrics can share one counter. Each observation appends its
/// timestamp to a sliding one-hour window; the window length is the rate.
/// `total_count` is monotonic and never reset.
pub struct RateCalculator {
    counters: Mutex<HashMap<String, CounterData>>,
}

impl RateCalculator {
    pub fn new() -> Self {
        Self {
            counters: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for RateCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricProcessor for RateCalculator {
    fn process(&self, mut metric: Metric) -> Metric {
        let key = metric
            .tags
            .get("counter")
            .cloned()
            .unwrap_or_else(|| metric.name.clone());

        let mut counters = self.counters.lock();
        let counter = counters.entry(key).or_insert_with(|| CounterData {
            total_count: 0,
            last_update: metric.timestamp,
            window: Vec::new(),
        });

        counter.total_count += 1;
        counter.last_update = Utc::now();

        counter.window.push(metric.timestamp);
        let cutoff = metric.timestamp - Duration::hours(1);
        counter.window.retain(|ts| *ts > cutoff);

        let rate_per_hour = counter.window.len() as f64;
        metric.value = rate_per_hour;
        metric
            .tags
            .insert("rate_per_hour".to_string(), format!("{:.2}", rate_per_hour));
        metric
            .tags
            .insert("total_count".to_string(), counter.total_count.to_string());

        metric
    }

    fn name(&self) -> &str {
        "rate_calculator"
    }

    fn evict_stale(&self, cutoff: DateTime<Utc>) {
        self.counters
            .lock()
            .retain(|_, counter| counter.last_update > cutoff);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llm_verifier_types::MetricType;

    fn counter_at(name: &str, timestamp: DateTime<Utc>) -> Metric {
        Metric::new(name, MetricType::Counter, 1.0).with_timestamp(timestamp)
    }

    #[test]
    fn test_rate_counts_window_entries() {
        let calc = RateCalculator::new();
        let now = Utc::now();

        for i in 0..5 {
            let out = calc.process(counter_at("requests", now + Duration::seconds(i)));
            assert_eq!(out.value, (i + 1) as f64);
        }
    }

    #[test]
    fn test_old_entries_leave_window() {
        let calc = RateCalculator::new();
        let now = Utc::now();

        calc.process(counter_at("requests", now - Duration::minutes(90)));
        calc.process(counter_at("requests", now - Duration::minutes(80)));
        let out = calc.process(counter_at("requests", now));

        // The two old entries fell outside the 1-hour window
        assert_eq!(out.value, 1.0);
        assert_eq!(out.tags.get("total_count").map(String::as_str), Some("3"));
    }

    #[test]
    fn test_counter_tag_overrides_key() {
        let calc = RateCalculator::new();
        let now = Utc::now();

        calc.process(counter_at("a", now).with_tag("counter", "shared"));
        let out = calc.process(counter_at("b", now).with_tag("counter", "shared"));

        assert_eq!(out.value, 2.0);
    }

    #[test]
    fn test_total_count_is_monotonic() {
        let calc = RateCalculator::new();
        let now = Utc::now();

        calc.process(counter_at("requests", now - Duration::hours(3)));
        let out = calc.process(counter_at("requests", now));

        assert_eq!(out.tags.get("total_count").map(String::as_str), Some("2"));
    }

    #[test]
    fn test_evict_stale_drops_idle_counters() {
        let calc = RateCalculator::new();
        calc.process(counter_at("requests", Utc::now()));

        calc.evict_stale(Utc::now() + Duration::hours(1));
        assert!(calc.counters.lock().is_empty());
    }
}

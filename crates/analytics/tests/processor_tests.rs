//! Pipeline composition tests: processors applied in order on the ingestion
//! path, feeding each other's output

use analytics::{
    AlertProcessor, AnalyticsConfig, AnalyticsEngine, AnalyticsQuery, AnomalyDetector,
    DefaultAlertHandler, DerivativeCalculator, MovingAverageCalculator, RateCalculator,
    ThresholdConfig,
};
use chrono::{Duration, Utc};
use llm_verifier_types::{Metric, MetricType};
use std::sync::Arc;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[test]
fn rate_feeding_alerting_fires_on_computed_rate() {
    init_tracing();
    // The alert threshold is checked against the rate, not the raw value
    let handler = Arc::new(DefaultAlertHandler::new());
    let engine = AnalyticsEngine::new(AnalyticsConfig::default()).unwrap();

    engine.add_processor(Arc::new(RateCalculator::new()));
    let alerts = AlertProcessor::new(handler.clone());
    alerts.set_threshold(
        "requests",
        ThresholdConfig {
            max: Some(3.0),
            enabled: true,
            ..Default::default()
        },
    );
    engine.add_processor(Arc::new(alerts));

    let now = Utc::now();
    for i in 0..5 {
        engine.record_metric(
            Metric::new("requests", MetricType::Counter, 1.0)
                .with_timestamp(now + Duration::seconds(i)),
        );
    }

    // Rates 1..=5; the 4th and 5th exceed the threshold
    let fired = handler.alerts();
    assert_eq!(fired.len(), 2);
    assert_eq!(fired[0].metric.value, 4.0);
    assert_eq!(fired[1].metric.value, 5.0);
}

#[test]
fn moving_average_smooths_before_anomaly_detection() {
    let engine = AnalyticsEngine::new(AnalyticsConfig::default()).unwrap();
    engine.add_processor(Arc::new(MovingAverageCalculator::new()));
    engine.add_processor(Arc::new(AnomalyDetector::new(2.0, 5)));

    for v in [100.0, 102.0, 98.0, 101.0, 99.0, 100.0, 101.5, 98.5, 100.2, 99.8] {
        engine.record_metric(Metric::new("latency", MetricType::Gauge, v));
    }
    // A raw spike is heavily damped by the 10-point average before the
    // detector sees it
    engine.record_metric(Metric::new("latency", MetricType::Gauge, 130.0));

    let result = engine
        .query(AnalyticsQuery {
            metric_names: vec!["latency".to_string()],
            ..Default::default()
        })
        .unwrap();

    let series = &result.time_series[0];
    let last = series.values[series.len() - 1];
    assert!(last < 110.0, "smoothed value was {last}");
}

#[test]
fn derivative_feeding_alerting_catches_rate_of_change() {
    let handler = Arc::new(DefaultAlertHandler::new());
    let engine = AnalyticsEngine::new(AnalyticsConfig::default()).unwrap();

    engine.add_processor(Arc::new(DerivativeCalculator::new()));
    let alerts = AlertProcessor::new(handler.clone());
    alerts.set_threshold(
        "queue_depth",
        ThresholdConfig {
            max: Some(10.0), // alert when growing faster than 10/s
            enabled: true,
            ..Default::default()
        },
    );
    engine.add_processor(Arc::new(alerts));

    let now = Utc::now();
    engine.record_metric(
        Metric::new("queue_depth", MetricType::Gauge, 100.0).with_timestamp(now),
    );
    engine.record_metric(
        Metric::new("queue_depth", MetricType::Gauge, 105.0)
            .with_timestamp(now + Duration::seconds(1)),
    );
    assert!(handler.alerts().is_empty());

    engine.record_metric(
        Metric::new("queue_depth", MetricType::Gauge, 205.0)
            .with_timestamp(now + Duration::seconds(2)),
    );
    let fired = handler.alerts();
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].metric.value, 100.0); // (205 - 105) / 1s
}

#[test]
fn stored_metrics_carry_pipeline_tags() {
    let engine = AnalyticsEngine::with_defaults(AnalyticsConfig::default()).unwrap();

    for v in [10.0, 12.0, 11.0] {
        engine.record_metric(Metric::new("latency", MetricType::Gauge, v));
    }

    let result = engine
        .query(AnalyticsQuery {
            metric_names: vec!["latency".to_string()],
            ..Default::default()
        })
        .unwrap();

    // Series tags snapshot the first processed metric
    let tags = &result.time_series[0].tags;
    assert!(tags.contains_key("p50"));
    assert!(tags.contains_key("rate_per_hour"));
    assert!(tags.contains_key("moving_average"));
}

#[test]
fn cleanup_evicts_idle_processor_state() {
    let engine = AnalyticsEngine::new(AnalyticsConfig {
        retention_period_secs: 3_600,
        ..Default::default()
    })
    .unwrap();
    engine.add_processor(Arc::new(DerivativeCalculator::new()));

    let stale = Utc::now() - Duration::hours(3);
    engine.record_metric(Metric::new("old", MetricType::Gauge, 1.0).with_timestamp(stale));
    engine.cleanup();

    // The derivative cache lost the stale entry, so the next observation
    // seeds rather than differentiates
    let out_ts = Utc::now();
    engine.record_metric(Metric::new("old", MetricType::Gauge, 500.0).with_timestamp(out_ts));

    let result = engine
        .query(AnalyticsQuery {
            metric_names: vec!["old".to_string()],
            ..Default::default()
        })
        .unwrap();
    assert_eq!(result.time_series[0].values, vec![500.0]);
    assert!(!result.time_series[0].tags.contains_key("derivative"));
}

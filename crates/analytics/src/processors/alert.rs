//! Threshold alerting

use chrono::{DateTime, Utc};
use llm_verifier_types::Metric;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use super::MetricProcessor;

/// Per-metric alerting thresholds
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThresholdConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    pub enabled: bool,
}

/// A recorded threshold violation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// Snapshot of the offending metric
    pub metric: Metric,
    /// Threshold it violated
    pub threshold: ThresholdConfig,
    /// Human-readable violation description
    pub violation: String,
    /// When the alert fired
    pub timestamp: DateTime<Utc>,
}

/// Receives threshold violations from the [`AlertProcessor`]
pub trait AlertHandler: Send + Sync {
    fn handle_alert(&self, metric: &Metric, threshold: &ThresholdConfig, violation: &str);
}

/// Tags and reports metrics that violate configured thresholds
///
/// The minimum bound is checked before the maximum and only the first
/// violation found is reported.
pub struct AlertProcessor {
    thresholds: RwLock<HashMap<String, ThresholdConfig>>,
    handler: Arc<dyn AlertHandler>,
}

impl AlertProcessor {
    pub fn new(handler: Arc<dyn AlertHandler>) -> Self {
        Self {
            thresholds: RwLock::new(HashMap::new()),
            handler,
        }
    }

    /// Set (or overwrite) the threshold for a metric name
    pub fn set_threshold(&self, metric_name: impl Into<String>, config: ThresholdConfig) {
        self.thresholds.write().insert(metric_name.into(), config);
    }
}

impl MetricProcessor for AlertProcessor {
    fn process(&self, mut metric: Metric) -> Metric {
        let thresholds = self.thresholds.read();
        let Some(config) = thresholds.get(&metric.name) else {
            return metric;
        };
        if !config.enabled {
            return metric;
        }

        let violation = match (config.min, config.max) {
            (Some(min), _) if metric.value < min => Some(format!("below minimum {:.2}", min)),
            (_, Some(max)) if metric.value > max => Some(format!("above maximum {:.2}", max)),
            _ => None,
        };

        if let Some(violation) = violation {
            self.handler.handle_alert(&metric, config, &violation);
            metric.tags.insert("alert".to_string(), "true".to_string());
            metric
                .tags
                .insert("alert_violation".to_string(), violation);
        }

        metric
    }

    fn name(&self) -> &str {
        "alert_processor"
    }
}

/// Default handler keeping an in-memory, append-only alert log
pub struct DefaultAlertHandler {
    alerts: Mutex<Vec<Alert>>,
}

impl DefaultAlertHandler {
    pub fn new() -> Self {
        Self {
            alerts: Mutex::new(Vec::new()),
        }
    }

    /// Defensive copy of all recorded alerts
    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().clone()
    }

    /// Discard all recorded alerts
    pub fn clear_alerts(&self) {
        self.alerts.lock().clear();
    }
}

impl Default for DefaultAlertHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertHandler for DefaultAlertHandler {
    fn handle_alert(&self, metric: &Metric, threshold: &ThresholdConfig, violation: &str) {
        warn!(
            metric = %metric.name,
            value = metric.value,
            violation,
            "metric threshold violated"
        );

        self.alerts.lock().push(Alert {
            metric: metric.clone(),
            threshold: threshold.clone(),
            violation: violation.to_string(),
            timestamp: Utc::now(),
        });
    }
}

//! Trend analysis and forecasting
//!
//! Closed-form least-squares regression over a series, trend direction
//! classification, rolling-window anomaly detection, and linear
//! extrapolation with decaying confidence. The regression here is also what
//! backs the engine's `predict_metrics`.

use chrono::{DateTime, Duration, Utc};
use llm_verifier_types::DataPoint;
use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, Result};

/// Slope magnitude below which a series is classified as stable
const SLOPE_DEAD_BAND: f64 = 0.01;

/// Points preceding each observation used for anomaly statistics
const ANOMALY_WINDOW: usize = 10;

/// Minimum points required for anomaly detection and prediction
pub const MIN_POINTS: usize = 10;

/// Least-squares fit of a series against its indices 0..N-1
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LinearFit {
    /// Slope of the fitted line
    pub slope: f64,
    /// Intercept of the fitted line
    pub intercept: f64,
    /// Coefficient of determination, clamped to [0, 1]
    pub r_squared: f64,
}

impl LinearFit {
    /// Predicted value at index `x`
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Fit `values[i] = slope * i + intercept` by least squares
///
/// Returns `None` for fewer than two values.
pub fn linear_fit(values: &[f64]) -> Option<LinearFit> {
    if values.len() < 2 {
        return None;
    }

    let n = values.len() as f64;
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut sum_xy = 0.0;
    let mut sum_x2 = 0.0;

    for (i, &value) in values.iter().enumerate() {
        let x = i as f64;
        sum_x += x;
        sum_y += value;
        sum_xy += x * value;
        sum_x2 += x * x;
    }

    let slope = (n * sum_xy - sum_x * sum_y) / (n * sum_x2 - sum_x * sum_x);
    let intercept = (sum_y - slope * sum_x) / n;

    let mean_y = sum_y / n;
    let mut ss_tot = 0.0;
    let mut ss_res = 0.0;
    for (i, &value) in values.iter().enumerate() {
        let predicted = slope * i as f64 + intercept;
        ss_tot += (value - mean_y).powi(2);
        ss_res += (value - predicted).powi(2);
    }

    // A constant series is a perfect fit to a flat line
    let r_squared = if ss_tot == 0.0 {
        1.0
    } else {
        (1.0 - ss_res / ss_tot).max(0.0)
    };

    Some(LinearFit {
        slope,
        intercept,
        r_squared,
    })
}

/// Direction of a series over its analyzed range
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
    /// Series too short to classify
    Unpredictable,
}

/// Severity of a detected anomaly
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AnomalySeverity {
    Medium,
    High,
}

/// A point deviating significantly from its local rolling statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Anomaly {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    /// Rolling mean of the preceding window
    pub expected_value: f64,
    pub severity: AnomalySeverity,
    pub description: String,
}

/// A forecast value with decaying confidence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    /// Decays linearly from 1.0 toward 0.5 across the forecast horizon
    pub confidence: f64,
}

/// Analyzed time span of a trend
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Full trend analysis of one metric's series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceTrend {
    pub metric_name: String,
    pub time_range: TimeRange,
    pub direction: TrendDirection,
    pub slope: f64,
    /// Absolute Pearson correlation between index and value
    pub confidence: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub anomalies: Vec<Anomaly>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub forecast: Vec<ForecastPoint>,
}

/// Stateless trend/forecast analyzer over externally supplied series
#[derive(Debug, Clone, Default)]
pub struct TrendAnalyzer;

impl TrendAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Analyze a series: direction, confidence, anomalies, and a ten-point
    /// forecast
    ///
    /// Requires at least two points. Anomaly detection only kicks in once
    /// the series reaches [`MIN_POINTS`]; shorter series yield an empty
    /// anomaly list rather than an error here.
    pub fn analyze(
        &self,
        metric_name: impl Into<String>,
        points: &[DataPoint],
    ) -> Result<PerformanceTrend> {
        if points.len() < 2 {
            return Err(AnalyticsError::InsufficientData {
                operation: "trend analysis".to_string(),
                required: 2,
                actual: points.len(),
            });
        }

        let values: Vec<f64> = points.iter().map(|p| p.value).collect();
        // Guarded above, fit always succeeds with two or more points
        let fit = linear_fit(&values).ok_or(AnalyticsError::InsufficientData {
            operation: "trend analysis".to_string(),
            required: 2,
            actual: points.len(),
        })?;

        let anomalies = if points.len() >= MIN_POINTS {
            self.detect_anomalies(points)?
        } else {
            Vec::new()
        };

        Ok(PerformanceTrend {
            metric_name: metric_name.into(),
            time_range: TimeRange {
                start: points[0].timestamp,
                end: points[points.len() - 1].timestamp,
            },
            direction: classify_direction(fit.slope),
            slope: fit.slope,
            confidence: fit.r_squared.sqrt(),
            anomalies,
            forecast: self.forecast(points, 10),
        })
    }

    /// Find points deviating from the rolling statistics of the preceding
    /// window
    ///
    /// Deviations beyond two standard deviations are medium severity, beyond
    /// three are high.
    pub fn detect_anomalies(&self, points: &[DataPoint]) -> Result<Vec<Anomaly>> {
        if points.len() < MIN_POINTS {
            return Err(AnalyticsError::InsufficientData {
                operation: "anomaly detection".to_string(),
                required: MIN_POINTS,
                actual: points.len(),
            });
        }

        let mut anomalies = Vec::new();

        for i in ANOMALY_WINDOW..points.len() {
            let window = &points[i - ANOMALY_WINDOW..i];
            let n = window.len() as f64;
            let mean = window.iter().map(|p| p.value).sum::<f64>() / n;
            let variance = window.iter().map(|p| (p.value - mean).powi(2)).sum::<f64>() / n;
            let std_dev = variance.sqrt();

            let deviation = (points[i].value - mean).abs();
            let severity = if deviation > 3.0 * std_dev {
                Some(AnomalySeverity::High)
            } else if deviation > 2.0 * std_dev {
                Some(AnomalySeverity::Medium)
            } else {
                None
            };

            if let Some(severity) = severity {
                anomalies.push(Anomaly {
                    timestamp: points[i].timestamp,
                    value: points[i].value,
                    expected_value: mean,
                    severity,
                    description: format!(
                        "value {:.2} deviates {:.2} from rolling mean {:.2}",
                        points[i].value, deviation, mean
                    ),
                });
            }
        }

        Ok(anomalies)
    }

    /// Extrapolate the fitted line `num_points` steps past the series
    ///
    /// Step size is the gap between the first two timestamps, defaulting to
    /// one hour; confidence decays linearly from 1.0 toward 0.5.
    pub fn forecast(&self, points: &[DataPoint], num_points: usize) -> Vec<ForecastPoint> {
        let values: Vec<f64> = points.iter().map(|p| p.value).collect();
        let Some(fit) = linear_fit(&values) else {
            return Vec::new();
        };
        if num_points == 0 {
            return Vec::new();
        }

        let granularity = if points.len() >= 2 {
            points[1].timestamp - points[0].timestamp
        } else {
            Duration::hours(1)
        };
        let last_timestamp = points[points.len() - 1].timestamp;

        (1..=num_points)
            .map(|step| {
                let x = (points.len() + step - 1) as f64;
                ForecastPoint {
                    timestamp: last_timestamp + granularity * step as i32,
                    value: fit.predict(x),
                    confidence: 1.0 - 0.5 * step as f64 / num_points as f64,
                }
            })
            .collect()
    }
}

/// Classify a slope against the stability dead-band
pub fn classify_direction(slope: f64) -> TrendDirection {
    if slope.abs() < SLOPE_DEAD_BAND {
        TrendDirection::Stable
    } else if slope > 0.0 {
        TrendDirection::Increasing
    } else {
        TrendDirection::Decreasing
    }
}

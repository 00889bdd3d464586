//! Configuration for the analytics engine

use chrono::Duration;
use figment::{
    providers::{Env, Format, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{AnalyticsError, Result};

/// Analytics engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Maximum age of stored data in seconds; older entries are removed by
    /// `cleanup`
    pub retention_period_secs: u64,

    /// Maximum number of points kept per time series (FIFO eviction)
    pub max_time_series_size: usize,

    /// Suggested batch size for external producers
    pub batch_size: usize,

    /// Suggested cleanup/flush cadence in seconds for the external scheduler
    pub flush_interval_secs: u64,

    /// Whether `predict_metrics` is available
    pub enable_predictions: bool,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            retention_period_secs: 86_400, // 24 hours
            max_time_series_size: 1_000,
            batch_size: 100,
            flush_interval_secs: 60,
            enable_predictions: false,
        }
    }
}

impl AnalyticsConfig {
    /// Load configuration from an optional YAML file with `ANALYTICS_`
    /// environment variable overrides
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let mut figment = Figment::from(figment::providers::Serialized::defaults(
            AnalyticsConfig::default(),
        ));

        if let Some(path) = config_path {
            figment = figment.merge(Yaml::file(path));
        }

        figment = figment.merge(Env::prefixed("ANALYTICS_"));

        let config: AnalyticsConfig = figment
            .extract()
            .map_err(|e| AnalyticsError::Configuration(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.retention_period_secs == 0 {
            return Err(AnalyticsError::Validation(
                "retention_period_secs must be greater than 0".to_string(),
            ));
        }
        if self.max_time_series_size == 0 {
            return Err(AnalyticsError::Validation(
                "max_time_series_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Retention period as a chrono duration
    pub fn retention_period(&self) -> Duration {
        Duration::seconds(self.retention_period_secs as i64)
    }

    /// Flush interval as a chrono duration
    pub fn flush_interval(&self) -> Duration {
        Duration::seconds(self.flush_interval_secs as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AnalyticsConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.retention_period(), Duration::hours(24));
        assert!(!config.enable_predictions);
    }

    #[test]
    fn test_zero_retention_rejected() {
        let config = AnalyticsConfig {
            retention_period_secs: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(AnalyticsError::Validation(_))
        ));
    }

    #[test]
    fn test_zero_series_size_rejected() {
        let config = AnalyticsConfig {
            max_time_series_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = AnalyticsConfig::load(None).unwrap();
        assert_eq!(config.max_time_series_size, 1_000);
        assert_eq!(config.batch_size, 100);
    }
}

//! Error types for the analytics engine

use thiserror::Error;

/// Main error type for analytics operations
#[derive(Error, Debug)]
pub enum AnalyticsError {
    /// Operation requires a configuration flag that is not enabled
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Referenced series or metric does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Not enough data points for the requested computation
    #[error("insufficient data for {operation}: need at least {required} data points, have {actual}")]
    InsufficientData {
        operation: String,
        required: usize,
        actual: usize,
    },

    /// Malformed query
    #[error("validation error: {0}")]
    Validation(String),
}

/// Result type alias for analytics operations
pub type Result<T> = std::result::Result<T, AnalyticsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_data_display() {
        let err = AnalyticsError::InsufficientData {
            operation: "prediction".to_string(),
            required: 10,
            actual: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("prediction"));
        assert!(msg.contains("10"));
        assert!(msg.contains("3"));
    }

    #[test]
    fn test_not_found_display() {
        let err = AnalyticsError::NotFound("time series: latency".to_string());
        assert!(err.to_string().contains("latency"));
    }
}

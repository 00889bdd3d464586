//! Core types and data models for the LLM verifier analytics engine
//!
//! This crate provides the fundamental data structures shared between the
//! analytics engine and the subsystems that feed metrics into it.

pub mod metrics;
pub mod series;

pub use metrics::{DimensionValue, Metric, MetricType};
pub use series::{DataPoint, TimeSeries};

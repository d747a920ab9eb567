//! # Design
//!
//! - Constant error messages; context lives in fields.
//! - Settings violations are collected so callers can report every bad field at once.

use antmon_sensors::SensorError;
use serde::Serialize;
use thiserror::Error;

/// Result alias for collector operations.
pub type CollectorResult<T> = Result<T, CollectorError>;

/// One rejected settings field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingsViolation {
    /// Field name as it appears in the settings document.
    pub field: &'static str,
    /// Reason the value was rejected.
    pub message: String,
}

/// Errors raised by the metrics collector.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// `start` was called while a session is active.
    #[error("metrics collection already running")]
    AlreadyRunning,
    /// The sensor node failed.
    #[error("sensor node operation failed")]
    Node {
        /// Operation identifier.
        operation: &'static str,
        /// Source sensor error.
        source: SensorError,
    },
    /// Settings failed validation.
    #[error("invalid metrics settings")]
    InvalidSettings {
        /// Every rejected field.
        violations: Vec<SettingsViolation>,
    },
    /// The frame processing task ended abnormally.
    #[error("collector task failed")]
    Task {
        /// Join failure detail.
        detail: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn node_errors_keep_their_source() {
        let err = CollectorError::Node {
            operation: "node.start",
            source: SensorError::AlreadyStarted,
        };
        assert_eq!(err.to_string(), "sensor node operation failed");
        assert!(err.source().is_some());
        assert!(CollectorError::AlreadyRunning.source().is_none());
    }
}

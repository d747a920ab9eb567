//! Error types for telemetry operations.

use std::error::Error;
use std::fmt::{self, Display, Formatter};

use tracing_subscriber::util::TryInitError;

/// Result alias for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Errors raised by logging setup and the metrics registry.
#[derive(Debug)]
pub enum TelemetryError {
    /// A global tracing subscriber was already installed.
    SubscriberInstall {
        /// Underlying tracing subscriber error.
        source: TryInitError,
    },
    /// A log format string was neither `json` nor `pretty`.
    UnknownLogFormat {
        /// Rejected value.
        value: String,
    },
    /// Building or registering one metric failed.
    Metric {
        /// Metric name.
        name: &'static str,
        /// `metric.build` or `metric.register`.
        operation: &'static str,
        /// Underlying Prometheus error.
        source: prometheus::Error,
    },
    /// Encoding the registry as text failed.
    Render {
        /// Underlying Prometheus error.
        source: prometheus::Error,
    },
}

impl Display for TelemetryError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::SubscriberInstall { .. } => "failed to install tracing subscriber",
            Self::UnknownLogFormat { .. } => "unknown log format",
            Self::Metric { .. } => "failed to set up metric",
            Self::Render { .. } => "failed to render metrics",
        })
    }
}

impl Error for TelemetryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::SubscriberInstall { source } => Some(source),
            Self::Metric { source, .. } | Self::Render { source } => Some(source),
            Self::UnknownLogFormat { .. } => None,
        }
    }
}

//! # Design
//!
//! - Centralize application-level errors for bootstrap and shutdown.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Preserve source errors without re-logging at call sites.

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration loading failed.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: antmon_config::ConfigError,
    },
    /// API server operations failed.
    #[error("api server operation failed")]
    ApiServer {
        /// Operation identifier.
        operation: &'static str,
        /// Source API server error.
        source: antmon_api::ApiServerError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: antmon_telemetry::TelemetryError,
    },
    /// Metrics collector operations failed.
    #[error("metrics collector operation failed")]
    Collector {
        /// Operation identifier.
        operation: &'static str,
        /// Source collector error.
        source: antmon_core::CollectorError,
    },
}

impl AppError {
    pub(crate) const fn config(
        operation: &'static str,
        source: antmon_config::ConfigError,
    ) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn api_server(
        operation: &'static str,
        source: antmon_api::ApiServerError,
    ) -> Self {
        Self::ApiServer { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: antmon_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn collector(
        operation: &'static str,
        source: antmon_core::CollectorError,
    ) -> Self {
        Self::Collector { operation, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use std::io;
    use std::net::SocketAddr;

    #[test]
    fn app_error_helpers_build_variants() {
        let config = AppError::config(
            "config.load",
            antmon_config::ConfigError::InvalidField {
                section: "server",
                field: "http_port",
                value: Some("0".to_string()),
                reason: "zero",
            },
        );
        assert!(matches!(
            config,
            AppError::Config {
                operation: "config.load",
                ..
            }
        ));

        let api = AppError::api_server(
            "api_server.serve",
            antmon_api::ApiServerError::Bind {
                addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
                source: io::Error::new(io::ErrorKind::AddrInUse, "in use"),
            },
        );
        assert!(matches!(api, AppError::ApiServer { .. }));

        let telemetry = AppError::telemetry(
            "telemetry.log_format",
            antmon_telemetry::TelemetryError::UnknownLogFormat {
                value: "xml".to_string(),
            },
        );
        assert!(matches!(telemetry, AppError::Telemetry { .. }));

        let collector =
            AppError::collector("collector.stop", antmon_core::CollectorError::AlreadyRunning);
        assert!(matches!(collector, AppError::Collector { .. }));
    }

    #[test]
    fn messages_are_constant_and_sources_preserved() {
        let err = AppError::api_server(
            "api_server.serve",
            antmon_api::ApiServerError::Serve {
                source: io::Error::other("boom"),
            },
        );
        assert_eq!(err.to_string(), "api server operation failed");
        let source = err.source().map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("api server terminated unexpectedly"));
    }
}

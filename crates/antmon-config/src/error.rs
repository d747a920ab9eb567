//! Error types for configuration loading.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading a configuration file failed.
    #[error("failed to read configuration file")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// File involved in the failure.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
    /// A configuration file was not valid TOML for the expected schema.
    #[error("failed to parse configuration file")]
    Parse {
        /// File that failed to parse.
        path: PathBuf,
        /// Source TOML error.
        source: Box<toml::de::Error>,
    },
    /// Field contained an invalid value.
    #[error("invalid configuration field")]
    InvalidField {
        /// Section that failed validation.
        section: &'static str,
        /// Field that failed validation.
        field: &'static str,
        /// Offending value when available.
        value: Option<String>,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
}

impl ConfigError {
    pub(crate) fn invalid(
        section: &'static str,
        field: &'static str,
        value: impl Into<Option<String>>,
        reason: &'static str,
    ) -> Self {
        Self::InvalidField {
            section,
            field,
            value: value.into(),
            reason,
        }
    }
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn invalid_field_keeps_context() {
        let err = ConfigError::invalid("server", "http_port", Some("0".to_string()), "zero");
        match &err {
            ConfigError::InvalidField {
                section,
                field,
                value,
                reason,
            } => {
                assert_eq!(*section, "server");
                assert_eq!(*field, "http_port");
                assert_eq!(value.as_deref(), Some("0"));
                assert_eq!(*reason, "zero");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.to_string(), "invalid configuration field");
        assert!(err.source().is_none());
    }

    #[test]
    fn io_error_exposes_source() {
        let err = ConfigError::Io {
            operation: "config.read",
            path: PathBuf::from("antmon.toml"),
            source: io::Error::other("boom"),
        };
        assert!(err.source().is_some());
    }
}

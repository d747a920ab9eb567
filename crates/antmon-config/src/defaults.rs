//! Default values and environment variable names for configuration records.
//!
//! # Design
//! - Centralize literals so the service, CLI and tests agree on them.

/// Deployment variable that overrides the API base URL.
pub const API_BASE_URL_ENV: &str = "ANTMON_API_BASE_URL";
/// Base URL fallback for same-origin deployments.
pub const SAME_ORIGIN_BASE_URL: &str = "";
/// Base URL fallback for the local development server.
pub const DEVELOPMENT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Explicit path to the service configuration file.
pub const CONFIG_PATH_ENV: &str = "ANTMON_CONFIG";
/// File name searched for in the working directory and its parent.
pub const CONFIG_FILE_NAME: &str = "antmon.toml";
/// Bind address override.
pub const BIND_ADDR_ENV: &str = "ANTMON_BIND_ADDR";
/// HTTP port override.
pub const HTTP_PORT_ENV: &str = "ANTMON_HTTP_PORT";
/// Log level override.
pub const LOG_LEVEL_ENV: &str = "ANTMON_LOG_LEVEL";
/// Log format override (`json` or `pretty`).
pub const LOG_FORMAT_ENV: &str = "ANTMON_LOG_FORMAT";

pub(crate) const DEFAULT_BIND_ADDR: [u8; 4] = [127, 0, 0, 1];
pub(crate) const DEFAULT_HTTP_PORT: u16 = 8000;
pub(crate) const DEFAULT_LOG_LEVEL: &str = "info";
pub(crate) const DEFAULT_STREAM_INTERVAL_MS: u64 = 1_000;
/// Wheel circumference assumed when no setting overrides it.
pub const DEFAULT_WHEEL_CIRCUMFERENCE_M: f64 = 0.141;
pub(crate) const MIN_STREAM_INTERVAL_MS: u64 = 50;

/// Device numbers the bundled simulator announces by default.
pub(crate) const SIMULATED_HEART_RATE_ID: u16 = 10_936;
pub(crate) const SIMULATED_SPEED_CADENCE_ID: u16 = 10_937;
pub(crate) const SIMULATED_POWER_ID: u16 = 10_938;

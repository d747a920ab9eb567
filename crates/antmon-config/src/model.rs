//! Typed service configuration models.

use std::net::{IpAddr, SocketAddr};

use serde::{Deserialize, Serialize};

use crate::defaults::{
    DEFAULT_BIND_ADDR, DEFAULT_HTTP_PORT, DEFAULT_LOG_LEVEL, DEFAULT_STREAM_INTERVAL_MS,
    DEFAULT_WHEEL_CIRCUMFERENCE_M, MIN_STREAM_INTERVAL_MS, SIMULATED_HEART_RATE_ID,
    SIMULATED_POWER_ID, SIMULATED_SPEED_CADENCE_ID,
};
use crate::error::{ConfigError, ConfigResult};

/// Complete service configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// HTTP listener settings.
    pub server: ServerConfig,
    /// Logging output settings.
    pub logging: LoggingSettings,
    /// Sensor collection settings.
    pub collector: CollectorConfig,
    /// Devices emitted by the bundled simulated node.
    pub simulator: SimulatorConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Interface the API binds to.
    pub bind_addr: IpAddr,
    /// TCP port the API listens on.
    pub http_port: u16,
}

impl ServerConfig {
    /// Socket address combining the bind address and port.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.http_port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::from(DEFAULT_BIND_ADDR),
            http_port: DEFAULT_HTTP_PORT,
        }
    }
}

/// Logging output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// `json` or `pretty`; inferred from the build profile when absent.
    pub format: Option<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            format: None,
        }
    }
}

/// A sensor requested by device number and type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SensorEntry {
    /// ANT device number.
    pub device_id: u16,
    /// One of `BIKE_SPEED`, `BIKE_CADENCE`, `BIKE_CADENCE_SPEED`, `HEART_RATE`, `POWER_METER`.
    pub sensor_type: String,
}

/// Sensor collection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CollectorConfig {
    /// Interval between metric snapshots on the metrics stream.
    pub stream_interval_ms: u64,
    /// Wheel circumference used until settings override it.
    pub wheel_circumference_m: f64,
    /// Requested sensors; empty means scan for every supported device.
    pub sensors: Vec<SensorEntry>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            stream_interval_ms: DEFAULT_STREAM_INTERVAL_MS,
            wheel_circumference_m: DEFAULT_WHEEL_CIRCUMFERENCE_M,
            sensors: Vec::new(),
        }
    }
}

/// One device emitted by the simulated node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulatedDeviceEntry {
    /// ANT device number.
    pub device_id: u16,
    /// Sensor type string, as in [`SensorEntry::sensor_type`].
    pub sensor_type: String,
    /// Target value: bpm, watts, or wheel/crank rpm depending on the type.
    pub target: f64,
}

/// Devices emitted by the bundled simulated node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulatorConfig {
    /// Simulated devices.
    pub devices: Vec<SimulatedDeviceEntry>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            devices: vec![
                SimulatedDeviceEntry {
                    device_id: SIMULATED_HEART_RATE_ID,
                    sensor_type: "HEART_RATE".to_string(),
                    target: 132.0,
                },
                SimulatedDeviceEntry {
                    device_id: SIMULATED_SPEED_CADENCE_ID,
                    sensor_type: "BIKE_CADENCE_SPEED".to_string(),
                    target: 85.0,
                },
                SimulatedDeviceEntry {
                    device_id: SIMULATED_POWER_ID,
                    sensor_type: "POWER_METER".to_string(),
                    target: 180.0,
                },
            ],
        }
    }
}

impl AppConfig {
    /// Check ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] for the first offending field.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.server.http_port == 0 {
            return Err(ConfigError::invalid(
                "server",
                "http_port",
                Some("0".to_string()),
                "zero",
            ));
        }
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::invalid("logging", "level", None, "empty"));
        }
        if let Some(format) = self.logging.format.as_deref()
            && !matches!(format, "json" | "pretty")
        {
            return Err(ConfigError::invalid(
                "logging",
                "format",
                Some(format.to_string()),
                "unknown_format",
            ));
        }
        if self.collector.stream_interval_ms < MIN_STREAM_INTERVAL_MS {
            return Err(ConfigError::invalid(
                "collector",
                "stream_interval_ms",
                Some(self.collector.stream_interval_ms.to_string()),
                "too_small",
            ));
        }
        let wheel = self.collector.wheel_circumference_m;
        if !wheel.is_finite() || wheel <= 0.0 {
            return Err(ConfigError::invalid(
                "collector",
                "wheel_circumference_m",
                Some(wheel.to_string()),
                "not_positive",
            ));
        }
        for device in &self.simulator.devices {
            if !device.target.is_finite() || device.target < 0.0 {
                return Err(ConfigError::invalid(
                    "simulator",
                    "target",
                    Some(device.target.to_string()),
                    "negative",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = AppConfig::default();
        config.validate().expect("defaults are valid");
        assert_eq!(config.server.socket_addr().to_string(), "127.0.0.1:8000");
        assert!(config.collector.sensors.is_empty());
        assert_eq!(config.simulator.devices.len(), 3);
    }

    #[test]
    fn rejects_zero_port_and_bad_wheel() {
        let mut config = AppConfig::default();
        config.server.http_port = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidField {
                field: "http_port",
                ..
            })
        ));

        let mut config = AppConfig::default();
        config.collector.wheel_circumference_m = -1.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidField {
                reason: "not_positive",
                ..
            })
        ));
    }

    #[test]
    fn rejects_unknown_log_format() {
        let mut config = AppConfig::default();
        config.logging.format = Some("xml".to_string());
        assert!(config.validate().is_err());
        config.logging.format = Some("json".to_string());
        assert!(config.validate().is_ok());
    }
}

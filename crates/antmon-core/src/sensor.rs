//! Requested sensors and their mapping onto device profiles.

use std::fmt;
use std::str::FromStr;

use antmon_config::{SensorEntry, SimulatorConfig};
use antmon_sensors::{ChannelRequest, DeviceType, ScanPlan, SimulatedDevice};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Sensor kinds that can be requested by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SensorType {
    /// Speed-only sensor.
    BikeSpeed,
    /// Cadence-only sensor.
    BikeCadence,
    /// Combined speed and cadence sensor.
    BikeCadenceSpeed,
    /// Heart rate monitor.
    HeartRate,
    /// Power meter.
    PowerMeter,
}

/// A sensor type name that is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown sensor type")]
pub struct UnknownSensorType {
    /// Rejected name.
    pub value: String,
}

impl SensorType {
    /// Canonical upper-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BikeSpeed => "BIKE_SPEED",
            Self::BikeCadence => "BIKE_CADENCE",
            Self::BikeCadenceSpeed => "BIKE_CADENCE_SPEED",
            Self::HeartRate => "HEART_RATE",
            Self::PowerMeter => "POWER_METER",
        }
    }

    /// ANT+ profile for this sensor kind.
    #[must_use]
    pub const fn device_type(self) -> DeviceType {
        match self {
            Self::BikeSpeed => DeviceType::BikeSpeed,
            Self::BikeCadence => DeviceType::BikeCadence,
            Self::BikeCadenceSpeed => DeviceType::BikeSpeedCadence,
            Self::HeartRate => DeviceType::HeartRate,
            Self::PowerMeter => DeviceType::PowerMeter,
        }
    }
}

impl FromStr for SensorType {
    type Err = UnknownSensorType;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "BIKE_SPEED" => Ok(Self::BikeSpeed),
            "BIKE_CADENCE" => Ok(Self::BikeCadence),
            "BIKE_CADENCE_SPEED" => Ok(Self::BikeCadenceSpeed),
            "HEART_RATE" => Ok(Self::HeartRate),
            "POWER_METER" => Ok(Self::PowerMeter),
            other => Err(UnknownSensorType {
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sensor requested by device number and kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorSpec {
    /// ANT device number.
    pub device_id: u16,
    /// Requested kind.
    pub sensor_type: SensorType,
}

impl SensorSpec {
    /// Scan plan for a set of requested sensors; empty means scan for everything.
    #[must_use]
    pub fn plan(specs: &[Self]) -> ScanPlan {
        if specs.is_empty() {
            return ScanPlan::ScanAll;
        }
        ScanPlan::Channels(
            specs
                .iter()
                .map(|spec| ChannelRequest {
                    device_number: spec.device_id,
                    device_type: spec.sensor_type.device_type(),
                })
                .collect(),
        )
    }
}

/// Parse configured sensors, warning about and skipping unknown kinds.
#[must_use]
pub fn parse_sensors(entries: &[SensorEntry]) -> Vec<SensorSpec> {
    entries
        .iter()
        .filter_map(|entry| match entry.sensor_type.parse() {
            Ok(sensor_type) => Some(SensorSpec {
                device_id: entry.device_id,
                sensor_type,
            }),
            Err(err) => {
                warn!(
                    device_id = entry.device_id,
                    sensor_type = %err.value,
                    "unknown sensor type; skipping"
                );
                None
            }
        })
        .collect()
}

/// Simulated devices for the configured simulator, skipping unknown kinds.
#[must_use]
pub fn simulated_devices(config: &SimulatorConfig) -> Vec<SimulatedDevice> {
    config
        .devices
        .iter()
        .filter_map(|entry| match entry.sensor_type.parse::<SensorType>() {
            Ok(sensor_type) => Some(SimulatedDevice::new(
                entry.device_id,
                sensor_type.device_type(),
                entry.target,
            )),
            Err(err) => {
                warn!(
                    device_id = entry.device_id,
                    sensor_type = %err.value,
                    "unknown simulated sensor type; skipping"
                );
                None
            }
        })
        .collect()
}

//! ANT+ device profiles supported by the collector.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Device profiles the collector understands, keyed by ANT device type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    /// Heart rate monitor (type 120).
    HeartRate,
    /// Combined bike speed and cadence sensor (type 121).
    BikeSpeedCadence,
    /// Bike cadence sensor (type 122).
    BikeCadence,
    /// Bike speed sensor (type 123).
    BikeSpeed,
    /// Bicycle power meter (type 11).
    PowerMeter,
}

impl DeviceType {
    /// Every supported profile.
    pub const ALL: [Self; 5] = [
        Self::HeartRate,
        Self::BikeSpeedCadence,
        Self::BikeCadence,
        Self::BikeSpeed,
        Self::PowerMeter,
    ];

    /// Resolve a profile from its ANT device type code; `None` for anything unsupported.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            120 => Some(Self::HeartRate),
            121 => Some(Self::BikeSpeedCadence),
            122 => Some(Self::BikeCadence),
            123 => Some(Self::BikeSpeed),
            11 => Some(Self::PowerMeter),
            _ => None,
        }
    }

    /// ANT device type code.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::HeartRate => 120,
            Self::BikeSpeedCadence => 121,
            Self::BikeCadence => 122,
            Self::BikeSpeed => 123,
            Self::PowerMeter => 11,
        }
    }

    /// Channel period in 1/32768 s units.
    #[must_use]
    pub const fn channel_period(self) -> u16 {
        match self {
            Self::HeartRate => 8070,
            Self::BikeSpeedCadence => 8086,
            Self::BikeCadence => 8102,
            Self::BikeSpeed => 8118,
            Self::PowerMeter => 8182,
        }
    }

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::HeartRate => "Heart Rate",
            Self::BikeSpeedCadence => "Bike Speed & Cadence",
            Self::BikeCadence => "Bike Cadence",
            Self::BikeSpeed => "Bike Speed",
            Self::PowerMeter => "Power Meter",
        }
    }

    /// Label used for metrics.
    #[must_use]
    pub const fn profile(self) -> &'static str {
        match self {
            Self::HeartRate => "heart_rate",
            Self::BikeSpeedCadence => "bike_speed_cadence",
            Self::BikeCadence => "bike_cadence",
            Self::BikeSpeed => "bike_speed",
            Self::PowerMeter => "power_meter",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip_and_unknown_is_ignored() {
        for device in DeviceType::ALL {
            assert_eq!(DeviceType::from_code(device.code()), Some(device));
        }
        assert_eq!(DeviceType::from_code(0), None);
        assert_eq!(DeviceType::from_code(124), None);
    }

    #[test]
    fn periods_match_profiles() {
        assert_eq!(DeviceType::HeartRate.channel_period(), 8070);
        assert_eq!(DeviceType::PowerMeter.channel_period(), 8182);
        assert_eq!(DeviceType::BikeSpeed.to_string(), "Bike Speed");
    }
}

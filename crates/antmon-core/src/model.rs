//! Wire models shared by the collector, the API, and the CLI.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::error::{CollectorError, CollectorResult, SettingsViolation};

/// User-adjustable settings; every field is optional and, when present, strictly positive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSettings {
    /// Wheel circumference in metres used for speed.
    #[serde(default)]
    pub speed_wheel_circumference_m: Option<f64>,
    /// Wheel circumference in metres used for distance.
    #[serde(default)]
    pub distance_wheel_circumference_m: Option<f64>,
    /// Athlete age in years, used for heart rate zones.
    #[serde(default)]
    pub age: Option<i32>,
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

impl MetricsSettings {
    /// Reject present fields that are not strictly positive.
    ///
    /// # Errors
    ///
    /// Returns [`CollectorError::InvalidSettings`] listing every offending field.
    pub fn validate(&self) -> CollectorResult<()> {
        let mut violations = Vec::new();
        for (field, value) in [
            ("speed_wheel_circumference_m", self.speed_wheel_circumference_m),
            (
                "distance_wheel_circumference_m",
                self.distance_wheel_circumference_m,
            ),
        ] {
            if let Some(value) = value
                && !positive(value)
            {
                violations.push(SettingsViolation {
                    field,
                    message: format!("must be greater than 0, got {value}"),
                });
            }
        }
        if let Some(age) = self.age
            && age <= 0
        {
            violations.push(SettingsViolation {
                field: "age",
                message: format!("must be greater than 0, got {age}"),
            });
        }
        if violations.is_empty() {
            Ok(())
        } else {
            Err(CollectorError::InvalidSettings { violations })
        }
    }

    /// Overlay the fields present in `update`.
    #[must_use]
    pub fn merged(self, update: Self) -> Self {
        Self {
            speed_wheel_circumference_m: update
                .speed_wheel_circumference_m
                .or(self.speed_wheel_circumference_m),
            distance_wheel_circumference_m: update
                .distance_wheel_circumference_m
                .or(self.distance_wheel_circumference_m),
            age: update.age.or(self.age),
        }
    }

    /// Short summary of the present fields, for logs and events.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut out = String::new();
        if let Some(value) = self.speed_wheel_circumference_m {
            let _ = write!(out, "speed_wheel_circumference_m={value} ");
        }
        if let Some(value) = self.distance_wheel_circumference_m {
            let _ = write!(out, "distance_wheel_circumference_m={value} ");
        }
        if let Some(value) = self.age {
            let _ = write!(out, "age={value} ");
        }
        let trimmed = out.trim_end();
        if trimmed.is_empty() {
            "no changes".to_string()
        } else {
            trimmed.to_string()
        }
    }
}

/// Point-in-time view of the collected metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Average power in watts.
    pub power: Option<f64>,
    /// Road speed in km/h.
    pub speed: Option<f64>,
    /// Crank cadence in rpm.
    pub cadence: Option<f64>,
    /// Distance in metres since collection started.
    pub distance: Option<f64>,
    /// Heart rate in bpm.
    pub heart_rate: Option<u8>,
    /// Heart rate as a percentage of estimated HRmax.
    pub heart_rate_percent: Option<f64>,
    /// Zone label, e.g. `ZONE 3`.
    pub zone_name: Option<String>,
    /// Zone value, e.g. `Moderate`.
    pub zone_value: Option<String>,
    /// Whether collection is running.
    pub is_running: Option<bool>,
}

/// A device seen during the current collection session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSummary {
    /// ANT device number.
    pub device_id: u16,
    /// ANT device type code.
    pub device_type: u8,
    /// Profile display name.
    pub name: String,
}

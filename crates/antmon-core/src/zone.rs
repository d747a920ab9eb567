//! Heart rate training zones expressed as a share of estimated HRmax.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Training zone derived from heart rate as a percentage of HRmax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SportZone {
    /// Outside every zone, or not computable.
    #[serde(rename = "Unknown")]
    Unknown,
    /// 50 to 60 percent.
    #[serde(rename = "Very Light")]
    Zone1,
    /// 60 to 70 percent.
    #[serde(rename = "Light")]
    Zone2,
    /// 70 to 80 percent.
    #[serde(rename = "Moderate")]
    Zone3,
    /// 80 to 90 percent.
    #[serde(rename = "Hard")]
    Zone4,
    /// 90 to 100 percent.
    #[serde(rename = "Maximum")]
    Zone5,
}

impl SportZone {
    /// Estimated HRmax as `220 - age`; `None` when age is not positive.
    #[must_use]
    pub fn hrmax_from_age(age: i32) -> Option<f64> {
        (age > 0).then(|| f64::from(220 - age))
    }

    /// Heart rate as a percentage of estimated HRmax.
    #[must_use]
    pub fn percent_from_age(age: i32, heart_rate: f64) -> Option<f64> {
        let hrmax = Self::hrmax_from_age(age).filter(|hrmax| *hrmax > 0.0)?;
        Some(heart_rate / hrmax * 100.0)
    }

    /// Zone for a percentage of HRmax. Each band includes its lower bound;
    /// the top band also includes 100.
    #[must_use]
    pub fn from_hr_percent(percent: Option<f64>) -> Self {
        match percent {
            Some(p) if (50.0..60.0).contains(&p) => Self::Zone1,
            Some(p) if (60.0..70.0).contains(&p) => Self::Zone2,
            Some(p) if (70.0..80.0).contains(&p) => Self::Zone3,
            Some(p) if (80.0..90.0).contains(&p) => Self::Zone4,
            Some(p) if (90.0..=100.0).contains(&p) => Self::Zone5,
            _ => Self::Unknown,
        }
    }

    /// Zone for a heart rate given the athlete's age.
    #[must_use]
    pub fn from_age_and_hr(age: i32, heart_rate: f64) -> Self {
        Self::from_hr_percent(Self::percent_from_age(age, heart_rate))
    }

    /// Display value, e.g. `Moderate`.
    #[must_use]
    pub const fn value(self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Zone1 => "Very Light",
            Self::Zone2 => "Light",
            Self::Zone3 => "Moderate",
            Self::Zone4 => "Hard",
            Self::Zone5 => "Maximum",
        }
    }

    /// Formatted zone label, e.g. `ZONE 3`.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Unknown => "ZONE UNKNOWN",
            Self::Zone1 => "ZONE 1",
            Self::Zone2 => "ZONE 2",
            Self::Zone3 => "ZONE 3",
            Self::Zone4 => "ZONE 4",
            Self::Zone5 => "ZONE 5",
        }
    }

    /// `(label, value)`, e.g. `("ZONE 3", "Moderate")`.
    #[must_use]
    pub const fn to_tuple(self) -> (&'static str, &'static str) {
        (self.label(), self.value())
    }
}

impl fmt::Display for SportZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value())
    }
}

//! Data page decoding for each supported device profile.

use crate::device::DeviceType;

/// Standard power-only page number.
pub const POWER_ONLY_PAGE: u8 = 0x10;

const INVALID_CADENCE: u8 = 0xFF;
const PAGE_TOGGLE_MASK: u8 = 0x7F;

/// Decoded content of one data page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceData {
    /// Heart rate monitor page (any page number; the trailing bytes are common).
    HeartRate {
        /// Computed heart rate in bpm; zero means no reading.
        heart_rate: u8,
        /// Time of the last beat in 1/1024 s.
        beat_time: u16,
        /// Rolling beat counter.
        beat_count: u8,
    },
    /// Speed-only sensor page.
    BikeSpeed {
        /// Time of the last wheel event in 1/1024 s.
        event_time: u16,
        /// Cumulative wheel revolutions.
        revolutions: u16,
    },
    /// Cadence-only sensor page.
    BikeCadence {
        /// Time of the last crank event in 1/1024 s.
        event_time: u16,
        /// Cumulative crank revolutions.
        revolutions: u16,
    },
    /// Combined speed and cadence page.
    SpeedCadence {
        /// Time of the last crank event in 1/1024 s.
        cadence_time: u16,
        /// Cumulative crank revolutions.
        cadence_revolutions: u16,
        /// Time of the last wheel event in 1/1024 s.
        speed_time: u16,
        /// Cumulative wheel revolutions.
        speed_revolutions: u16,
    },
    /// Standard power-only page.
    Power {
        /// Rolling update counter.
        event_count: u8,
        /// Instantaneous crank cadence, when the meter reports one.
        cadence: Option<u8>,
        /// Rolling sum of instantaneous power in watts.
        accumulated_power: u16,
        /// Instantaneous power in watts.
        instantaneous_power: u16,
    },
}

fn word(data: &[u8; 8], at: usize) -> u16 {
    u16::from_le_bytes([data[at], data[at + 1]])
}

impl DeviceData {
    /// Decode a page for the given profile; `None` for pages the collector ignores.
    #[must_use]
    pub fn decode(device_type: DeviceType, data: &[u8; 8]) -> Option<Self> {
        match device_type {
            DeviceType::HeartRate => Some(Self::HeartRate {
                heart_rate: data[7],
                beat_time: word(data, 4),
                beat_count: data[6],
            }),
            DeviceType::BikeSpeed => Some(Self::BikeSpeed {
                event_time: word(data, 4),
                revolutions: word(data, 6),
            }),
            DeviceType::BikeCadence => Some(Self::BikeCadence {
                event_time: word(data, 4),
                revolutions: word(data, 6),
            }),
            DeviceType::BikeSpeedCadence => Some(Self::SpeedCadence {
                cadence_time: word(data, 0),
                cadence_revolutions: word(data, 2),
                speed_time: word(data, 4),
                speed_revolutions: word(data, 6),
            }),
            DeviceType::PowerMeter if data[0] == POWER_ONLY_PAGE => Some(Self::Power {
                event_count: data[1],
                cadence: (data[3] != INVALID_CADENCE).then_some(data[3]),
                accumulated_power: word(data, 4),
                instantaneous_power: word(data, 6),
            }),
            DeviceType::PowerMeter => None,
        }
    }

    /// Encode back into an eight-byte page; `page` selects the page number
    /// byte for profiles that carry one.
    #[must_use]
    pub fn encode(&self, page: u8) -> [u8; 8] {
        let mut out = [0_u8; 8];
        match *self {
            Self::HeartRate {
                heart_rate,
                beat_time,
                beat_count,
            } => {
                out[0] = page;
                out[1..4].fill(0xFF);
                out[4..6].copy_from_slice(&beat_time.to_le_bytes());
                out[6] = beat_count;
                out[7] = heart_rate;
            }
            Self::BikeSpeed {
                event_time,
                revolutions,
            }
            | Self::BikeCadence {
                event_time,
                revolutions,
            } => {
                out[0] = page & PAGE_TOGGLE_MASK;
                out[1..4].fill(0xFF);
                out[4..6].copy_from_slice(&event_time.to_le_bytes());
                out[6..8].copy_from_slice(&revolutions.to_le_bytes());
            }
            Self::SpeedCadence {
                cadence_time,
                cadence_revolutions,
                speed_time,
                speed_revolutions,
            } => {
                out[0..2].copy_from_slice(&cadence_time.to_le_bytes());
                out[2..4].copy_from_slice(&cadence_revolutions.to_le_bytes());
                out[4..6].copy_from_slice(&speed_time.to_le_bytes());
                out[6..8].copy_from_slice(&speed_revolutions.to_le_bytes());
            }
            Self::Power {
                event_count,
                cadence,
                accumulated_power,
                instantaneous_power,
            } => {
                out[0] = POWER_ONLY_PAGE;
                out[1] = event_count;
                out[2] = 0xFF;
                out[3] = cadence.unwrap_or(INVALID_CADENCE);
                out[4..6].copy_from_slice(&accumulated_power.to_le_bytes());
                out[6..8].copy_from_slice(&instantaneous_power.to_le_bytes());
            }
        }
        out
    }
}

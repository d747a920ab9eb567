//! ANT serial message framing.
//!
//! A frame is `SYNC, length, id, payload[length], checksum` where the
//! checksum is the XOR of every preceding byte, sync included.

use crate::error::{SensorError, SensorResult};

/// First byte of every frame.
pub const SYNC: u8 = 0xA4;

const FRAME_OVERHEAD: usize = 4;
const EXTENDED_FLAG: u8 = 0x80;
const PAIRING_BIT: u8 = 0x80;

/// Message identifiers.
pub mod id {
    /// Channel response or event.
    pub const CHANNEL_EVENT: u8 = 0x40;
    /// Assign channel.
    pub const ASSIGN_CHANNEL: u8 = 0x42;
    /// Set channel messaging period.
    pub const CHANNEL_PERIOD: u8 = 0x43;
    /// Set channel RF frequency.
    pub const RF_FREQUENCY: u8 = 0x45;
    /// Set network key.
    pub const NETWORK_KEY: u8 = 0x46;
    /// Reset the node.
    pub const RESET_SYSTEM: u8 = 0x4A;
    /// Open channel.
    pub const OPEN_CHANNEL: u8 = 0x4B;
    /// Close channel.
    pub const CLOSE_CHANNEL: u8 = 0x4C;
    /// Broadcast data.
    pub const BROADCAST_DATA: u8 = 0x4E;
    /// Acknowledged data.
    pub const ACKNOWLEDGED_DATA: u8 = 0x4F;
    /// Set channel id.
    pub const CHANNEL_ID: u8 = 0x51;
    /// Open continuous receive scan mode.
    pub const OPEN_RX_SCAN: u8 = 0x5B;
    /// Configure extended message output.
    pub const LIB_CONFIG: u8 = 0x6E;
}

/// Identity of a transmitting device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId {
    /// Device number; zero is a wildcard when searching.
    pub device_number: u16,
    /// Device type code, pairing bit cleared; zero is a wildcard.
    pub device_type: u8,
    /// Transmission type; zero is a wildcard.
    pub transmission_type: u8,
}

impl ChannelId {
    /// Wildcard identity matching any device.
    pub const WILDCARD: Self = Self {
        device_number: 0,
        device_type: 0,
        transmission_type: 0,
    };

    fn write(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.device_number.to_le_bytes());
        out.push(self.device_type);
        out.push(self.transmission_type);
    }

    fn read(bytes: &[u8]) -> Self {
        Self {
            device_number: u16::from_le_bytes([bytes[0], bytes[1]]),
            device_type: bytes[2] & !PAIRING_BIT,
            transmission_type: bytes[3],
        }
    }
}

/// Messages exchanged with an ANT node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Broadcast data page, optionally followed by the sender's channel id.
    BroadcastData {
        /// Receiving channel.
        channel: u8,
        /// Eight-byte data page.
        data: [u8; 8],
        /// Sender identity when extended messages are enabled.
        channel_id: Option<ChannelId>,
    },
    /// Acknowledged data page; same layout as broadcast data.
    AcknowledgedData {
        /// Receiving channel.
        channel: u8,
        /// Eight-byte data page.
        data: [u8; 8],
        /// Sender identity when extended messages are enabled.
        channel_id: Option<ChannelId>,
    },
    /// Response to a command or an asynchronous channel event.
    ChannelEvent {
        /// Channel the event concerns.
        channel: u8,
        /// Message being answered, or 1 for events.
        message_id: u8,
        /// Response or event code.
        code: u8,
    },
    /// Assign a channel on a network.
    AssignChannel {
        /// Channel number.
        channel: u8,
        /// Channel type (0x00 receive).
        channel_type: u8,
        /// Network number.
        network: u8,
    },
    /// Set the device a channel searches for.
    SetChannelId {
        /// Channel number.
        channel: u8,
        /// Requested identity.
        id: ChannelId,
    },
    /// Set a channel's messaging period.
    SetChannelPeriod {
        /// Channel number.
        channel: u8,
        /// Period in 1/32768 s units.
        period: u16,
    },
    /// Set a channel's RF frequency offset from 2400 MHz.
    SetRfFrequency {
        /// Channel number.
        channel: u8,
        /// Offset in MHz.
        frequency: u8,
    },
    /// Load a network key; callers supply the key.
    SetNetworkKey {
        /// Network number.
        network: u8,
        /// Eight-byte key.
        key: [u8; 8],
    },
    /// Open a channel.
    OpenChannel {
        /// Channel number.
        channel: u8,
    },
    /// Close a channel.
    CloseChannel {
        /// Channel number.
        channel: u8,
    },
    /// Enter continuous scan mode on channel 0.
    OpenRxScan,
    /// Configure extended data output flags.
    LibConfig {
        /// Output flags; 0x80 appends the channel id.
        flags: u8,
    },
    /// Reset the node.
    ResetSystem,
}

impl Message {
    /// Message identifier.
    #[must_use]
    pub const fn id(&self) -> u8 {
        match self {
            Self::BroadcastData { .. } => id::BROADCAST_DATA,
            Self::AcknowledgedData { .. } => id::ACKNOWLEDGED_DATA,
            Self::ChannelEvent { .. } => id::CHANNEL_EVENT,
            Self::AssignChannel { .. } => id::ASSIGN_CHANNEL,
            Self::SetChannelId { .. } => id::CHANNEL_ID,
            Self::SetChannelPeriod { .. } => id::CHANNEL_PERIOD,
            Self::SetRfFrequency { .. } => id::RF_FREQUENCY,
            Self::SetNetworkKey { .. } => id::NETWORK_KEY,
            Self::OpenChannel { .. } => id::OPEN_CHANNEL,
            Self::CloseChannel { .. } => id::CLOSE_CHANNEL,
            Self::OpenRxScan => id::OPEN_RX_SCAN,
            Self::LibConfig { .. } => id::LIB_CONFIG,
            Self::ResetSystem => id::RESET_SYSTEM,
        }
    }

    fn payload(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(14);
        match self {
            Self::BroadcastData {
                channel,
                data,
                channel_id,
            }
            | Self::AcknowledgedData {
                channel,
                data,
                channel_id,
            } => {
                out.push(*channel);
                out.extend_from_slice(data);
                if let Some(sender) = channel_id {
                    out.push(EXTENDED_FLAG);
                    sender.write(&mut out);
                }
            }
            Self::ChannelEvent {
                channel,
                message_id,
                code,
            } => out.extend_from_slice(&[*channel, *message_id, *code]),
            Self::AssignChannel {
                channel,
                channel_type,
                network,
            } => out.extend_from_slice(&[*channel, *channel_type, *network]),
            Self::SetChannelId { channel, id } => {
                out.push(*channel);
                id.write(&mut out);
            }
            Self::SetChannelPeriod { channel, period } => {
                out.push(*channel);
                out.extend_from_slice(&period.to_le_bytes());
            }
            Self::SetRfFrequency { channel, frequency } => {
                out.extend_from_slice(&[*channel, *frequency]);
            }
            Self::SetNetworkKey { network, key } => {
                out.push(*network);
                out.extend_from_slice(key);
            }
            Self::OpenChannel { channel } | Self::CloseChannel { channel } => out.push(*channel),
            Self::OpenRxScan | Self::ResetSystem => out.push(0),
            Self::LibConfig { flags } => out.extend_from_slice(&[0, *flags]),
        }
        out
    }

    /// Encode into a complete frame.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let payload = self.payload();
        let mut frame = Vec::with_capacity(payload.len() + FRAME_OVERHEAD);
        frame.push(SYNC);
        // Payloads never exceed 14 bytes.
        frame.push(u8::try_from(payload.len()).unwrap_or(u8::MAX));
        frame.push(self.id());
        frame.extend_from_slice(&payload);
        frame.push(checksum(&frame));
        frame
    }

    /// Decode one complete frame.
    ///
    /// # Errors
    ///
    /// Returns an error when the sync byte, length, or checksum is wrong,
    /// when the payload is too short for its message, or when the message
    /// identifier is not supported.
    pub fn decode(frame: &[u8]) -> SensorResult<Self> {
        if frame.len() < FRAME_OVERHEAD {
            return Err(SensorError::Truncated {
                needed: FRAME_OVERHEAD,
                actual: frame.len(),
            });
        }
        if frame[0] != SYNC {
            return Err(SensorError::InvalidSync { found: frame[0] });
        }
        let declared = usize::from(frame[1]);
        let actual = frame.len() - FRAME_OVERHEAD;
        if declared != actual {
            return Err(SensorError::LengthMismatch { declared, actual });
        }
        let (body, tail) = frame.split_at(frame.len() - 1);
        let expected = checksum(body);
        if expected != tail[0] {
            return Err(SensorError::Checksum {
                expected,
                actual: tail[0],
            });
        }
        Self::from_payload(frame[2], &body[3..])
    }

    fn from_payload(message_id: u8, payload: &[u8]) -> SensorResult<Self> {
        let need = |needed: usize| {
            if payload.len() < needed {
                Err(SensorError::Truncated {
                    needed,
                    actual: payload.len(),
                })
            } else {
                Ok(())
            }
        };
        let message = match message_id {
            id::BROADCAST_DATA | id::ACKNOWLEDGED_DATA => {
                need(9)?;
                let mut data = [0_u8; 8];
                data.copy_from_slice(&payload[1..9]);
                let channel_id = if payload.len() >= 14 && payload[9] & EXTENDED_FLAG != 0 {
                    Some(ChannelId::read(&payload[10..14]))
                } else {
                    None
                };
                if message_id == id::BROADCAST_DATA {
                    Self::BroadcastData {
                        channel: payload[0],
                        data,
                        channel_id,
                    }
                } else {
                    Self::AcknowledgedData {
                        channel: payload[0],
                        data,
                        channel_id,
                    }
                }
            }
            id::CHANNEL_EVENT => {
                need(3)?;
                Self::ChannelEvent {
                    channel: payload[0],
                    message_id: payload[1],
                    code: payload[2],
                }
            }
            id::ASSIGN_CHANNEL => {
                need(3)?;
                Self::AssignChannel {
                    channel: payload[0],
                    channel_type: payload[1],
                    network: payload[2],
                }
            }
            id::CHANNEL_ID => {
                need(5)?;
                Self::SetChannelId {
                    channel: payload[0],
                    id: ChannelId::read(&payload[1..5]),
                }
            }
            id::CHANNEL_PERIOD => {
                need(3)?;
                Self::SetChannelPeriod {
                    channel: payload[0],
                    period: u16::from_le_bytes([payload[1], payload[2]]),
                }
            }
            id::RF_FREQUENCY => {
                need(2)?;
                Self::SetRfFrequency {
                    channel: payload[0],
                    frequency: payload[1],
                }
            }
            id::NETWORK_KEY => {
                need(9)?;
                let mut key = [0_u8; 8];
                key.copy_from_slice(&payload[1..9]);
                Self::SetNetworkKey {
                    network: payload[0],
                    key,
                }
            }
            id::OPEN_CHANNEL => {
                need(1)?;
                Self::OpenChannel {
                    channel: payload[0],
                }
            }
            id::CLOSE_CHANNEL => {
                need(1)?;
                Self::CloseChannel {
                    channel: payload[0],
                }
            }
            id::OPEN_RX_SCAN => Self::OpenRxScan,
            id::LIB_CONFIG => {
                need(2)?;
                Self::LibConfig { flags: payload[1] }
            }
            id::RESET_SYSTEM => Self::ResetSystem,
            other => return Err(SensorError::UnsupportedMessage { id: other }),
        };
        Ok(message)
    }
}

/// XOR of every byte.
#[must_use]
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, byte| acc ^ byte)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_channel_frame_layout() {
        let frame = Message::OpenChannel { channel: 2 }.encode();
        assert_eq!(frame, vec![0xA4, 0x01, 0x4B, 0x02, 0xA4 ^ 0x01 ^ 0x4B ^ 0x02]);
    }

    #[test]
    fn extended_broadcast_carries_sender() {
        let sender = ChannelId {
            device_number: 10936,
            device_type: 120,
            transmission_type: 1,
        };
        let message = Message::BroadcastData {
            channel: 0,
            data: [4, 0, 0, 0, 0x10, 0x20, 7, 140],
            channel_id: Some(sender),
        };
        let frame = message.encode();
        assert_eq!(frame.len(), 18);
        assert_eq!(frame[1], 14);
        assert_eq!(frame[12], 0x80);
        assert_eq!(Message::decode(&frame), Ok(message));
    }

    #[test]
    fn pairing_bit_is_cleared() {
        let mut frame = Message::BroadcastData {
            channel: 0,
            data: [0; 8],
            channel_id: Some(ChannelId {
                device_number: 1,
                device_type: 120,
                transmission_type: 1,
            }),
        }
        .encode();
        frame[15] |= 0x80;
        let last = frame.len() - 1;
        frame[last] = checksum(&frame[..last]);
        match Message::decode(&frame) {
            Ok(Message::BroadcastData {
                channel_id: Some(id),
                ..
            }) => assert_eq!(id.device_type, 120),
            other => panic!("unexpected decode: {other:?}"),
        }
    }

    #[test]
    fn rejects_corrupted_frames() {
        let frame = Message::ResetSystem.encode();

        let mut bad_sync = frame.clone();
        bad_sync[0] = 0xA5;
        assert_eq!(
            Message::decode(&bad_sync),
            Err(SensorError::InvalidSync { found: 0xA5 })
        );

        let mut bad_sum = frame.clone();
        let last = bad_sum.len() - 1;
        bad_sum[last] ^= 0xFF;
        assert!(matches!(
            Message::decode(&bad_sum),
            Err(SensorError::Checksum { .. })
        ));

        assert!(matches!(
            Message::decode(&frame[..3]),
            Err(SensorError::Truncated { .. })
        ));

        let mut long = frame;
        long.insert(3, 0);
        assert!(matches!(
            Message::decode(&long),
            Err(SensorError::LengthMismatch { declared: 1, actual: 2 })
        ));
    }

    #[test]
    fn unknown_message_ids_are_reported() {
        let mut frame = vec![SYNC, 1, 0x99, 0];
        frame.push(checksum(&frame));
        assert_eq!(
            Message::decode(&frame),
            Err(SensorError::UnsupportedMessage { id: 0x99 })
        );
    }

    #[test]
    fn short_broadcast_payload_is_truncated() {
        let mut frame = vec![SYNC, 3, id::BROADCAST_DATA, 0, 1, 2];
        frame.push(checksum(&frame));
        assert_eq!(
            Message::decode(&frame),
            Err(SensorError::Truncated {
                needed: 9,
                actual: 3
            })
        );
    }
}

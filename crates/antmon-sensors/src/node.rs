//! The node seam: anything that can open channels and deliver raw frames.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::device::DeviceType;
use crate::error::{SensorError, SensorResult};
use crate::message::{ChannelId, Message};

/// Channels available on a typical ANT USB stick.
pub const MAX_CHANNELS: usize = 8;
/// ANT+ RF frequency offset (2457 MHz).
pub const RF_FREQUENCY: u8 = 57;
/// Receive-only channel type.
const CHANNEL_TYPE_RECEIVE: u8 = 0x00;
/// Extended output flag enabling channel id trailers on data messages.
const LIB_CONFIG_CHANNEL_ID: u8 = 0x80;
const NETWORK: u8 = 0;

/// Receiving end of a node's frame stream; closed when the node stops.
pub type FrameReceiver = mpsc::Receiver<Vec<u8>>;

/// One requested sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelRequest {
    /// Device number to pair with.
    pub device_number: u16,
    /// Expected profile.
    pub device_type: DeviceType,
}

/// What a node should listen for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanPlan {
    /// Continuous scan accepting every supported profile.
    ScanAll,
    /// Dedicated channels for specific devices.
    Channels(Vec<ChannelRequest>),
}

impl ScanPlan {
    /// `true` in scan mode.
    #[must_use]
    pub const fn is_scan(&self) -> bool {
        matches!(self, Self::ScanAll)
    }

    /// Check the plan fits on a node.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::TooManyChannels`] when more devices are requested
    /// than channels exist.
    pub fn validate(&self) -> SensorResult<()> {
        if let Self::Channels(requests) = self
            && requests.len() > MAX_CHANNELS
        {
            return Err(SensorError::TooManyChannels {
                requested: requests.len(),
                max: MAX_CHANNELS,
            });
        }
        Ok(())
    }

    /// Whether frames from `sender` belong to this plan.
    ///
    /// Scan mode accepts every supported profile; channel mode accepts only the
    /// requested device number and profile pairs.
    #[must_use]
    pub fn accepts(&self, sender: &ChannelId) -> bool {
        let Some(device_type) = DeviceType::from_code(sender.device_type) else {
            return false;
        };
        match self {
            Self::ScanAll => true,
            Self::Channels(requests) => requests.iter().any(|request| {
                request.device_type == device_type && request.device_number == sender.device_number
            }),
        }
    }

    /// Configuration messages a node sends to realise the plan, after it has
    /// loaded its network key.
    #[must_use]
    pub fn configuration_messages(&self) -> Vec<Message> {
        let mut messages = vec![
            Message::ResetSystem,
            Message::LibConfig {
                flags: LIB_CONFIG_CHANNEL_ID,
            },
        ];
        match self {
            Self::ScanAll => {
                messages.extend([
                    Message::AssignChannel {
                        channel: 0,
                        channel_type: CHANNEL_TYPE_RECEIVE,
                        network: NETWORK,
                    },
                    Message::SetChannelId {
                        channel: 0,
                        id: ChannelId::WILDCARD,
                    },
                    Message::SetRfFrequency {
                        channel: 0,
                        frequency: RF_FREQUENCY,
                    },
                    Message::OpenRxScan,
                ]);
            }
            Self::Channels(requests) => {
                for (channel, request) in (0_u8..).zip(requests) {
                    messages.extend([
                        Message::AssignChannel {
                            channel,
                            channel_type: CHANNEL_TYPE_RECEIVE,
                            network: NETWORK,
                        },
                        Message::SetChannelId {
                            channel,
                            id: ChannelId {
                                device_number: request.device_number,
                                device_type: request.device_type.code(),
                                transmission_type: 0,
                            },
                        },
                        Message::SetChannelPeriod {
                            channel,
                            period: request.device_type.channel_period(),
                        },
                        Message::SetRfFrequency {
                            channel,
                            frequency: RF_FREQUENCY,
                        },
                        Message::OpenChannel { channel },
                    ]);
                }
            }
        }
        messages
    }
}

/// A source of ANT frames, such as a USB stick or the simulator.
#[async_trait]
pub trait SensorNode: Send {
    /// Short identifier for logs.
    fn name(&self) -> &'static str;

    /// Configure channels for `plan` and start delivering raw frames.
    async fn start(&mut self, plan: &ScanPlan) -> SensorResult<FrameReceiver>;

    /// Close channels and stop delivering frames. Stopping a stopped node is a no-op.
    async fn stop(&mut self) -> SensorResult<()>;
}

/// Builds a fresh node for each collection session.
pub trait NodeFactory: Send + Sync {
    /// Create an unstarted node.
    fn create(&self) -> Box<dyn SensorNode>;
}

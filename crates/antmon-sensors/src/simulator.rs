//! In-process node that synthesises broadcast frames for configured devices.
//!
//! Simulated time advances by exactly one period per tick, so the pages a
//! device emits are deterministic regardless of scheduler jitter.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::device::DeviceType;
use crate::error::{SensorError, SensorResult};
use crate::message::{ChannelId, Message};
use crate::node::{FrameReceiver, NodeFactory, ScanPlan, SensorNode};
use crate::page::{DeviceData, POWER_ONLY_PAGE};

/// Broadcast rate of real ANT+ sensors (4 Hz).
pub const DEFAULT_PERIOD: Duration = Duration::from_millis(250);

const FRAME_BUFFER: usize = 64;
const SIMULATED_TRANSMISSION_TYPE: u8 = 1;
const WHEEL_TO_CRANK_RATIO: f64 = 2.5;
const SIMULATED_POWER_CADENCE: u8 = 90;
const HEART_RATE_PAGE: u8 = 4;

#[derive(Debug, Clone, Default)]
struct EventCounter {
    value: f64,
    count: u64,
    event_time_s: f64,
}

impl EventCounter {
    fn advance(&mut self, rate_per_s: f64, now_s: f64, dt_s: f64) {
        self.value += rate_per_s * dt_s;
        let whole = self.value.floor();
        if whole > self.count_f64() {
            self.event_time_s = if rate_per_s > 0.0 {
                now_s - (self.value - whole) / rate_per_s
            } else {
                now_s
            };
            self.count = to_u64(whole);
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn count_f64(&self) -> f64 {
        self.count as f64
    }

    fn count_u16(&self) -> u16 {
        u16::try_from(self.count & 0xFFFF).unwrap_or(0)
    }

    fn count_u8(&self) -> u8 {
        u8::try_from(self.count & 0xFF).unwrap_or(0)
    }

    fn event_ticks(&self) -> u16 {
        u16::try_from(to_u64(self.event_time_s * 1024.0) & 0xFFFF).unwrap_or(0)
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_u64(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value as u64
    } else {
        0
    }
}

fn to_u16(value: f64) -> u16 {
    u16::try_from(to_u64(value.round()).min(u64::from(u16::MAX))).unwrap_or(u16::MAX)
}

/// A simulated sensor with a target reading.
#[derive(Debug, Clone)]
pub struct SimulatedDevice {
    channel_id: ChannelId,
    device_type: DeviceType,
    target: f64,
    elapsed_s: f64,
    primary: EventCounter,
    secondary: EventCounter,
    power_events: u8,
    accumulated_power: u16,
}

impl SimulatedDevice {
    /// `target` is bpm for heart rate, watts for power, and revolutions per
    /// minute for speed and cadence sensors (crank rpm for the combined sensor).
    #[must_use]
    pub fn new(device_number: u16, device_type: DeviceType, target: f64) -> Self {
        Self {
            channel_id: ChannelId {
                device_number,
                device_type: device_type.code(),
                transmission_type: SIMULATED_TRANSMISSION_TYPE,
            },
            device_type,
            target: target.max(0.0),
            elapsed_s: 0.0,
            primary: EventCounter::default(),
            secondary: EventCounter::default(),
            power_events: 0,
            accumulated_power: 0,
        }
    }

    /// Identity the device transmits.
    #[must_use]
    pub const fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    /// Profile of the device.
    #[must_use]
    pub const fn device_type(&self) -> DeviceType {
        self.device_type
    }

    /// Advance simulated time by `dt` and produce the next data page.
    pub fn advance(&mut self, dt: Duration) -> [u8; 8] {
        let dt_s = dt.as_secs_f64();
        self.elapsed_s += dt_s;
        let now = self.elapsed_s;
        let reading = self.target * (1.0 + 0.03 * (now * 0.7).sin());

        let data = match self.device_type {
            DeviceType::HeartRate => {
                self.primary.advance(reading / 60.0, now, dt_s);
                DeviceData::HeartRate {
                    heart_rate: u8::try_from(to_u16(reading)).unwrap_or(u8::MAX),
                    beat_time: self.primary.event_ticks(),
                    beat_count: self.primary.count_u8(),
                }
            }
            DeviceType::BikeSpeed => {
                self.primary.advance(reading / 60.0, now, dt_s);
                DeviceData::BikeSpeed {
                    event_time: self.primary.event_ticks(),
                    revolutions: self.primary.count_u16(),
                }
            }
            DeviceType::BikeCadence => {
                self.primary.advance(reading / 60.0, now, dt_s);
                DeviceData::BikeCadence {
                    event_time: self.primary.event_ticks(),
                    revolutions: self.primary.count_u16(),
                }
            }
            DeviceType::BikeSpeedCadence => {
                self.primary.advance(reading / 60.0, now, dt_s);
                self.secondary
                    .advance(reading * WHEEL_TO_CRANK_RATIO / 60.0, now, dt_s);
                DeviceData::SpeedCadence {
                    cadence_time: self.primary.event_ticks(),
                    cadence_revolutions: self.primary.count_u16(),
                    speed_time: self.secondary.event_ticks(),
                    speed_revolutions: self.secondary.count_u16(),
                }
            }
            DeviceType::PowerMeter => {
                let watts = to_u16(reading);
                self.power_events = self.power_events.wrapping_add(1);
                self.accumulated_power = self.accumulated_power.wrapping_add(watts);
                DeviceData::Power {
                    event_count: self.power_events,
                    cadence: Some(SIMULATED_POWER_CADENCE),
                    accumulated_power: self.accumulated_power,
                    instantaneous_power: watts,
                }
            }
        };
        let page = match self.device_type {
            DeviceType::PowerMeter => POWER_ONLY_PAGE,
            DeviceType::HeartRate => HEART_RATE_PAGE,
            _ => 0,
        };
        data.encode(page)
    }
}

struct Running {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Node that emits frames for a fixed set of simulated devices.
pub struct SimulatedNode {
    devices: Vec<SimulatedDevice>,
    period: Duration,
    running: Option<Running>,
}

impl SimulatedNode {
    /// Node broadcasting at 4 Hz.
    #[must_use]
    pub fn new(devices: Vec<SimulatedDevice>) -> Self {
        Self {
            devices,
            period: DEFAULT_PERIOD,
            running: None,
        }
    }

    /// Override the broadcast period.
    #[must_use]
    pub const fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    fn channel_for(plan: &ScanPlan, sender: &ChannelId) -> u8 {
        match plan {
            ScanPlan::ScanAll => 0,
            ScanPlan::Channels(requests) => (0_u8..)
                .zip(requests)
                .find(|(_, request)| {
                    request.device_number == sender.device_number
                        && request.device_type.code() == sender.device_type
                })
                .map_or(0, |(channel, _)| channel),
        }
    }
}

#[async_trait]
impl SensorNode for SimulatedNode {
    fn name(&self) -> &'static str {
        "simulator"
    }

    async fn start(&mut self, plan: &ScanPlan) -> SensorResult<FrameReceiver> {
        if self.running.is_some() {
            return Err(SensorError::AlreadyStarted);
        }
        plan.validate()?;
        for message in plan.configuration_messages() {
            debug!(id = message.id(), "simulated node configure");
        }

        let mut devices: Vec<(u8, SimulatedDevice)> = self
            .devices
            .iter()
            .filter(|device| plan.accepts(&device.channel_id))
            .map(|device| (Self::channel_for(plan, &device.channel_id), device.clone()))
            .collect();
        info!(
            devices = devices.len(),
            scanning = plan.is_scan(),
            "simulated node started"
        );

        let (frames, receiver) = mpsc::channel(FRAME_BUFFER);
        let (shutdown, mut shutdown_rx) = oneshot::channel();
        let period = self.period;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        for (channel, device) in &mut devices {
                            let frame = Message::BroadcastData {
                                channel: *channel,
                                data: device.advance(period),
                                channel_id: Some(device.channel_id),
                            }
                            .encode();
                            if frames.send(frame).await.is_err() {
                                return;
                            }
                        }
                    }
                }
            }
        });
        self.running = Some(Running { shutdown, handle });
        Ok(receiver)
    }

    async fn stop(&mut self) -> SensorResult<()> {
        let Some(running) = self.running.take() else {
            return Ok(());
        };
        // The task may already have exited after its receiver was dropped.
        let _ = running.shutdown.send(());
        running.handle.await.map_err(|err| SensorError::Node {
            operation: "simulator.join",
            detail: err.to_string(),
        })?;
        info!("simulated node stopped");
        Ok(())
    }
}

/// Factory producing [`SimulatedNode`]s for the same device set.
#[derive(Debug, Clone)]
pub struct SimulatedNodeFactory {
    devices: Vec<SimulatedDevice>,
    period: Duration,
}

impl SimulatedNodeFactory {
    /// Factory for nodes broadcasting `devices` at 4 Hz.
    #[must_use]
    pub const fn new(devices: Vec<SimulatedDevice>) -> Self {
        Self {
            devices,
            period: DEFAULT_PERIOD,
        }
    }

    /// Override the broadcast period of created nodes.
    #[must_use]
    pub const fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }
}

impl NodeFactory for SimulatedNodeFactory {
    fn create(&self) -> Box<dyn SensorNode> {
        Box::new(SimulatedNode::new(self.devices.clone()).with_period(self.period))
    }
}

//! Turns raw node frames into device registrations and readings.

use std::collections::HashMap;

use antmon_sensors::{
    ChannelId, DeviceData, DeviceType, Message, PowerCalculator, RevolutionCalculator, ScanPlan,
    SensorResult,
};

use crate::model::DeviceSummary;

/// Latest raw readings; speed and distance are derived at snapshot time so
/// circumference changes apply immediately.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Readings {
    pub(crate) power: Option<f64>,
    pub(crate) cadence: Option<f64>,
    pub(crate) wheel_rpm: Option<f64>,
    pub(crate) wheel_revolutions: Option<u64>,
    pub(crate) heart_rate: Option<u8>,
}

/// State the processing task shares with readers.
#[derive(Debug, Default)]
pub(crate) struct SessionState {
    pub(crate) readings: Readings,
    pub(crate) devices: Vec<DeviceSummary>,
}

/// What a frame changed.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct FrameEffect {
    pub(crate) new_device: Option<DeviceSummary>,
    pub(crate) profile: Option<DeviceType>,
}

#[derive(Debug, Default)]
struct DeviceTracker {
    wheel: RevolutionCalculator,
    crank: RevolutionCalculator,
    power: PowerCalculator,
}

impl DeviceTracker {
    fn wheel(&mut self, event_time: u16, revolutions: u16, readings: &mut Readings) {
        if let Some(rpm) = self.wheel.update(event_time, revolutions) {
            readings.wheel_rpm = Some(rpm);
        }
        readings.wheel_revolutions = Some(self.wheel.total_revolutions());
    }

    fn crank(&mut self, event_time: u16, revolutions: u16, readings: &mut Readings) {
        if let Some(rpm) = self.crank.update(event_time, revolutions) {
            readings.cadence = Some(rpm);
        }
    }

    fn apply(&mut self, data: DeviceData, readings: &mut Readings) {
        match data {
            DeviceData::HeartRate { heart_rate, .. } => readings.heart_rate = Some(heart_rate),
            DeviceData::BikeSpeed {
                event_time,
                revolutions,
            } => self.wheel(event_time, revolutions, readings),
            DeviceData::BikeCadence {
                event_time,
                revolutions,
            } => self.crank(event_time, revolutions, readings),
            DeviceData::SpeedCadence {
                cadence_time,
                cadence_revolutions,
                speed_time,
                speed_revolutions,
            } => {
                self.crank(cadence_time, cadence_revolutions, readings);
                self.wheel(speed_time, speed_revolutions, readings);
            }
            DeviceData::Power {
                event_count,
                accumulated_power,
                instantaneous_power,
                ..
            } => {
                if let Some(watts) =
                    self.power
                        .update(event_count, accumulated_power, instantaneous_power)
                {
                    readings.power = Some(watts);
                }
            }
        }
    }
}

/// Per-session frame interpreter.
pub(crate) struct FrameProcessor {
    plan: ScanPlan,
    trackers: HashMap<(u16, DeviceType), DeviceTracker>,
}

impl FrameProcessor {
    pub(crate) fn new(plan: ScanPlan) -> Self {
        Self {
            plan,
            trackers: HashMap::new(),
        }
    }

    /// Identity of a frame's sender: the extended trailer when present,
    /// otherwise the device requested on that channel.
    fn sender(&self, channel: u8, channel_id: Option<ChannelId>) -> Option<ChannelId> {
        if channel_id.is_some() {
            return channel_id;
        }
        match &self.plan {
            ScanPlan::ScanAll => None,
            ScanPlan::Channels(requests) => {
                requests
                    .get(usize::from(channel))
                    .map(|request| ChannelId {
                        device_number: request.device_number,
                        device_type: request.device_type.code(),
                        transmission_type: 0,
                    })
            }
        }
    }

    pub(crate) fn apply(
        &mut self,
        frame: &[u8],
        state: &mut SessionState,
    ) -> SensorResult<FrameEffect> {
        let (channel, data, channel_id) = match Message::decode(frame)? {
            Message::BroadcastData {
                channel,
                data,
                channel_id,
            }
            | Message::AcknowledgedData {
                channel,
                data,
                channel_id,
            } => (channel, data, channel_id),
            _ => return Ok(FrameEffect::default()),
        };
        let Some(sender) = self.sender(channel, channel_id) else {
            return Ok(FrameEffect::default());
        };
        if !self.plan.accepts(&sender) {
            return Ok(FrameEffect::default());
        }
        let Some(device_type) = DeviceType::from_code(sender.device_type) else {
            return Ok(FrameEffect::default());
        };

        let mut effect = FrameEffect::default();
        let known = state.devices.iter().any(|device| {
            device.device_id == sender.device_number && device.device_type == sender.device_type
        });
        if !known {
            let summary = DeviceSummary {
                device_id: sender.device_number,
                device_type: sender.device_type,
                name: device_type.name().to_string(),
            };
            state.devices.push(summary.clone());
            effect.new_device = Some(summary);
        }

        if let Some(page) = DeviceData::decode(device_type, &data) {
            self.trackers
                .entry((sender.device_number, device_type))
                .or_default()
                .apply(page, &mut state.readings);
            effect.profile = Some(device_type);
        }
        Ok(effect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use antmon_sensors::{ChannelRequest, SensorError};

    fn frame(device_number: u16, device_type: DeviceType, data: DeviceData, page: u8) -> Vec<u8> {
        Message::BroadcastData {
            channel: 0,
            data: data.encode(page),
            channel_id: Some(ChannelId {
                device_number,
                device_type: device_type.code(),
                transmission_type: 1,
            }),
        }
        .encode()
    }

    fn heart_rate(bpm: u8) -> Vec<u8> {
        frame(
            1,
            DeviceType::HeartRate,
            DeviceData::HeartRate {
                heart_rate: bpm,
                beat_time: 0,
                beat_count: 0,
            },
            4,
        )
    }

    #[test]
    fn first_frame_registers_device_once() -> anyhow::Result<()> {
        let mut processor = FrameProcessor::new(ScanPlan::ScanAll);
        let mut state = SessionState::default();

        let effect = processor.apply(&heart_rate(140), &mut state)?;
        assert_eq!(
            effect.new_device.map(|d| d.name),
            Some("Heart Rate".to_string())
        );
        assert_eq!(effect.profile, Some(DeviceType::HeartRate));

        let effect = processor.apply(&heart_rate(141), &mut state)?;
        assert!(effect.new_device.is_none());
        assert_eq!(state.devices.len(), 1);
        assert_eq!(state.readings.heart_rate, Some(141));
        Ok(())
    }

    #[test]
    fn combined_sensor_updates_cadence_and_wheel() -> anyhow::Result<()> {
        let mut processor = FrameProcessor::new(ScanPlan::ScanAll);
        let mut state = SessionState::default();
        let page = |time: u16, crank: u16, wheel: u16| DeviceData::SpeedCadence {
            cadence_time: time,
            cadence_revolutions: crank,
            speed_time: time,
            speed_revolutions: wheel,
        };
        processor.apply(
            &frame(2, DeviceType::BikeSpeedCadence, page(0, 0, 0), 0),
            &mut state,
        )?;
        processor.apply(
            &frame(2, DeviceType::BikeSpeedCadence, page(1024, 1, 3), 0),
            &mut state,
        )?;
        assert_eq!(state.readings.cadence, Some(60.0));
        assert_eq!(state.readings.wheel_rpm, Some(180.0));
        assert_eq!(state.readings.wheel_revolutions, Some(3));
        Ok(())
    }

    #[test]
    fn channel_plan_drops_unrequested_senders() -> anyhow::Result<()> {
        let plan = ScanPlan::Channels(vec![ChannelRequest {
            device_number: 99,
            device_type: DeviceType::HeartRate,
        }]);
        let mut processor = FrameProcessor::new(plan);
        let mut state = SessionState::default();
        let effect = processor.apply(&heart_rate(120), &mut state)?;
        assert_eq!(effect, FrameEffect::default());
        assert!(state.devices.is_empty());
        Ok(())
    }

    #[test]
    fn channel_number_identifies_plain_broadcasts() -> anyhow::Result<()> {
        let plan = ScanPlan::Channels(vec![ChannelRequest {
            device_number: 99,
            device_type: DeviceType::HeartRate,
        }]);
        let mut processor = FrameProcessor::new(plan);
        let mut state = SessionState::default();
        let plain = Message::BroadcastData {
            channel: 0,
            data: [4, 0xFF, 0xFF, 0xFF, 0, 0, 0, 150],
            channel_id: None,
        }
        .encode();
        processor.apply(&plain, &mut state)?;
        assert_eq!(state.devices[0].device_id, 99);
        assert_eq!(state.readings.heart_rate, Some(150));
        Ok(())
    }

    #[test]
    fn corrupt_frames_surface_errors() {
        let mut processor = FrameProcessor::new(ScanPlan::ScanAll);
        let mut state = SessionState::default();
        let mut bad = heart_rate(100);
        bad[0] = 0;
        assert!(matches!(
            processor.apply(&bad, &mut state),
            Err(SensorError::InvalidSync { .. })
        ));
    }

    #[test]
    fn non_data_messages_are_ignored() -> anyhow::Result<()> {
        let mut processor = FrameProcessor::new(ScanPlan::ScanAll);
        let mut state = SessionState::default();
        let event = Message::ChannelEvent {
            channel: 0,
            message_id: 1,
            code: 8,
        }
        .encode();
        assert_eq!(processor.apply(&event, &mut state)?, FrameEffect::default());
        Ok(())
    }
}

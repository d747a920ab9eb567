//! The metrics collector: owns the node session and the shared readings.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use antmon_config::CollectorConfig;
use antmon_events::{Event, EventBus};
use antmon_sensors::{FrameReceiver, NodeFactory, ScanPlan, SensorNode, speed_kmh};
use antmon_telemetry::Metrics;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{CollectorError, CollectorResult};
use crate::model::{DeviceSummary, MetricsSettings, MetricsSnapshot};
use crate::processor::{FrameProcessor, Readings, SessionState};
use crate::sensor::{SensorSpec, parse_sensors};
use crate::zone::SportZone;

/// Static collector options.
#[derive(Debug, Clone)]
pub struct CollectorOptions {
    /// Requested sensors; empty means scan mode.
    pub sensors: Vec<SensorSpec>,
    /// Circumference used when settings leave it unset.
    pub default_circumference_m: f64,
}

impl CollectorOptions {
    /// Options from the collector configuration section.
    #[must_use]
    pub fn from_config(config: &CollectorConfig) -> Self {
        Self {
            sensors: parse_sensors(&config.sensors),
            default_circumference_m: config.wheel_circumference_m,
        }
    }
}

struct Session {
    node: Box<dyn SensorNode>,
    task: JoinHandle<()>,
}

struct Inner {
    factory: Arc<dyn NodeFactory>,
    events: EventBus,
    telemetry: Metrics,
    plan: ScanPlan,
    default_circumference_m: f64,
    state: Arc<Mutex<SessionState>>,
    settings: Mutex<MetricsSettings>,
    session: tokio::sync::Mutex<Option<Session>>,
}

/// Drives one sensor node at a time and exposes its readings.
#[derive(Clone)]
pub struct MetricsCollector {
    inner: Arc<Inner>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MetricsCollector {
    /// Build an idle collector.
    #[must_use]
    pub fn new(
        factory: Arc<dyn NodeFactory>,
        events: EventBus,
        telemetry: Metrics,
        options: CollectorOptions,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                factory,
                events,
                telemetry,
                plan: SensorSpec::plan(&options.sensors),
                default_circumference_m: options.default_circumference_m,
                state: Arc::new(Mutex::new(SessionState::default())),
                settings: Mutex::new(MetricsSettings::default()),
                session: tokio::sync::Mutex::new(None),
            }),
        }
    }

    fn publish(&self, event: Event) {
        self.inner.telemetry.inc_event(event.kind());
        let _ = self.inner.events.publish(event);
    }

    /// Open a node with the configured plan and start processing its frames.
    ///
    /// # Errors
    ///
    /// Returns [`CollectorError::AlreadyRunning`] when a session is active and
    /// [`CollectorError::Node`] when the node cannot be started.
    pub async fn start(&self) -> CollectorResult<()> {
        let mut session = self.inner.session.lock().await;
        if session.is_some() {
            return Err(CollectorError::AlreadyRunning);
        }

        let scanning = self.inner.plan.is_scan();
        if scanning {
            info!("no sensors specified; scanning for all supported devices");
        } else {
            info!(sensors = ?self.inner.plan, "starting with requested sensors");
        }

        let mut node = self.inner.factory.create();
        let frames = match node.start(&self.inner.plan).await {
            Ok(frames) => frames,
            Err(source) => {
                warn!(node = node.name(), error = %source, "failed to start sensor node");
                if let Err(err) = node.stop().await {
                    warn!(error = %err, "failed to stop sensor node after start failure");
                }
                return Err(CollectorError::Node {
                    operation: "node.start",
                    source,
                });
            }
        };

        *lock(&self.inner.state) = SessionState::default();
        self.inner.telemetry.set_connected_devices(0);
        self.inner.telemetry.set_collector_running(true);
        // Announce before any device discovered by the new session.
        self.publish(Event::CollectionStarted { scanning });

        let task = tokio::spawn(process_frames(
            frames,
            FrameProcessor::new(self.inner.plan.clone()),
            Arc::clone(&self.inner.state),
            self.inner.events.clone(),
            self.inner.telemetry.clone(),
        ));
        *session = Some(Session { node, task });
        Ok(())
    }

    /// Stop the node and wait for frame processing to finish. Stopping an idle
    /// collector is a no-op.
    ///
    /// The session lock is held until teardown completes, so a concurrent
    /// [`start`](Self::start) begins only after this session is fully closed.
    ///
    /// # Errors
    ///
    /// Returns [`CollectorError::Node`] when the node reports a failure while
    /// stopping; the session is torn down regardless.
    pub async fn stop(&self) -> CollectorResult<()> {
        let mut slot = self.inner.session.lock().await;
        let Some(mut session) = slot.take() else {
            debug!("stop requested while idle");
            return Ok(());
        };

        let stopped = session.node.stop().await;
        if stopped.is_err() {
            session.task.abort();
        }
        if let Err(err) = session.task.await
            && !err.is_cancelled()
        {
            warn!(error = %err, "frame processing task ended abnormally");
        }

        lock(&self.inner.state).devices.clear();
        self.inner.telemetry.set_connected_devices(0);
        self.inner.telemetry.set_collector_running(false);
        self.publish(Event::CollectionStopped);
        info!("metrics collection stopped");
        drop(slot);

        stopped.map_err(|source| CollectorError::Node {
            operation: "node.stop",
            source,
        })
    }

    /// Whether a session is active.
    pub async fn is_running(&self) -> bool {
        self.inner.session.lock().await.is_some()
    }

    /// Current metrics.
    pub async fn snapshot(&self) -> MetricsSnapshot {
        let running = self.is_running().await;
        let readings = lock(&self.inner.state).readings.clone();
        let settings = self.settings();
        build_snapshot(
            &readings,
            &settings,
            self.inner.default_circumference_m,
            running,
        )
    }

    /// Devices seen in the current session, in discovery order.
    #[must_use]
    pub fn devices(&self) -> Vec<DeviceSummary> {
        lock(&self.inner.state).devices.clone()
    }

    /// Current settings.
    #[must_use]
    pub fn settings(&self) -> MetricsSettings {
        *lock(&self.inner.settings)
    }

    /// Validate `update` and merge its present fields into the settings.
    ///
    /// # Errors
    ///
    /// Returns [`CollectorError::InvalidSettings`] when any present field is
    /// not strictly positive; nothing is applied in that case.
    pub fn update_settings(&self, update: MetricsSettings) -> CollectorResult<MetricsSettings> {
        update.validate()?;
        let merged = {
            let mut settings = lock(&self.inner.settings);
            *settings = settings.merged(update);
            *settings
        };
        let description = update.describe();
        info!(changes = %description, "metrics settings updated");
        self.publish(Event::SettingsChanged { description });
        Ok(merged)
    }
}

fn build_snapshot(
    readings: &Readings,
    settings: &MetricsSettings,
    default_circumference_m: f64,
    running: bool,
) -> MetricsSnapshot {
    let speed_circumference = settings
        .speed_wheel_circumference_m
        .unwrap_or(default_circumference_m);
    let distance_circumference = settings
        .distance_wheel_circumference_m
        .unwrap_or(default_circumference_m);

    let heart_rate_percent = readings
        .heart_rate
        .zip(settings.age)
        .and_then(|(bpm, age)| SportZone::percent_from_age(age, f64::from(bpm)));
    let zone = readings
        .heart_rate
        .map(|_| SportZone::from_hr_percent(heart_rate_percent));

    MetricsSnapshot {
        power: readings.power,
        speed: readings
            .wheel_rpm
            .map(|rpm| speed_kmh(rpm, speed_circumference)),
        cadence: readings.cadence,
        distance: readings.wheel_revolutions.map(|revs| {
            #[allow(clippy::cast_precision_loss)]
            let revs = revs as f64;
            revs * distance_circumference
        }),
        heart_rate: readings.heart_rate,
        heart_rate_percent,
        zone_name: zone.map(|zone| zone.label().to_string()),
        zone_value: zone.map(|zone| zone.value().to_string()),
        is_running: Some(running),
    }
}

async fn process_frames(
    mut frames: FrameReceiver,
    mut processor: FrameProcessor,
    state: Arc<Mutex<SessionState>>,
    events: EventBus,
    telemetry: Metrics,
) {
    while let Some(frame) = frames.recv().await {
        let (outcome, device_count) = {
            let mut guard = lock(&state);
            let outcome = processor.apply(&frame, &mut guard);
            (outcome, guard.devices.len())
        };
        match outcome {
            Ok(effect) => {
                if let Some(profile) = effect.profile {
                    telemetry.inc_sensor_page(profile.profile());
                }
                if let Some(device) = effect.new_device {
                    info!(
                        device_id = device.device_id,
                        device_type = device.device_type,
                        name = %device.name,
                        "found new device"
                    );
                    telemetry.set_connected_devices(device_count);
                    let event = Event::DeviceFound {
                        device_id: device.device_id,
                        device_type: device.device_type,
                        name: device.name,
                    };
                    telemetry.inc_event(event.kind());
                    let _ = events.publish(event);
                }
            }
            Err(err) => {
                telemetry.inc_sensor_frame_error();
                warn!(error = %err, "error processing device data update");
            }
        }
    }
    debug!("sensor frame stream closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::time::Duration;

    use antmon_sensors::{
        DeviceType, SensorError, SensorResult, SimulatedDevice, SimulatedNodeFactory,
    };
    use async_trait::async_trait;
    use tokio::sync::mpsc;
    use tokio::time::{sleep, timeout};

    use crate::sensor::SensorType;

    fn collector_with(factory: Arc<dyn NodeFactory>, sensors: Vec<SensorSpec>) -> MetricsCollector {
        MetricsCollector::new(
            factory,
            EventBus::new(),
            Metrics::new().expect("metrics"),
            CollectorOptions {
                sensors,
                default_circumference_m: 2.0,
            },
        )
    }

    fn simulated() -> Arc<dyn NodeFactory> {
        Arc::new(
            SimulatedNodeFactory::new(vec![
                SimulatedDevice::new(10936, DeviceType::HeartRate, 132.0),
                SimulatedDevice::new(10937, DeviceType::BikeSpeedCadence, 85.0),
                SimulatedDevice::new(10938, DeviceType::PowerMeter, 180.0),
            ])
            .with_period(Duration::from_millis(5)),
        )
    }

    async fn wait_for<F>(collector: &MetricsCollector, predicate: F) -> MetricsSnapshot
    where
        F: Fn(&MetricsSnapshot) -> bool,
    {
        timeout(Duration::from_secs(5), async {
            loop {
                let snapshot = collector.snapshot().await;
                if predicate(&snapshot) {
                    return snapshot;
                }
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("condition not reached")
    }

    #[tokio::test]
    async fn start_collects_and_stop_clears_devices() -> anyhow::Result<()> {
        let collector = collector_with(simulated(), Vec::new());
        let mut events = collector.inner.events.subscribe();

        collector.start().await?;
        assert!(matches!(
            collector.start().await,
            Err(CollectorError::AlreadyRunning)
        ));

        let snapshot = wait_for(&collector, |s| {
            s.heart_rate.is_some() && s.power.is_some() && s.cadence.is_some()
        })
        .await;
        assert_eq!(snapshot.is_running, Some(true));
        assert_eq!(collector.devices().len(), 3);

        let first = events.next().await.expect("event");
        assert_eq!(first.event, Event::CollectionStarted { scanning: true });

        collector.stop().await?;
        collector.stop().await?;
        assert!(!collector.is_running().await);
        assert!(collector.devices().is_empty());
        assert_eq!(collector.snapshot().await.is_running, Some(false));
        Ok(())
    }

    #[tokio::test]
    async fn requested_sensors_limit_devices() -> anyhow::Result<()> {
        let collector = collector_with(
            simulated(),
            vec![SensorSpec {
                device_id: 10936,
                sensor_type: SensorType::HeartRate,
            }],
        );
        collector.start().await?;
        wait_for(&collector, |s| s.heart_rate.is_some()).await;
        sleep(Duration::from_millis(50)).await;
        let devices = collector.devices();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].device_id, 10936);
        assert!(collector.snapshot().await.power.is_none());
        collector.stop().await?;
        Ok(())
    }

    #[tokio::test]
    async fn restart_resets_readings() -> anyhow::Result<()> {
        let busy = SimulatedNodeFactory::new(vec![
            SimulatedDevice::new(10936, DeviceType::HeartRate, 132.0),
            SimulatedDevice::new(10938, DeviceType::PowerMeter, 180.0),
        ])
        .with_period(Duration::from_millis(5))
        .create();
        let factory = SequenceFactory::new(vec![busy, Box::new(QuietNode::default())]);
        let collector = collector_with(Arc::new(factory), Vec::new());

        collector.start().await?;
        wait_for(&collector, |s| s.heart_rate.is_some() && s.power.is_some()).await;
        collector.stop().await?;
        let stale = collector.snapshot().await;
        assert!(stale.heart_rate.is_some());
        assert!(stale.power.is_some());

        collector.start().await?;
        sleep(Duration::from_millis(30)).await;
        let fresh = collector.snapshot().await;
        assert_eq!(fresh.is_running, Some(true));
        assert_eq!(fresh.heart_rate, None);
        assert_eq!(fresh.power, None);
        assert_eq!(fresh.cadence, None);
        assert_eq!(fresh.distance, None);
        assert!(collector.devices().is_empty());
        collector.stop().await?;
        Ok(())
    }

    #[tokio::test]
    async fn start_during_slow_stop_waits_for_teardown() -> anyhow::Result<()> {
        let factory = SequenceFactory::new(vec![
            Box::new(QuietNode::stopping_after(Duration::from_millis(150))),
            Box::new(QuietNode::default()),
        ]);
        let collector = collector_with(Arc::new(factory), Vec::new());
        let mut events = collector.inner.events.subscribe();
        collector.start().await?;

        let stopping = tokio::spawn({
            let collector = collector.clone();
            async move { collector.stop().await }
        });
        // Let the stop take the session and block inside the node.
        sleep(Duration::from_millis(30)).await;
        collector.start().await?;
        stopping.await??;

        assert!(collector.is_running().await);
        assert!(collector.inner.telemetry.snapshot().collector_running);
        let mut kinds = Vec::new();
        for _ in 0..3 {
            let envelope = timeout(Duration::from_secs(1), events.next())
                .await?
                .expect("event");
            kinds.push(envelope.event.kind());
        }
        assert_eq!(
            kinds,
            vec!["collection_started", "collection_stopped", "collection_started"]
        );
        collector.stop().await?;
        Ok(())
    }

    /// Node that never produces frames; its stop can be made slow.
    #[derive(Default)]
    struct QuietNode {
        frames: Option<mpsc::Sender<Vec<u8>>>,
        stop_delay: Duration,
    }

    impl QuietNode {
        fn stopping_after(stop_delay: Duration) -> Self {
            Self {
                frames: None,
                stop_delay,
            }
        }
    }

    #[async_trait]
    impl SensorNode for QuietNode {
        fn name(&self) -> &'static str {
            "quiet"
        }

        async fn start(&mut self, _plan: &ScanPlan) -> SensorResult<FrameReceiver> {
            let (sender, receiver) = mpsc::channel(8);
            self.frames = Some(sender);
            Ok(receiver)
        }

        async fn stop(&mut self) -> SensorResult<()> {
            sleep(self.stop_delay).await;
            self.frames = None;
            Ok(())
        }
    }

    /// Hands out prepared nodes in order, then quiet ones.
    struct SequenceFactory {
        nodes: Mutex<VecDeque<Box<dyn SensorNode>>>,
    }

    impl SequenceFactory {
        fn new(nodes: Vec<Box<dyn SensorNode>>) -> Self {
            Self {
                nodes: Mutex::new(nodes.into()),
            }
        }
    }

    impl NodeFactory for SequenceFactory {
        fn create(&self) -> Box<dyn SensorNode> {
            lock(&self.nodes)
                .pop_front()
                .unwrap_or_else(|| Box::new(QuietNode::default()))
        }
    }

    struct FailingNode;

    #[async_trait]
    impl SensorNode for FailingNode {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn start(&mut self, _plan: &ScanPlan) -> SensorResult<FrameReceiver> {
            Err(SensorError::Node {
                operation: "usb.open",
                detail: "no device".to_string(),
            })
        }

        async fn stop(&mut self) -> SensorResult<()> {
            Ok(())
        }
    }

    struct FailingFactory;

    impl NodeFactory for FailingFactory {
        fn create(&self) -> Box<dyn SensorNode> {
            Box::new(FailingNode)
        }
    }

    #[tokio::test]
    async fn node_failure_leaves_collector_idle() {
        let collector = collector_with(Arc::new(FailingFactory), Vec::new());
        let err = collector.start().await.expect_err("start must fail");
        assert!(matches!(
            err,
            CollectorError::Node {
                operation: "node.start",
                ..
            }
        ));
        assert!(!collector.is_running().await);
    }

    #[tokio::test]
    async fn settings_merge_and_reject_invalid_values() {
        let collector = collector_with(simulated(), Vec::new());
        let mut events = collector.inner.events.subscribe();

        let merged = collector
            .update_settings(MetricsSettings {
                age: Some(40),
                ..MetricsSettings::default()
            })
            .expect("valid settings");
        assert_eq!(merged.age, Some(40));

        let err = collector
            .update_settings(MetricsSettings {
                age: Some(0),
                speed_wheel_circumference_m: Some(2.2),
                ..MetricsSettings::default()
            })
            .expect_err("age must be positive");
        assert!(matches!(err, CollectorError::InvalidSettings { .. }));
        assert_eq!(collector.settings().speed_wheel_circumference_m, None);

        let envelope = events.next().await.expect("settings event");
        assert_eq!(envelope.event.kind(), "settings_changed");
    }

    #[test]
    fn snapshot_derives_speed_distance_and_zone() {
        let readings = Readings {
            power: Some(200.0),
            cadence: Some(90.0),
            wheel_rpm: Some(60.0),
            wheel_revolutions: Some(10),
            heart_rate: Some(135),
        };
        let settings = MetricsSettings {
            speed_wheel_circumference_m: Some(2.0),
            distance_wheel_circumference_m: None,
            age: Some(40),
        };
        let snapshot = build_snapshot(&readings, &settings, 1.5, true);
        // one revolution per second at 2 m is 7.2 km/h
        assert!((snapshot.speed.unwrap_or_default() - 7.2).abs() < 1e-9);
        assert_eq!(snapshot.distance, Some(15.0));
        assert_eq!(snapshot.heart_rate_percent, Some(75.0));
        assert_eq!(snapshot.zone_name.as_deref(), Some("ZONE 3"));
        assert_eq!(snapshot.zone_value.as_deref(), Some("Moderate"));
    }

    #[test]
    fn snapshot_without_heart_rate_has_no_zone() {
        let snapshot = build_snapshot(
            &Readings::default(),
            &MetricsSettings::default(),
            0.141,
            false,
        );
        assert!(snapshot.zone_name.is_none());
        assert!(snapshot.speed.is_none());
        assert_eq!(snapshot.is_running, Some(false));
    }
}

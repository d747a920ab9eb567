//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! Each [`Metrics`] owns its own registry, so tests and embedded servers never
//! collide on metric names.

use std::sync::Arc;

use prometheus::core::Collector;
use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    http_requests_total: IntCounterVec,
    events_emitted_total: IntCounterVec,
    sensor_pages_total: IntCounterVec,
    sensor_frame_errors_total: IntCounter,
    connected_devices: IntGauge,
    stream_clients: IntGauge,
    collector_running: IntGauge,
}

/// Snapshot of selected gauges and counters for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct TelemetrySnapshot {
    /// Devices registered in the current collection session.
    pub connected_devices: i64,
    /// Open server-sent event streams.
    pub stream_clients: i64,
    /// Frames that failed to decode since start-up.
    pub sensor_frame_errors_total: u64,
    /// Whether the collector is currently running.
    pub collector_running: bool,
}

/// Build a collector from `name`/`help` and register it.
fn install<C, F>(registry: &Registry, name: &'static str, help: &str, build: F) -> Result<C>
where
    C: Collector + Clone + 'static,
    F: FnOnce(Opts) -> prometheus::Result<C>,
{
    let collector = build(Opts::new(name, help)).map_err(|source| TelemetryError::Metric {
        name,
        operation: "metric.build",
        source,
    })?;
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::Metric {
            name,
            operation: "metric.register",
            source,
        })?;
    Ok(collector)
}

impl Metrics {
    /// Create an isolated registry holding every service metric.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::Metric`] if a collector cannot be built or registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let inner = MetricsInner {
            http_requests_total: install(
                &registry,
                "http_requests_total",
                "Total HTTP requests received",
                |opts| IntCounterVec::new(opts, &["route", "code"]),
            )?,
            events_emitted_total: install(
                &registry,
                "events_emitted_total",
                "Domain events emitted by type",
                |opts| IntCounterVec::new(opts, &["type"]),
            )?,
            sensor_pages_total: install(
                &registry,
                "sensor_pages_total",
                "ANT+ data pages processed by device profile",
                |opts| IntCounterVec::new(opts, &["profile"]),
            )?,
            sensor_frame_errors_total: install(
                &registry,
                "sensor_frame_errors_total",
                "Frames from the sensor node that failed to decode",
                IntCounter::with_opts,
            )?,
            connected_devices: install(
                &registry,
                "connected_devices",
                "Devices registered in the current collection session",
                IntGauge::with_opts,
            )?,
            stream_clients: install(
                &registry,
                "stream_clients",
                "Open server-sent event streams",
                IntGauge::with_opts,
            )?,
            collector_running: install(
                &registry,
                "collector_running",
                "1 while metrics collection is running",
                IntGauge::with_opts,
            )?,
            registry,
        };
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Increment the HTTP request counter for the given route and status code.
    pub fn inc_http_request(&self, route: &str, status: u16) {
        self.inner
            .http_requests_total
            .with_label_values(&[route, &status.to_string()])
            .inc();
    }

    /// Increment the emitted event counter for the specific event type.
    pub fn inc_event(&self, event_type: &str) {
        self.inner
            .events_emitted_total
            .with_label_values(&[event_type])
            .inc();
    }

    /// Count one processed data page for the named device profile.
    pub fn inc_sensor_page(&self, profile: &str) {
        self.inner
            .sensor_pages_total
            .with_label_values(&[profile])
            .inc();
    }

    /// Count one frame that could not be decoded.
    pub fn inc_sensor_frame_error(&self) {
        self.inner.sensor_frame_errors_total.inc();
    }

    /// Set the registered device gauge.
    pub fn set_connected_devices(&self, count: usize) {
        self.inner
            .connected_devices
            .set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    /// Record that a stream client connected.
    pub fn inc_stream_clients(&self) {
        self.inner.stream_clients.inc();
    }

    /// Record that a stream client disconnected.
    pub fn dec_stream_clients(&self) {
        self.inner.stream_clients.dec();
    }

    /// Flip the collector running gauge.
    pub fn set_collector_running(&self, running: bool) {
        self.inner.collector_running.set(i64::from(running));
    }

    /// Render every metric in the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::Render`] if encoding fails.
    pub fn render(&self) -> Result<String> {
        TextEncoder::new()
            .encode_to_string(&self.inner.registry.gather())
            .map_err(|source| TelemetryError::Render { source })
    }

    /// Take a point-in-time snapshot of the most relevant gauges and counters.
    #[must_use]
    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            connected_devices: self.inner.connected_devices.get(),
            stream_clients: self.inner.stream_clients.get(),
            sensor_frame_errors_total: self.inner.sensor_frame_errors_total.get(),
            collector_running: self.inner.collector_running.get() > 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_snapshot_reflects_updates() -> Result<()> {
        let metrics = Metrics::new()?;
        metrics.inc_http_request("/health", 200);
        metrics.inc_event("device_found");
        metrics.inc_sensor_page("heart_rate");
        metrics.inc_sensor_frame_error();
        metrics.set_connected_devices(3);
        metrics.inc_stream_clients();
        metrics.inc_stream_clients();
        metrics.dec_stream_clients();
        metrics.set_collector_running(true);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.connected_devices, 3);
        assert_eq!(snapshot.stream_clients, 1);
        assert_eq!(snapshot.sensor_frame_errors_total, 1);
        assert!(snapshot.collector_running);

        let rendered = metrics.render()?;
        assert!(rendered.contains("http_requests_total"));
        assert!(rendered.contains("sensor_pages_total{profile=\"heart_rate\"} 1"));
        assert!(rendered.contains("connected_devices 3"));
        Ok(())
    }

    #[test]
    fn registries_are_independent() -> Result<()> {
        let first = Metrics::new()?;
        let second = Metrics::new()?;
        first.set_connected_devices(2);
        assert_eq!(second.snapshot().connected_devices, 0);
        Ok(())
    }
}

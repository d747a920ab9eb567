//! Server-sent event streams for metrics and devices.
//!
//! Both streams emit unnamed `data:` events so browser `onmessage` handlers
//! receive them. The metrics stream polls the collector on a fixed interval;
//! the devices stream re-sends the full list whenever the event bus reports a
//! change to it. Both end when the server starts shutting down.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use antmon_core::{DeviceSummary, MetricsCollector, MetricsSnapshot};
use antmon_events::EventStream;
use antmon_telemetry::Metrics;
use async_stream::stream;
use axum::{
    extract::State,
    response::sse::{self, Sse},
};
use futures_util::StreamExt;
use serde_json::json;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error};

use crate::http::constants::SSE_KEEP_ALIVE_SECS;
use crate::state::{ApiState, ShutdownSignal};

/// Keeps the open-stream gauge accurate for the lifetime of one client.
pub(crate) struct StreamClientGuard {
    telemetry: Metrics,
}

impl StreamClientGuard {
    pub(crate) fn register(telemetry: Metrics) -> Self {
        telemetry.inc_stream_clients();
        Self { telemetry }
    }
}

impl Drop for StreamClientGuard {
    fn drop(&mut self) {
        self.telemetry.dec_stream_clients();
        debug!("stream client disconnected");
    }
}

pub(crate) async fn stream_metrics(
    State(state): State<Arc<ApiState>>,
) -> Sse<impl futures_core::Stream<Item = Result<sse::Event, Infallible>> + Send> {
    let guard = StreamClientGuard::register(state.telemetry.clone());
    let payloads = metrics_payloads(state.collector.clone(), state.stream_interval, guard);
    into_sse(until_shutdown(payloads, state.shutdown.clone()))
}

pub(crate) async fn stream_devices(
    State(state): State<Arc<ApiState>>,
) -> Sse<impl futures_core::Stream<Item = Result<sse::Event, Infallible>> + Send> {
    let guard = StreamClientGuard::register(state.telemetry.clone());
    // Subscribe before the first read so no change slips between the two.
    let subscription = state.events.subscribe();
    let payloads = device_payloads(state.collector.clone(), subscription, guard);
    into_sse(until_shutdown(payloads, state.shutdown.clone()))
}

fn into_sse<S>(
    payloads: S,
) -> Sse<impl futures_core::Stream<Item = Result<sse::Event, Infallible>> + Send>
where
    S: futures_core::Stream<Item = String> + Send + 'static,
{
    let events = payloads.map(|payload| Ok(sse::Event::default().data(payload)));
    Sse::new(events).keep_alive(
        sse::KeepAlive::new()
            .interval(Duration::from_secs(SSE_KEEP_ALIVE_SECS))
            .text("keep-alive"),
    )
}

/// End `payloads` once `shutdown` fires.
pub(crate) fn until_shutdown<S>(
    payloads: S,
    shutdown: ShutdownSignal,
) -> impl futures_core::Stream<Item = String> + Send + 'static
where
    S: futures_core::Stream<Item = String> + Send + 'static,
{
    payloads.take_until(shutdown.triggered())
}

/// Snapshot JSON every `period`, starting immediately.
pub(crate) fn metrics_payloads(
    collector: MetricsCollector,
    period: Duration,
    guard: StreamClientGuard,
) -> impl futures_core::Stream<Item = String> + Send {
    stream! {
        let _guard = guard;
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let snapshot = collector.snapshot().await;
            yield metrics_payload(&snapshot);
        }
    }
}

/// The device list on connect, then again after every device-affecting event.
pub(crate) fn device_payloads(
    collector: MetricsCollector,
    mut subscription: EventStream,
    guard: StreamClientGuard,
) -> impl futures_core::Stream<Item = String> + Send {
    stream! {
        let _guard = guard;
        yield device_payload(&collector.devices());
        while let Some(envelope) = subscription.next().await {
            if envelope.event.affects_devices() {
                yield device_payload(&collector.devices());
            }
        }
    }
}

fn metrics_payload(snapshot: &MetricsSnapshot) -> String {
    serde_json::to_string(snapshot).unwrap_or_else(|err| {
        error!(error = %err, "failed to serialise metrics snapshot");
        error_payload(&err.to_string())
    })
}

fn device_payload(devices: &[DeviceSummary]) -> String {
    serde_json::to_string(devices).unwrap_or_else(|err| {
        error!(error = %err, "failed to serialise device list");
        error_payload(&err.to_string())
    })
}

fn error_payload(message: &str) -> String {
    json!({ "error": message }).to_string()
}

//! Shared handler state.

use std::time::Duration;

use antmon_config::ApiConfig;
use antmon_core::MetricsCollector;
use antmon_events::EventBus;
use antmon_telemetry::Metrics;
use tokio::sync::watch;

pub(crate) struct ApiState {
    pub(crate) collector: MetricsCollector,
    pub(crate) events: EventBus,
    pub(crate) telemetry: Metrics,
    pub(crate) stream_interval: Duration,
    pub(crate) client_config: ApiConfig,
    pub(crate) shutdown: ShutdownSignal,
}

impl ApiState {
    pub(crate) fn new(
        collector: MetricsCollector,
        events: EventBus,
        telemetry: Metrics,
        stream_interval: Duration,
        client_config: ApiConfig,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            collector,
            events,
            telemetry,
            stream_interval,
            client_config,
            shutdown,
        }
    }
}

/// Fires once the server begins a graceful shutdown.
///
/// Long-lived responses watch it so the server can finish draining.
#[derive(Clone)]
pub(crate) struct ShutdownSignal {
    receiver: watch::Receiver<bool>,
}

impl ShutdownSignal {
    pub(crate) fn channel() -> (watch::Sender<bool>, Self) {
        let (sender, receiver) = watch::channel(false);
        (sender, Self { receiver })
    }

    /// Resolves when shutdown starts; never resolves if the sender is dropped first.
    pub(crate) async fn triggered(mut self) {
        let fired = self.receiver.wait_for(|stopping| *stopping).await.is_ok();
        if !fired {
            std::future::pending::<()>().await;
        }
    }
}

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{AppError, AppResult};
use antmon_api::ApiServer;
use antmon_config::{AppConfig, LoadedConfig, load_from_env};
use antmon_core::{CollectorOptions, MetricsCollector, simulated_devices};
use antmon_events::EventBus;
use antmon_sensors::{NodeFactory, SimulatedNodeFactory};
use antmon_telemetry::{GlobalContextGuard, LogFormat, LoggingConfig, Metrics, init_logging};
use tracing::{info, warn};

/// Build identifier stamped into every log line.
const BUILD_SHA: &str = match option_env!("ANTMON_BUILD_SHA") {
    Some(sha) => sha,
    None => "dev",
};

pub(crate) struct BootstrapDependencies {
    config: AppConfig,
    config_source: Option<PathBuf>,
    events: EventBus,
    telemetry: Metrics,
    collector: MetricsCollector,
}

impl BootstrapDependencies {
    /// Construct production dependencies from the environment for the binary entrypoint.
    pub(crate) fn from_env() -> AppResult<Self> {
        let LoadedConfig { config, source } =
            load_from_env().map_err(|err| AppError::config("config.load", err))?;
        Self::from_config(config, source)
    }

    /// Wire the event bus, telemetry, simulated node factory and collector for `config`.
    pub(crate) fn from_config(
        config: AppConfig,
        config_source: Option<PathBuf>,
    ) -> AppResult<Self> {
        let events = EventBus::new();
        let telemetry =
            Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;

        let factory: Arc<dyn NodeFactory> = Arc::new(SimulatedNodeFactory::new(
            simulated_devices(&config.simulator),
        ));
        let collector = MetricsCollector::new(
            factory,
            events.clone(),
            telemetry.clone(),
            CollectorOptions::from_config(&config.collector),
        );

        Ok(Self {
            config,
            config_source,
            events,
            telemetry,
            collector,
        })
    }
}

/// Entry point for the antmon service boot sequence.
///
/// Serves the API until Ctrl-C, then stops any running collection.
///
/// # Errors
///
/// Returns an error if configuration, logging, or the API listener fail.
pub async fn run_app() -> AppResult<()> {
    let dependencies = BootstrapDependencies::from_env()?;
    run_app_with(dependencies, shutdown_signal()).await
}

/// Boot sequence that relies entirely on injected dependencies to simplify testing.
pub(crate) async fn run_app_with<F>(
    dependencies: BootstrapDependencies,
    shutdown: F,
) -> AppResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let logging = &dependencies.config.logging;
    let format = LogFormat::resolve(logging.format.as_deref())
        .map_err(|err| AppError::telemetry("telemetry.log_format", err))?;
    init_logging(&LoggingConfig {
        level: &logging.level,
        format,
        build_sha: BUILD_SHA,
    })
    .map_err(|err| AppError::telemetry("telemetry.init", err))?;
    let _context = GlobalContextGuard::new("bootstrap");

    info!("antmon bootstrap starting");
    serve(dependencies, shutdown).await
}

async fn serve<F>(dependencies: BootstrapDependencies, shutdown: F) -> AppResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let BootstrapDependencies {
        config,
        config_source,
        events,
        telemetry,
        collector,
    } = dependencies;

    match config_source {
        Some(path) => info!(path = %path.display(), "configuration loaded"),
        None => info!("no configuration file; using defaults"),
    }

    let api = ApiServer::new(
        collector.clone(),
        events,
        telemetry,
        Duration::from_millis(config.collector.stream_interval_ms),
    );

    let addr = config.server.socket_addr();
    info!(addr = %addr, "Launching API listener");
    let serve_result = api.serve_with_shutdown(addr, shutdown).await;

    // Stop on every exit path, a failed bind included.
    let stop_result = collector.stop().await;

    serve_result.map_err(|err| AppError::api_server("api_server.serve", err))?;
    stop_result.map_err(|err| AppError::collector("collector.stop", err))?;
    info!("API server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to install Ctrl-C handler; serving until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

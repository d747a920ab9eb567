//! Router construction and server host for the API.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use antmon_config::{
    ApiConfig, DEVICES_PATH, Endpoint, HEALTH_PATH, METRICS_PATH, PROMETHEUS_PATH,
    WELL_KNOWN_PATH,
};
use antmon_core::MetricsCollector;
use antmon_events::EventBus;
use antmon_telemetry::{Metrics, build_sha};
use axum::{
    Router,
    http::{Method, Request, header::CONTENT_TYPE},
    routing::{get, post},
};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{Span, info};

use crate::error::{ApiServerError, ApiServerResult};
use crate::http::constants::HEADER_REQUEST_ID;
use crate::http::health::{health, metrics};
use crate::http::metrics::{get_devices, get_metrics, start_metrics, stop_metrics};
use crate::http::settings::{get_settings, update_settings};
use crate::http::sse::{stream_devices, stream_metrics};
use crate::http::telemetry::RequestMetricsLayer;
use crate::http::well_known::well_known;
use crate::state::{ApiState, ShutdownSignal};

/// Axum router wrapper that hosts the metrics API.
pub struct ApiServer {
    router: Router,
    streams_shutdown: watch::Sender<bool>,
}

impl ApiServer {
    /// Construct the server, publishing the process-wide same-origin record
    /// on the well-known endpoint.
    #[must_use]
    pub fn new(
        collector: MetricsCollector,
        events: EventBus,
        telemetry: Metrics,
        stream_interval: Duration,
    ) -> Self {
        Self::with_client_config(
            collector,
            events,
            telemetry,
            stream_interval,
            ApiConfig::global().clone(),
        )
    }

    /// Construct the server with an explicit client configuration record.
    #[must_use]
    pub fn with_client_config(
        collector: MetricsCollector,
        events: EventBus,
        telemetry: Metrics,
        stream_interval: Duration,
        client_config: ApiConfig,
    ) -> Self {
        let (streams_shutdown, shutdown) = ShutdownSignal::channel();
        let state = Arc::new(ApiState::new(
            collector,
            events,
            telemetry.clone(),
            stream_interval,
            client_config,
            shutdown,
        ));
        let cors_layer = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
            .allow_headers([CONTENT_TYPE]);
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &Request<_>| {
                let method = request.method().clone();
                let uri_path = request.uri().path();
                let request_id = request
                    .headers()
                    .get(HEADER_REQUEST_ID)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("")
                    .to_string();

                tracing::info_span!(
                    "http.request",
                    method = %method,
                    route = %uri_path,
                    request_id = %request_id,
                    build_sha = %build_sha(),
                    status_code = tracing::field::Empty,
                    latency_ms = tracing::field::Empty
                )
            })
            .on_request(|_request: &Request<_>, _span: &Span| {})
            .on_response(
                |response: &axum::response::Response, latency: Duration, span: &Span| {
                    let status = response.status().as_u16();
                    span.record("status_code", status);
                    let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
                    span.record("latency_ms", latency_ms);
                },
            );
        // Outermost first: generate the id, then echo it on the response.
        let layered = ServiceBuilder::new()
            .layer(antmon_telemetry::set_request_id_layer())
            .layer(antmon_telemetry::propagate_request_id_layer())
            .layer(trace_layer)
            .layer(RequestMetricsLayer::new(telemetry));

        let router = Self::routes()
            .layer(cors_layer)
            .route_layer(layered)
            .with_state(state);

        Self {
            router,
            streams_shutdown,
        }
    }

    fn routes() -> Router<Arc<ApiState>> {
        Router::new()
            .route(HEALTH_PATH, get(health))
            .route(PROMETHEUS_PATH, get(metrics))
            .route(WELL_KNOWN_PATH, get(well_known))
            .route(METRICS_PATH, get(get_metrics))
            .route(DEVICES_PATH, get(get_devices))
            .route(Endpoint::StartMetrics.path(), post(start_metrics))
            .route(Endpoint::StopMetrics.path(), post(stop_metrics))
            // getSettings and updateSettings share one path.
            .route(
                Endpoint::GetSettings.path(),
                get(get_settings)
                    .put(update_settings)
                    .post(update_settings),
            )
            .route(Endpoint::MetricsStream.path(), get(stream_metrics))
            .route(Endpoint::DevicesStream.path(), get(stream_devices))
    }

    /// Serve the API using the configured router on the supplied address.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener fails to bind or the server terminates unexpectedly.
    pub async fn serve(self, addr: SocketAddr) -> ApiServerResult<()> {
        self.serve_with_shutdown(addr, std::future::pending()).await
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener fails to bind or the server terminates unexpectedly.
    pub async fn serve_with_shutdown<F>(self, addr: SocketAddr, shutdown: F) -> ApiServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!("Starting API on {}", addr);
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ApiServerError::Bind { addr, source })?;
        self.serve_on(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    ///
    /// Open event streams end as soon as `shutdown` resolves so the drain
    /// only waits for ordinary requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the server terminates unexpectedly.
    pub async fn serve_on<F>(self, listener: TcpListener, shutdown: F) -> ApiServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Self {
            router,
            streams_shutdown,
        } = self;
        let signal = async move {
            shutdown.await;
            info!(
                open_streams = streams_shutdown.receiver_count().saturating_sub(1),
                "shutdown requested; closing event streams"
            );
            streams_shutdown.send_replace(true);
        };
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(signal)
            .await
            .map_err(|source| ApiServerError::Serve { source })
    }

    /// The assembled router, for in-process requests.
    #[must_use]
    pub fn into_router(self) -> Router {
        self.router
    }
}

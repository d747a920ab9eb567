//! In-process HTTP tests driving the router with `tower::ServiceExt::oneshot`.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use antmon_api::ApiServer;
use antmon_api::models::{HealthResponse, MessageResponse, ProblemDetails};
use antmon_config::{ApiConfig, ApiProfile};
use antmon_core::{
    CollectorOptions, DeviceSummary, MetricsCollector, MetricsSettings, MetricsSnapshot,
};
use antmon_events::EventBus;
use antmon_sensors::{DeviceType, SimulatedDevice, SimulatedNodeFactory};
use antmon_telemetry::Metrics;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::time::{sleep, timeout};
use tower::ServiceExt;

struct Harness {
    router: Router,
    collector: MetricsCollector,
    telemetry: Metrics,
}

struct Parts {
    server: ApiServer,
    collector: MetricsCollector,
    telemetry: Metrics,
}

fn parts() -> Result<Parts> {
    let events = EventBus::new();
    let telemetry = Metrics::new()?;
    let factory = SimulatedNodeFactory::new(vec![
        SimulatedDevice::new(11, DeviceType::HeartRate, 150.0),
        SimulatedDevice::new(22, DeviceType::PowerMeter, 200.0),
    ])
    .with_period(Duration::from_millis(20));
    let collector = MetricsCollector::new(
        Arc::new(factory),
        events.clone(),
        telemetry.clone(),
        CollectorOptions {
            sensors: Vec::new(),
            default_circumference_m: 2.1,
        },
    );
    let client_config = ApiConfig::resolve(ApiProfile::SameOrigin, |_| None);
    let server = ApiServer::with_client_config(
        collector.clone(),
        events,
        telemetry.clone(),
        Duration::from_millis(50),
        client_config,
    );
    Ok(Parts {
        server,
        collector,
        telemetry,
    })
}

fn harness() -> Result<Harness> {
    let Parts {
        server,
        collector,
        telemetry,
    } = parts()?;
    Ok(Harness {
        router: server.into_router(),
        collector,
        telemetry,
    })
}

async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> Result<axum::response::Response> {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let response = router.clone().oneshot(builder.body(body)?).await?;
    Ok(response)
}

async fn read_json<T: DeserializeOwned>(response: axum::response::Response) -> Result<T> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    serde_json::from_slice(&bytes).context("response body is not the expected JSON")
}

#[tokio::test]
async fn start_stop_lifecycle() -> Result<()> {
    let harness = harness()?;

    let response = send(&harness.router, Method::POST, "/metrics/start", None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: MessageResponse = read_json(response).await?;
    assert_eq!(body.message, "Metrics collection started");

    let response = send(&harness.router, Method::POST, "/metrics/start", None).await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let problem: ProblemDetails = read_json(response).await?;
    assert_eq!(problem.status, 409);
    assert_eq!(problem.kind, "https://antmon.dev/problems/conflict");

    let response = send(&harness.router, Method::GET, "/health", None).await?;
    let health: HealthResponse = read_json(response).await?;
    assert!(health.running);

    let response = send(&harness.router, Method::POST, "/metrics/stop", None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: MessageResponse = read_json(response).await?;
    assert_eq!(body.message, "Metrics collection stopped");

    // Stopping twice is harmless.
    let response = send(&harness.router, Method::POST, "/metrics/stop", None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!harness.collector.is_running().await);
    Ok(())
}

#[tokio::test]
async fn readings_and_devices_are_served() -> Result<()> {
    let harness = harness()?;
    send(&harness.router, Method::POST, "/metrics/start", None).await?;

    let mut devices = Vec::new();
    for _ in 0..50 {
        let response = send(&harness.router, Method::GET, "/metrics/devices", None).await?;
        devices = read_json::<Vec<DeviceSummary>>(response).await?;
        if devices.len() == 2 {
            break;
        }
        sleep(Duration::from_millis(20)).await;
    }
    let mut ids: Vec<u16> = devices.iter().map(|device| device.device_id).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![11, 22]);

    let response = send(&harness.router, Method::GET, "/metrics", None).await?;
    let snapshot: MetricsSnapshot = read_json(response).await?;
    assert_eq!(snapshot.is_running, Some(true));
    assert!(snapshot.heart_rate.is_some());

    harness.collector.stop().await?;
    Ok(())
}

#[tokio::test]
async fn settings_merge_and_validate() -> Result<()> {
    let harness = harness()?;

    let response = send(
        &harness.router,
        Method::PUT,
        "/metrics/settings",
        Some(json!({ "age": 40 })),
    )
    .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        &harness.router,
        Method::POST,
        "/metrics/settings",
        Some(json!({ "speed_wheel_circumference_m": 2.096 })),
    )
    .await?;
    let merged: MetricsSettings = read_json(response).await?;
    assert_eq!(merged.age, Some(40));
    assert_eq!(merged.speed_wheel_circumference_m, Some(2.096));

    let response = send(
        &harness.router,
        Method::PUT,
        "/metrics/settings",
        Some(json!({ "age": 0, "distance_wheel_circumference_m": -1.0 })),
    )
    .await?;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let problem: ProblemDetails = read_json(response).await?;
    let pointers: Vec<String> = problem
        .invalid_params
        .unwrap_or_default()
        .into_iter()
        .map(|param| param.pointer)
        .collect();
    assert_eq!(pointers, vec!["/distance_wheel_circumference_m", "/age"]);

    let response = send(&harness.router, Method::GET, "/metrics/settings", None).await?;
    let current: MetricsSettings = read_json(response).await?;
    assert_eq!(current, merged);
    Ok(())
}

#[tokio::test]
async fn well_known_serves_the_same_origin_record() -> Result<()> {
    let harness = harness()?;
    let response = send(&harness.router, Method::GET, "/.well-known/antmon.json", None).await?;
    let body: Value = read_json(response).await?;
    assert_eq!(body["baseUrl"], "");
    assert_eq!(body["endpoints"]["devicesStream"], "/metrics/devices/stream");
    Ok(())
}

#[tokio::test]
async fn metrics_stream_emits_data_events() -> Result<()> {
    let harness = harness()?;
    let response = send(&harness.router, Method::GET, "/metrics/stream", None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok()),
        Some("text/event-stream")
    );

    let mut body = response.into_body().into_data_stream();
    let chunk = timeout(Duration::from_secs(1), body.next())
        .await?
        .context("stream ended")??;
    let text = String::from_utf8(chunk.to_vec())?;
    assert!(text.starts_with("data: {"), "unexpected frame: {text}");
    assert!(text.contains("\"is_running\":false"));
    assert_eq!(harness.telemetry.snapshot().stream_clients, 1);

    drop(body);
    assert_eq!(harness.telemetry.snapshot().stream_clients, 0);
    Ok(())
}

#[tokio::test]
async fn prometheus_exposition_counts_requests() -> Result<()> {
    let harness = harness()?;
    send(&harness.router, Method::GET, "/health", None).await?;

    let response = send(&harness.router, Method::GET, "/telemetry/metrics", None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let text = String::from_utf8(bytes.to_vec())?;
    assert!(text.contains("http_requests_total"));
    assert!(text.contains("route=\"/health\""));
    Ok(())
}

#[tokio::test]
async fn responses_carry_a_generated_request_id() -> Result<()> {
    let harness = harness()?;
    let response = send(&harness.router, Method::GET, "/health", None).await?;
    let id = response
        .headers()
        .get("x-request-id")
        .context("generated request id is echoed")?
        .to_str()?;
    assert!(uuid_like(id), "unexpected request id {id}");
    Ok(())
}

#[tokio::test]
async fn client_request_id_is_echoed_verbatim() -> Result<()> {
    let harness = harness()?;
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "dash-0042")
        .body(Body::empty())?;
    let response = harness.router.clone().oneshot(request).await?;
    assert_eq!(
        response
            .headers()
            .get("x-request-id")
            .and_then(|value| value.to_str().ok()),
        Some("dash-0042")
    );
    Ok(())
}

fn uuid_like(value: &str) -> bool {
    value.len() == 36
        && value
            .chars()
            .all(|ch| ch == '-' || ch.is_ascii_hexdigit())
}

#[tokio::test]
async fn graceful_shutdown_closes_open_event_streams() -> Result<()> {
    let Parts {
        server, telemetry, ..
    } = parts()?;
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
    let addr = listener.local_addr()?;
    let (stop, stopped) = oneshot::channel::<()>();
    let serving = tokio::spawn(server.serve_on(listener, async move {
        let _ = stopped.await;
    }));

    let mut client = TcpStream::connect(addr).await?;
    client
        .write_all(
            b"GET /metrics/stream HTTP/1.1\r\nHost: localhost\r\nAccept: text/event-stream\r\n\r\n",
        )
        .await?;
    let mut buf = vec![0_u8; 4096];
    let read = timeout(Duration::from_secs(2), client.read(&mut buf))
        .await
        .context("no response head")??;
    assert!(String::from_utf8_lossy(&buf[..read]).starts_with("HTTP/1.1 200"));
    assert_eq!(telemetry.snapshot().stream_clients, 1);

    let _ = stop.send(());
    let joined = timeout(Duration::from_secs(5), serving)
        .await
        .context("server kept waiting on the open stream")?;
    joined??;
    assert_eq!(telemetry.snapshot().stream_clients, 0);
    Ok(())
}

use antmon_api::models::MessageResponse;
use antmon_config::{DEVICES_PATH, Endpoint, METRICS_PATH};
use antmon_core::{DeviceSummary, MetricsSnapshot};

use crate::cli::OutputFormat;
use crate::client::{AppContext, CliResult, send_json};
use crate::output::{render_devices, render_snapshot};

pub(crate) async fn handle_start(ctx: &AppContext) -> CliResult<()> {
    let url = ctx.endpoint_url(Endpoint::StartMetrics)?;
    let response: MessageResponse = send_json(ctx.client.post(url), "startMetrics").await?;
    println!("{}", response.message);
    Ok(())
}

pub(crate) async fn handle_stop(ctx: &AppContext) -> CliResult<()> {
    let url = ctx.endpoint_url(Endpoint::StopMetrics)?;
    let response: MessageResponse = send_json(ctx.client.post(url), "stopMetrics").await?;
    println!("{}", response.message);
    Ok(())
}

pub(crate) async fn fetch_snapshot(ctx: &AppContext) -> CliResult<MetricsSnapshot> {
    let url = ctx.path_url(METRICS_PATH)?;
    send_json(ctx.client.get(url), METRICS_PATH).await
}

pub(crate) async fn fetch_devices(ctx: &AppContext) -> CliResult<Vec<DeviceSummary>> {
    let url = ctx.path_url(DEVICES_PATH)?;
    send_json(ctx.client.get(url), DEVICES_PATH).await
}

pub(crate) async fn handle_status(ctx: &AppContext, format: OutputFormat) -> CliResult<()> {
    let snapshot = fetch_snapshot(ctx).await?;
    render_snapshot(&snapshot, format)
}

pub(crate) async fn handle_devices(ctx: &AppContext, format: OutputFormat) -> CliResult<()> {
    let devices = fetch_devices(ctx).await?;
    render_devices(&devices, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, anyhow};
    use antmon_config::{ApiConfig, ApiProfile};
    use httpmock::prelude::*;
    use reqwest::Client;
    use serde_json::json;

    fn context_with(server: &MockServer) -> AppContext {
        AppContext {
            client: Client::new(),
            api: ApiConfig::resolve(ApiProfile::Development, |_| Some(server.base_url())),
        }
    }

    #[tokio::test]
    async fn start_posts_to_the_start_endpoint() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST).path("/metrics/start");
            then.status(200)
                .json_body(json!({ "message": "Metrics collection started" }));
        });

        handle_start(&context_with(&server))
            .await
            .map_err(|err| anyhow!(err.display_message()))?;
        mock.assert();
        Ok(())
    }

    #[tokio::test]
    async fn start_conflict_exits_with_validation_code() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/metrics/start");
            then.status(409).json_body(json!({
                "type": "https://antmon.dev/problems/conflict",
                "title": "conflict",
                "status": 409,
                "detail": "metrics collection already running"
            }));
        });

        let err = handle_start(&context_with(&server))
            .await
            .expect_err("conflict");
        assert_eq!(err.exit_code(), 2);
    }

    #[tokio::test]
    async fn status_decodes_the_snapshot() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/metrics");
            then.status(200).json_body(json!({
                "power": 180.5,
                "speed": null,
                "cadence": 88.0,
                "distance": null,
                "heart_rate": 140,
                "heart_rate_percent": 75.0,
                "zone_name": "ZONE 3",
                "zone_value": "Moderate",
                "is_running": true
            }));
        });

        let snapshot = fetch_snapshot(&context_with(&server))
            .await
            .map_err(|err| anyhow!(err.display_message()))?;
        assert_eq!(snapshot.heart_rate, Some(140));
        assert_eq!(snapshot.zone_name.as_deref(), Some("ZONE 3"));
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_service_is_a_failure() {
        let ctx = AppContext {
            client: Client::new(),
            api: ApiConfig::resolve(ApiProfile::Development, |_| {
                Some("http://127.0.0.1:9".to_string())
            }),
        };
        let err = handle_devices(&ctx, OutputFormat::Json)
            .await
            .expect_err("nothing listens on the discard port");
        assert_eq!(err.exit_code(), 3);
    }
}

use antmon_config::Endpoint;
use antmon_core::MetricsSettings;

use crate::cli::{OutputFormat, SettingsSetArgs};
use crate::client::{AppContext, CliError, CliResult, send_json};
use crate::output::render_settings;

pub(crate) async fn handle_settings_get(ctx: &AppContext, format: OutputFormat) -> CliResult<()> {
    let url = ctx.endpoint_url(Endpoint::GetSettings)?;
    let settings: MetricsSettings = send_json(ctx.client.get(url), "getSettings").await?;
    render_settings(&settings, format)
}

pub(crate) async fn handle_settings_set(
    ctx: &AppContext,
    args: SettingsSetArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let update = settings_update(&args)?;
    let url = ctx.endpoint_url(Endpoint::UpdateSettings)?;
    let settings: MetricsSettings =
        send_json(ctx.client.put(url).json(&update), "updateSettings").await?;
    render_settings(&settings, format)
}

fn settings_update(args: &SettingsSetArgs) -> CliResult<MetricsSettings> {
    let update = MetricsSettings {
        speed_wheel_circumference_m: args.speed_wheel_circumference,
        distance_wheel_circumference_m: args.distance_wheel_circumference,
        age: args.age,
    };
    if update == MetricsSettings::default() {
        return Err(CliError::validation(
            "pass at least one of --speed-wheel-circumference, --distance-wheel-circumference, --age",
        ));
    }
    Ok(update)
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

    #[test]
    fn empty_update_is_rejected_locally() {
        let err = settings_update(&SettingsSetArgs::default()).expect_err("nothing to send");
        assert_eq!(err.exit_code(), 2);
    }

    #[tokio::test]
    async fn set_sends_only_present_fields() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(PUT)
                .path("/metrics/settings")
                .json_body(json!({
                    "speed_wheel_circumference_m": null,
                    "distance_wheel_circumference_m": null,
                    "age": 35
                }));
            then.status(200).json_body(json!({
                "speed_wheel_circumference_m": 2.1,
                "distance_wheel_circumference_m": null,
                "age": 35
            }));
        });

        let args = SettingsSetArgs {
            age: Some(35),
            ..SettingsSetArgs::default()
        };
        handle_settings_set(&context_with(&server), args, OutputFormat::Json)
            .await
            .map_err(|err| anyhow!(err.display_message()))?;
        mock.assert();
        Ok(())
    }

    #[tokio::test]
    async fn rejected_settings_surface_invalid_params() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(PUT).path("/metrics/settings");
            then.status(422).json_body(json!({
                "type": "https://antmon.dev/problems/settings-invalid",
                "title": "settings invalid",
                "status": 422,
                "detail": "one or more settings are out of range",
                "invalid_params": [
                    { "pointer": "/age", "message": "must be greater than 0, got -3" }
                ]
            }));
        });

        let args = SettingsSetArgs {
            age: Some(-3),
            ..SettingsSetArgs::default()
        };
        let err = handle_settings_set(&context_with(&server), args, OutputFormat::Table)
            .await
            .expect_err("rejected");
        assert_eq!(err.exit_code(), 2);
        assert!(err.display_message().contains("/age: must be greater than 0"));
    }
}

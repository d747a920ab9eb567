//! Argument parsing, base URL resolution, and command dispatch.

use std::env;
use std::time::Duration;

use antmon_config::{ApiConfig, ApiProfile};
use clap::{Args, Parser, Subcommand, ValueEnum};
use uuid::Uuid;

use crate::client::{AppContext, CliResult, build_client};
use crate::commands::lifecycle::{handle_devices, handle_start, handle_status, handle_stop};
use crate::commands::settings::{handle_settings_get, handle_settings_set};
use crate::commands::tail::handle_tail;
use crate::commands::watch::handle_watch;
use crate::output::render_api_config;

const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Parses CLI arguments and executes the requested command. Returns the
/// process exit code: 0 on success, 2 for validation errors, 3 for failures.
pub async fn run() -> i32 {
    let Cli {
        api_url,
        timeout,
        output,
        command,
    } = Cli::parse();
    let trace_id = Uuid::new_v4().to_string();
    let timeout = (!command.is_streaming()).then(|| Duration::from_secs(timeout));
    let client = match build_client(timeout, &trace_id) {
        Ok(client) => client,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            return err.exit_code();
        }
    };
    let ctx = AppContext {
        client,
        api: resolve_api_config(api_url, |name| env::var(name).ok()),
    };

    match dispatch(&ctx, command, output).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

/// `--api-url` first, then the deployment variable, then the development fallback.
/// An empty `--api-url` counts as not given.
pub(crate) fn resolve_api_config<F>(flag: Option<String>, lookup: F) -> ApiConfig
where
    F: FnOnce(&str) -> Option<String>,
{
    let flag = flag.filter(|value| !value.is_empty());
    ApiConfig::resolve(ApiProfile::Development, |name| flag.or_else(|| lookup(name)))
}

async fn dispatch(ctx: &AppContext, command: Command, output: OutputFormat) -> CliResult<()> {
    match command {
        Command::Endpoints => render_api_config(&ctx.api, output),
        Command::Start => handle_start(ctx).await,
        Command::Stop => handle_stop(ctx).await,
        Command::Status => handle_status(ctx, output).await,
        Command::Devices => handle_devices(ctx, output).await,
        Command::Settings(settings) => match settings {
            SettingsCommand::Get => handle_settings_get(ctx, output).await,
            SettingsCommand::Set(args) => handle_settings_set(ctx, args, output).await,
        },
        Command::Tail(args) => handle_tail(ctx, args).await,
        Command::Watch(args) => handle_watch(ctx, args).await,
    }
}

#[derive(Parser)]
#[command(name = "antmon", about = "Client for the antmon sensor metrics service")]
pub(crate) struct Cli {
    #[arg(
        long,
        global = true,
        help = "Service base URL (overrides ANTMON_API_BASE_URL)"
    )]
    api_url: Option<String>,
    #[arg(
        long,
        global = true,
        env = "ANTMON_HTTP_TIMEOUT_SECS",
        default_value_t = DEFAULT_TIMEOUT_SECS
    )]
    timeout: u64,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    output: OutputFormat,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Print the resolved base URL and endpoint map.
    Endpoints,
    /// Start metrics collection.
    Start,
    /// Stop metrics collection.
    Stop,
    /// Show the current metrics snapshot.
    Status,
    /// List devices registered in the current session.
    Devices,
    /// Read or change metrics settings.
    #[command(subcommand)]
    Settings(SettingsCommand),
    /// Follow a server-sent event stream.
    Tail(TailArgs),
    /// Live console display of devices and metrics.
    Watch(WatchArgs),
}

impl Command {
    const fn is_streaming(&self) -> bool {
        matches!(self, Self::Tail(_))
    }
}

#[derive(Subcommand)]
pub(crate) enum SettingsCommand {
    /// Show the current settings.
    Get,
    /// Update the given settings; omitted ones keep their value.
    Set(SettingsSetArgs),
}

#[derive(Args, Default)]
pub(crate) struct SettingsSetArgs {
    #[arg(
        long,
        allow_negative_numbers = true,
        help = "Wheel circumference in metres for speed"
    )]
    pub(crate) speed_wheel_circumference: Option<f64>,
    #[arg(
        long,
        allow_negative_numbers = true,
        help = "Wheel circumference in metres for distance"
    )]
    pub(crate) distance_wheel_circumference: Option<f64>,
    #[arg(long, allow_negative_numbers = true, help = "Athlete age in years")]
    pub(crate) age: Option<i32>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum StreamKind {
    Metrics,
    Devices,
}

#[derive(Args)]
pub(crate) struct TailArgs {
    #[arg(value_enum)]
    pub(crate) stream: StreamKind,
    #[arg(
        long,
        default_value_t = 5,
        help = "Seconds to wait before reconnecting"
    )]
    pub(crate) retry_secs: u64,
    #[arg(long, help = "Exit after printing this many payloads")]
    pub(crate) max_events: Option<usize>,
}

#[derive(Args)]
pub(crate) struct WatchArgs {
    #[arg(long, default_value_t = 1000, help = "Refresh interval in milliseconds")]
    pub(crate) interval_ms: u64,
    #[arg(long, help = "Exit after this many refreshes")]
    pub(crate) iterations: Option<u64>,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}

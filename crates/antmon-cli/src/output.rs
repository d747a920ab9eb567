//! Output renderers and formatting helpers for CLI commands.

use antmon_config::{ApiConfig, Endpoint};
use antmon_core::{DeviceSummary, MetricsSettings, MetricsSnapshot};
use anyhow::anyhow;
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::client::{CliError, CliResult};

const MISSING: &str = "--";

fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
    println!("{text}");
    Ok(())
}

pub(crate) fn render_api_config(config: &ApiConfig, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(config)?,
        OutputFormat::Table => {
            let base = if config.is_same_origin() {
                "(same origin)"
            } else {
                config.base_url()
            };
            println!("base url: {base}");
            println!("{:<16} {:<26} URL", "ENDPOINT", "PATH");
            for endpoint in Endpoint::ALL {
                println!(
                    "{:<16} {:<26} {}",
                    endpoint.name(),
                    config.endpoints().path(endpoint),
                    config.url_for(endpoint)
                );
            }
        }
    }
    Ok(())
}

pub(crate) fn render_snapshot(snapshot: &MetricsSnapshot, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(snapshot)?,
        OutputFormat::Table => {
            let running = snapshot
                .is_running
                .map_or(MISSING, |running| if running { "yes" } else { "no" });
            println!("running: {running}");
            println!("{}", stats_line(snapshot));
            if let Some(percent) = snapshot.heart_rate_percent {
                println!("heart rate: {percent:.1}% of max");
            }
            if let (Some(name), Some(value)) = (&snapshot.zone_name, &snapshot.zone_value) {
                println!("zone: {name} ({value})");
            }
        }
    }
    Ok(())
}

pub(crate) fn render_devices(devices: &[DeviceSummary], format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(devices)?,
        OutputFormat::Table => {
            println!("{:>8} {:>5} NAME", "ID", "TYPE");
            for device in devices {
                println!(
                    "{:>8} {:>5} {}",
                    device.device_id, device.device_type, device.name
                );
            }
        }
    }
    Ok(())
}

pub(crate) fn render_settings(settings: &MetricsSettings, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(settings)?,
        OutputFormat::Table => {
            println!(
                "speed wheel circumference: {}",
                optional(settings.speed_wheel_circumference_m, " m")
            );
            println!(
                "distance wheel circumference: {}",
                optional(settings.distance_wheel_circumference_m, " m")
            );
            let age = settings
                .age
                .map_or_else(|| MISSING.to_string(), |age| age.to_string());
            println!("age: {age}");
        }
    }
    Ok(())
}

fn optional(value: Option<f64>, unit: &str) -> String {
    value.map_or_else(|| MISSING.to_string(), |value| format!("{value}{unit}"))
}

/// Two decimals, or `--` when the value is missing.
pub(crate) fn decimal(value: Option<f64>) -> String {
    value.map_or_else(|| MISSING.to_string(), |value| format!("{value:.2}"))
}

/// `Registered Devices: Name (id), ...` or `Registered Devices: None`.
pub(crate) fn devices_line(devices: &[DeviceSummary]) -> String {
    if devices.is_empty() {
        return "Registered Devices: None".to_string();
    }
    let listed = devices
        .iter()
        .map(|device| format!("{} ({})", device.name, device.device_id))
        .collect::<Vec<_>>()
        .join(", ");
    format!("Registered Devices: {listed}")
}

/// The single-line live stats readout.
pub(crate) fn stats_line(snapshot: &MetricsSnapshot) -> String {
    let heart_rate = snapshot
        .heart_rate
        .map_or_else(|| MISSING.to_string(), |bpm| bpm.to_string());
    format!(
        "Power: {} W | Speed: {} km/h | Cadence: {} rpm | Distance: {} m | Heart Rate: {} bpm",
        decimal(snapshot.power),
        decimal(snapshot.speed),
        decimal(snapshot.cadence),
        decimal(snapshot.distance),
        heart_rate
    )
}

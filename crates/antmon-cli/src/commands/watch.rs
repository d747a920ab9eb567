use std::io::{self, Write};
use std::time::Duration;

use antmon_core::{DeviceSummary, MetricsSnapshot};
use tokio::time::{MissedTickBehavior, interval};

use crate::cli::WatchArgs;
use crate::client::{AppContext, CliResult};
use crate::commands::lifecycle::{fetch_devices, fetch_snapshot};
use crate::output::{devices_line, stats_line};

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

pub(crate) async fn handle_watch(ctx: &AppContext, args: WatchArgs) -> CliResult<()> {
    let mut ticker = interval(Duration::from_millis(args.interval_ms.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut refreshes = 0_u64;

    loop {
        ticker.tick().await;
        let devices = fetch_devices(ctx).await?;
        let snapshot = fetch_snapshot(ctx).await?;

        {
            let mut stdout = io::stdout().lock();
            let _ = write!(stdout, "{}", frame(&devices, &snapshot));
            let _ = stdout.flush();
        }

        refreshes += 1;
        if args.iterations.is_some_and(|limit| refreshes >= limit) {
            return Ok(());
        }
    }
}

fn frame(devices: &[DeviceSummary], snapshot: &MetricsSnapshot) -> String {
    format!(
        "{CLEAR_SCREEN}{}\n\r{}\n",
        devices_line(devices),
        stats_line(snapshot)
    )
}

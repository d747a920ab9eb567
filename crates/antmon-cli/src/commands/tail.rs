use std::time::Duration;

use antmon_config::Endpoint;
use anyhow::anyhow;
use futures_util::StreamExt;
use reqwest::header::ACCEPT;
use tokio::time::sleep;

use crate::cli::{StreamKind, TailArgs};
use crate::client::{AppContext, CliError, CliResult, classify_problem};

/// How a single connection ended.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum StreamEnd {
    /// The requested number of payloads was printed.
    LimitReached,
    /// The server closed the stream.
    Closed,
}

pub(crate) async fn handle_tail(ctx: &AppContext, args: TailArgs) -> CliResult<()> {
    let endpoint = match args.stream {
        StreamKind::Metrics => Endpoint::MetricsStream,
        StreamKind::Devices => Endpoint::DevicesStream,
    };
    let url = ctx.endpoint_url(endpoint)?;
    let mut remaining = args.max_events;
    if remaining == Some(0) {
        return Ok(());
    }

    loop {
        let response = match ctx
            .client
            .get(url.clone())
            .header(ACCEPT, "text/event-stream")
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(err) => {
                eprintln!(
                    "stream connection failed: {err}. retrying in {}s",
                    args.retry_secs
                );
                sleep(Duration::from_secs(args.retry_secs)).await;
                continue;
            }
        };

        if !response.status().is_success() {
            return Err(classify_problem(response).await);
        }

        match stream_payloads(response, &mut remaining, |payload| println!("{payload}")).await {
            Ok(StreamEnd::LimitReached) => return Ok(()),
            Ok(StreamEnd::Closed) => {
                eprintln!("stream closed by server. reconnecting in {}s", args.retry_secs);
            }
            Err(err) => {
                eprintln!(
                    "stream error: {}. retrying in {}s",
                    err.display_message(),
                    args.retry_secs
                );
            }
        }
        sleep(Duration::from_secs(args.retry_secs)).await;
    }
}

/// Feed `on_payload` with every `data` payload until the stream ends or
/// `remaining` reaches zero.
pub(crate) async fn stream_payloads<F>(
    response: reqwest::Response,
    remaining: &mut Option<usize>,
    mut on_payload: F,
) -> CliResult<StreamEnd>
where
    F: FnMut(&str),
{
    let mut stream = response.bytes_stream();
    let mut parser = SseParser::default();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk
            .map_err(|err| CliError::failure(anyhow!("failed to read event stream: {err}")))?;
        for payload in parser.push(&chunk) {
            on_payload(&payload);
            if let Some(left) = remaining.as_mut() {
                *left = left.saturating_sub(1);
                if *left == 0 {
                    return Ok(StreamEnd::LimitReached);
                }
            }
        }
    }

    Ok(StreamEnd::Closed)
}

/// Incremental `text/event-stream` decoder yielding joined `data` fields.
///
/// Bytes are buffered until a full line arrives, so a character split across
/// network chunks decodes intact.
#[derive(Default)]
pub(crate) struct SseParser {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseParser {
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        let mut payloads = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&raw[..pos]);
            let line = text.trim_end_matches('\r');
            if line.is_empty() {
                if !self.data.is_empty() {
                    payloads.push(self.data.join("\n"));
                    self.data.clear();
                }
            } else if let Some(data) = line.strip_prefix("data:") {
                self.data.push(data.strip_prefix(' ').unwrap_or(data).to_string());
            }
            // Comments (keep-alives), `id`, `event` and `retry` fields carry nothing we print.
        }

        payloads
    }
}

//! Shared client context, error types, and response helpers for the CLI.

use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use antmon_api::models::ProblemDetails;
use antmon_config::{ApiConfig, Endpoint};
use anyhow::anyhow;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;

pub(crate) const HEADER_REQUEST_ID: &str = "x-request-id";

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

/// Build the HTTP client shared by every command.
pub(crate) fn build_client(timeout: Option<Duration>, trace_id: &str) -> CliResult<Client> {
    let mut default_headers = HeaderMap::new();
    let request_id = HeaderValue::from_str(trace_id)
        .map_err(|_| CliError::failure(anyhow!("trace identifier contains invalid characters")))?;
    default_headers.insert(HEADER_REQUEST_ID, request_id);

    let mut builder = Client::builder().default_headers(default_headers);
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|err| CliError::failure(anyhow!("failed to build HTTP client: {err}")))
}

/// Application context passed to command handlers.
#[derive(Clone)]
pub(crate) struct AppContext {
    pub(crate) client: Client,
    pub(crate) api: ApiConfig,
}

impl AppContext {
    /// Absolute URL of a named endpoint.
    pub(crate) fn endpoint_url(&self, endpoint: Endpoint) -> CliResult<Url> {
        parse_absolute(&self.api.url_for(endpoint))
    }

    /// Absolute URL of a path outside the endpoint map.
    pub(crate) fn path_url(&self, path: &str) -> CliResult<Url> {
        parse_absolute(&self.api.url_for_path(path))
    }
}

fn parse_absolute(raw: &str) -> CliResult<Url> {
    raw.parse::<Url>().map_err(|err| {
        CliError::validation(format!(
            "'{raw}' is not an absolute URL ({err}); pass --api-url or set ANTMON_API_BASE_URL"
        ))
    })
}

/// Send `request` and decode a JSON success body, classifying failures.
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: RequestBuilder,
    label: &str,
) -> CliResult<T> {
    let response = request
        .send()
        .await
        .map_err(|err| CliError::failure(anyhow!("request to {label} failed: {err}")))?;
    if !response.status().is_success() {
        return Err(classify_problem(response).await);
    }
    response
        .json::<T>()
        .await
        .map_err(|err| CliError::failure(anyhow!("failed to parse {label} response: {err}")))
}

/// Classify an HTTP response into a CLI error.
pub(crate) async fn classify_problem(response: reqwest::Response) -> CliError {
    let status = response.status();
    let bytes = response.bytes().await.unwrap_or_default();

    let body_text = String::from_utf8_lossy(&bytes).to_string();
    let problem = serde_json::from_slice::<ProblemDetails>(&bytes).ok();

    let message = problem
        .as_ref()
        .and_then(|p| p.detail.clone())
        .unwrap_or_else(|| {
            problem
                .as_ref()
                .map_or_else(|| body_text.trim().to_string(), |p| p.title.clone())
        });

    if matches!(
        status,
        StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY
    ) {
        let params = problem
            .as_ref()
            .and_then(|p| p.invalid_params.as_ref())
            .map(|params| {
                params
                    .iter()
                    .map(|param| format!("{}: {}", param.pointer, param.message))
                    .collect::<Vec<_>>()
                    .join("; ")
            })
            .filter(|joined| !joined.is_empty());
        match params {
            Some(params) => CliError::validation(format!("{message} ({params})")),
            None => CliError::validation(message),
        }
    } else {
        let detail = if let Some(problem) = problem {
            format!("{} (status {})", message, problem.status)
        } else if !body_text.is_empty() {
            format!("{message} (status {status})")
        } else {
            format!("request failed with status {status}")
        };
        CliError::failure(anyhow!(detail))
    }
}

//! RFC9457-style API error wrapper.

use antmon_core::CollectorError;
use antmon_telemetry::RequestContext;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{error, warn};

use crate::http::constants::{
    PROBLEM_CONFLICT, PROBLEM_INTERNAL, PROBLEM_SENSOR_UNAVAILABLE, PROBLEM_SETTINGS_INVALID,
};
use crate::models::{ProblemDetails, ProblemInvalidParam};

/// Structured API error with optional RFC9457 fields.
#[derive(Debug)]
pub(crate) struct ApiError {
    pub(crate) status: StatusCode,
    pub(crate) kind: &'static str,
    title: &'static str,
    detail: Option<String>,
    pub(crate) invalid_params: Option<Vec<ProblemInvalidParam>>,
}

impl ApiError {
    const fn new(status: StatusCode, kind: &'static str, title: &'static str) -> Self {
        Self {
            status,
            kind,
            title,
            detail: None,
            invalid_params: None,
        }
    }

    pub(crate) fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub(crate) fn with_invalid_params(mut self, params: Vec<ProblemInvalidParam>) -> Self {
        self.invalid_params = Some(params);
        self
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            PROBLEM_INTERNAL,
            "internal server error",
        )
        .with_detail(message)
    }

    pub(crate) fn conflict(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, PROBLEM_CONFLICT, "conflict").with_detail(detail)
    }

    pub(crate) fn settings_invalid(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            PROBLEM_SETTINGS_INVALID,
            "settings invalid",
        )
        .with_detail(detail)
    }

    pub(crate) fn sensor_unavailable(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            PROBLEM_SENSOR_UNAVAILABLE,
            "sensor node unavailable",
        )
        .with_detail(detail)
    }

    /// Map a collector failure, logging it under `context`.
    pub(crate) fn from_collector(context: &'static str, err: CollectorError) -> Self {
        match err {
            CollectorError::AlreadyRunning => {
                warn!(context, "rejected request while collection is running");
                Self::conflict(err.to_string())
            }
            CollectorError::InvalidSettings { violations } => {
                let params = violations
                    .into_iter()
                    .map(|violation| ProblemInvalidParam {
                        pointer: format!("/{}", violation.field),
                        message: violation.message,
                    })
                    .collect();
                Self::settings_invalid("one or more settings are out of range")
                    .with_invalid_params(params)
            }
            CollectorError::Node { operation, source } => {
                error!(context, operation, error = %source, "sensor node failure");
                Self::sensor_unavailable(format!("{context}: {source}"))
            }
            CollectorError::Task { detail } => {
                error!(context, detail = %detail, "collector task failure");
                Self::internal(format!("{context}: {detail}"))
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error()
            && let Some(request) = RequestContext::current()
        {
            error!(
                request_id = %request.request_id,
                route = %request.route,
                status = self.status.as_u16(),
                kind = self.kind,
                "request failed"
            );
        }
        let body = ProblemDetails {
            kind: self.kind.to_string(),
            title: self.title.to_string(),
            status: self.status.as_u16(),
            detail: self.detail,
            invalid_params: self.invalid_params,
        };
        (self.status, Json(body)).into_response()
    }
}

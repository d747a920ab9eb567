//! Collection lifecycle and readings handlers.

use std::sync::Arc;

use antmon_core::{DeviceSummary, MetricsSnapshot};
use axum::{Json, extract::State};
use tracing::info;

use crate::http::errors::ApiError;
use crate::models::MessageResponse;
use crate::state::ApiState;

pub(crate) async fn start_metrics(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .collector
        .start()
        .await
        .map_err(|err| ApiError::from_collector("failed to start metrics", err))?;
    info!("metrics collection started");
    Ok(Json(MessageResponse::new("Metrics collection started")))
}

pub(crate) async fn stop_metrics(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .collector
        .stop()
        .await
        .map_err(|err| ApiError::from_collector("failed to stop metrics", err))?;
    Ok(Json(MessageResponse::new("Metrics collection stopped")))
}

pub(crate) async fn get_metrics(State(state): State<Arc<ApiState>>) -> Json<MetricsSnapshot> {
    Json(state.collector.snapshot().await)
}

pub(crate) async fn get_devices(State(state): State<Arc<ApiState>>) -> Json<Vec<DeviceSummary>> {
    Json(state.collector.devices())
}

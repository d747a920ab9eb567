//! Settings handlers.

use std::sync::Arc;

use antmon_core::MetricsSettings;
use axum::{Json, extract::State};

use crate::http::errors::ApiError;
use crate::state::ApiState;

pub(crate) async fn get_settings(State(state): State<Arc<ApiState>>) -> Json<MetricsSettings> {
    Json(state.collector.settings())
}

/// Merge the present fields of the payload; absent fields keep their value.
pub(crate) async fn update_settings(
    State(state): State<Arc<ApiState>>,
    Json(update): Json<MetricsSettings>,
) -> Result<Json<MetricsSettings>, ApiError> {
    let merged = state
        .collector
        .update_settings(update)
        .map_err(|err| ApiError::from_collector("failed to update settings", err))?;
    Ok(Json(merged))
}

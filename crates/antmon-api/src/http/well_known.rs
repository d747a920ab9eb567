//! Client configuration discovery for browser dashboards.

use std::sync::Arc;

use antmon_config::ApiConfig;
use axum::{Json, extract::State};

use crate::state::ApiState;

pub(crate) async fn well_known(State(state): State<Arc<ApiState>>) -> Json<ApiConfig> {
    Json(state.client_config.clone())
}

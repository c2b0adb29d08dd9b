//! Orchestrator API handlers.

use axum::{extract::State, Json};
use std::sync::Arc;

use keyreel_core::OrchestratorStatus;

use super::sessions::ApiError;
use crate::state::AppState;

/// Session counts by status, running pipelines, and image gate usage.
pub async fn get_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<OrchestratorStatus>, ApiError> {
    Ok(Json(state.orchestrator().status()?))
}

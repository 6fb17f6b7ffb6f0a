use axum::{extract::State, response::IntoResponse, Json};
use std::sync::Arc;

use crate::services::AppState;

/// Describes the learned model the coordinator would use, including why it
/// is unavailable when loading failed.
pub async fn model_info(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.coordinator.model_info())
}

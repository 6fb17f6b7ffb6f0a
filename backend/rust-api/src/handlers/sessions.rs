use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use std::sync::Arc;

use crate::{
    extractors::ValidatedJson,
    models::{CreateSessionRequest, SubmitAnswerRequest},
    services::{session_service::SessionError, AppState},
    utils::time::timestamp_str,
};

fn error_response(e: SessionError) -> (StatusCode, String) {
    let status = match e {
        SessionError::NotFound(_) => StatusCode::NOT_FOUND,
        SessionError::Completed(_) | SessionError::NoPendingPuzzle(_) => StatusCode::CONFLICT,
    };
    (status, e.to_string())
}

pub async fn create_session(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<CreateSessionRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    tracing::info!(
        "Creating session for user={}, use_learned={}",
        req.user_name,
        req.use_learned
    );

    let service = state.session_service();
    let response = service.create_session(req).await;

    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let service = state.session_service();

    match service.get_session(&session_id).await {
        Ok(session) => Ok((StatusCode::OK, Json(session))),
        Err(e) => Err(error_response(e)),
    }
}

pub async fn current_puzzle(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let service = state.session_service();

    service
        .current_puzzle(&session_id)
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn submit_answer(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    ValidatedJson(req): ValidatedJson<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    tracing::info!("Submitting answer for session: {}", session_id);

    let service = state.session_service();

    match service.submit_answer(&session_id, &req).await {
        Ok(response) => Ok((StatusCode::OK, Json(response))),
        Err(e) => {
            tracing::warn!("Failed to submit answer: {}", e);
            Err(error_response(e))
        }
    }
}

pub async fn get_summary(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let service = state.session_service();

    service
        .summary(&session_id)
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn export_attempts(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let service = state.session_service();
    let (user, csv) = service
        .export_attempts(&session_id)
        .await
        .map_err(error_response)?;

    let user: String = user
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    let disposition = format!(
        "attachment; filename=\"session_{}_{}.csv\"",
        user,
        timestamp_str(Utc::now())
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    ))
}

pub async fn complete_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    tracing::info!("Completing session: {}", session_id);

    let service = state.session_service();

    match service.complete_session(&session_id).await {
        Ok(summary) => Ok((StatusCode::OK, Json(summary))),
        Err(e) => {
            tracing::error!("Failed to complete session: {}", e);
            Err(error_response(e))
        }
    }
}

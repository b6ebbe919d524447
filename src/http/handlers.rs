use super::state::AppState;
use crate::session::{LogEntry, ManualAction, SessionError, SessionStatus};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Serialize;
use tracing::{info, warn};

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub status: SessionStatus,
    pub candidate_speaking: bool,
    pub interviewer_speaking: bool,
    pub upload_progress: u8,
}

#[derive(Debug, Serialize)]
pub struct AcceptedResponse {
    pub session_id: String,
    pub action: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> axum::response::Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

fn gone(e: SessionError) -> axum::response::Response {
    warn!("Control request after interview ended: {}", e);
    error_response(StatusCode::GONE, e.to_string())
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /interview/status
/// Phase, sub-state, counters and upload progress
pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    let interview = &state.interview;
    let response = StatusResponse {
        status: interview.status(),
        candidate_speaking: interview.candidate_speaking(),
        interviewer_speaking: interview.avatar().borrow().speaking,
        upload_progress: interview.progress(),
    };
    (StatusCode::OK, Json(response))
}

/// GET /interview/log
/// The last few controller log entries
pub async fn get_log(State(state): State<AppState>) -> impl IntoResponse {
    let log: Vec<LogEntry> = state.interview.status().log;
    (StatusCode::OK, Json(log))
}

/// POST /interview/override/:action
/// Manual nudge, rephrase, skip or evaluate
pub async fn post_override(
    State(state): State<AppState>,
    Path(action): Path<String>,
) -> impl IntoResponse {
    let action: ManualAction = match action.parse() {
        Ok(action) => action,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e),
    };

    info!("Manual override requested: {}", action);

    match state.interview.send(action).await {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(AcceptedResponse {
                session_id: state.interview.session_id().to_string(),
                action: action.to_string(),
            }),
        )
            .into_response(),
        Err(e) => gone(e),
    }
}

/// POST /interview/abandon
/// End the interview without uploading
pub async fn post_abandon(State(state): State<AppState>) -> impl IntoResponse {
    info!("Abandon requested");

    match state.interview.abandon().await {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(AcceptedResponse {
                session_id: state.interview.session_id().to_string(),
                action: "abandon".to_string(),
            }),
        )
            .into_response(),
        Err(e) => gone(e),
    }
}

//! Session, message and log handlers

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use simpatient_core::LogEntry;

use crate::AppState;
use crate::error::AppError;

/// Response body for session creation
#[derive(Serialize)]
pub struct CreateSessionResponse {
    session_id: String,
}

/// Request body for a doctor message
#[derive(Deserialize)]
pub struct MessageRequest {
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Response body for a doctor message
#[derive(Serialize)]
pub struct MessageResponse {
    reply: String,
}

/// POST /session - Start a new simulated patient conversation
pub async fn create(State(state): State<AppState>) -> impl IntoResponse {
    let session_id = state.simulator.store().create().await;
    (
        StatusCode::CREATED,
        Json(CreateSessionResponse { session_id }),
    )
}

/// POST /message - Send a doctor message and get the patient's reply
///
/// Generation failures still answer 200 with an in-character apology;
/// the failure itself goes to logs and metrics.
pub async fn message(
    State(state): State<AppState>,
    body: Result<Json<MessageRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(body) = body?;

    let session_id = body
        .session_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("session_id is required".to_string()))?;
    let text = body
        .message
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("message cannot be empty".to_string()))?;

    let exchange = state.simulator.respond(&session_id, &text).await;

    Ok(Json(MessageResponse {
        reply: exchange.reply_text().to_string(),
    }))
}

/// GET /logs/{session_id} - Ordered transcript for a session
///
/// Unknown sessions yield an empty list.
pub async fn logs(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Json<Vec<LogEntry>> {
    let log = match state.simulator.store().get(&session_id).await {
        Some(handle) => handle.log().await,
        None => Vec::new(),
    };
    Json(log)
}

//! Health check endpoint

use axum::{Json, extract::State};
use serde::Serialize;

use crate::AppState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    service: &'static str,
    completion: &'static str,
    sessions: usize,
}

/// GET /health - Report liveness and whether generation is configured
pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    let completion = if state.simulator.is_configured() {
        "configured"
    } else {
        "disabled"
    };

    Json(HealthResponse {
        status: "healthy",
        service: "patient-chatbot-api",
        completion,
        sessions: state.simulator.store().len().await,
    })
}

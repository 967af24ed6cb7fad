pub mod health;
pub mod metrics;
mod session;

use axum::{
    Router,
    routing::{get, post},
};

use crate::AppState;

/// Build the conversation routes
pub fn chat_routes() -> Router<AppState> {
    Router::new()
        .route("/session", post(session::create))
        .route("/message", post(session::message))
        .route("/logs/{session_id}", get(session::logs))
}

//! simpatient-server library crate
//!
//! Exposes `build_app` and `config` for integration tests.
//! The actual binary entrypoint is in `main.rs`.

pub mod ai;
pub mod config;
mod error;
mod middleware;
mod routes;
pub mod store;

use std::sync::Arc;

use axum::{Extension, Router, middleware as axum_mw, routing::get};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use ai::{CompletionClient, GeminiClient, PatientSimulator, RetryPolicy};
use config::Config;
use store::{InMemorySessionStore, SessionStore};

/// Number of attempts per generation, including the first
const MAX_COMPLETION_ATTEMPTS: u32 = 3;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub simulator: PatientSimulator,
}

/// Build the Gemini client from config (None if no API key is set)
pub fn completion_client(config: &Config) -> Option<Arc<dyn CompletionClient>> {
    let api_key = config.gemini_api_key.clone()?;
    match GeminiClient::new(
        api_key,
        config.gemini_model.clone(),
        config.gemini_base_url.clone(),
        config.completion_timeout,
    ) {
        Ok(client) => Some(Arc::new(client) as Arc<dyn CompletionClient>),
        Err(e) => {
            tracing::error!(error = %e, "Failed to create Gemini client, generation disabled");
            None
        }
    }
}

/// Build the full application router with an in-memory store and the
/// configured Gemini client.
pub fn build_app(config: &Config) -> Router {
    let store: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
    build_app_with(config, store, completion_client(config))
}

/// Build the router around an explicit store and completion client.
///
/// Extracted from `main()` so integration tests can construct the app
/// without binding to a TCP port.
pub fn build_app_with(
    config: &Config,
    store: Arc<dyn SessionStore>,
    client: Option<Arc<dyn CompletionClient>>,
) -> Router {
    let retry = RetryPolicy::new(MAX_COMPLETION_ATTEMPTS, config.retry_base_delay);
    let state = AppState {
        simulator: PatientSimulator::new(store, client, retry),
    };

    // Create rate limiter
    let rate_limiter = middleware::create_rate_limiter(config.rate_limit_rps);

    // Conversation routes are served at the root and under /api for the web frontend
    let chat_routes = Router::new()
        .merge(routes::chat_routes())
        .nest("/api", routes::chat_routes())
        .layer(axum_mw::from_fn(middleware::rate_limit_middleware))
        .layer(Extension(rate_limiter));

    // Install Prometheus metrics recorder.
    // Use build_recorder() + set_global_recorder() so that repeated calls
    // (e.g. in integration tests) don't panic; the second install is
    // silently ignored and we still get a valid handle for /metrics.
    let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
    let prometheus_handle = recorder.handle();
    let _ = metrics::set_global_recorder(recorder);

    // Public routes (not rate limited)
    let public_routes = Router::new()
        .route("/health", get(routes::health::check))
        .route("/api/health", get(routes::health::check))
        .route("/metrics", get(routes::metrics::get))
        .layer(Extension(prometheus_handle));

    // Build CORS layer
    let cors = if config.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Build application
    Router::new()
        .merge(public_routes)
        .merge(chat_routes)
        .with_state(state)
        .layer(axum_mw::from_fn(middleware::audit_middleware))
        .layer(axum_mw::from_fn(middleware::request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum_mw::from_fn(middleware::metrics_middleware))
}

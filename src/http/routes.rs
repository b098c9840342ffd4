use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Textual control command
        .route("/api/transcribe", post(handlers::transcribe_command))
        // Structured control
        .route(
            "/calls/:call_id/transcription/start",
            post(handlers::start_transcription),
        )
        .route(
            "/calls/:call_id/transcription/stop",
            post(handlers::stop_transcription),
        )
        .route(
            "/calls/:call_id/transcription",
            get(handlers::get_transcription_status),
        )
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

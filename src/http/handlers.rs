use super::state::AppState;
use crate::control::{Action, Command, CommandOutcome};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::info;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StartTranscriptionRequest {
    /// Language code (e.g. "en-US")
    pub language: String,

    /// Emit interim results (default: false)
    #[serde(default)]
    pub interim: bool,

    /// Tap both directions as two channels (default: false)
    #[serde(default)]
    pub stereo: bool,

    /// Bug-name (default: the configured default)
    pub bug_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StopTranscriptionRequest {
    pub bug_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TranscriptionResponse {
    pub call_id: String,
    pub bug_name: String,
    pub status: String,
    pub message: String,
}

fn status_code(outcome: CommandOutcome) -> StatusCode {
    match outcome {
        CommandOutcome::Ok => StatusCode::OK,
        CommandOutcome::Usage => StatusCode::BAD_REQUEST,
        CommandOutcome::Failed => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn respond(call_id: String, bug_name: String, outcome: CommandOutcome) -> impl IntoResponse {
    let status = match outcome {
        CommandOutcome::Ok => "ok",
        CommandOutcome::Usage => "usage",
        CommandOutcome::Failed => "failed",
    };

    (
        status_code(outcome),
        Json(TranscriptionResponse {
            call_id,
            bug_name,
            status: status.to_string(),
            message: outcome.to_string(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/transcribe
/// Body is a command line: `<call-id> start|stop ...`
pub async fn transcribe_command(State(state): State<AppState>, body: String) -> impl IntoResponse {
    let outcome = state.control.execute_line(&body).await;
    (status_code(outcome), format!("{}\n", outcome))
}

/// POST /calls/:call_id/transcription/start
pub async fn start_transcription(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
    Json(req): Json<StartTranscriptionRequest>,
) -> impl IntoResponse {
    let bug_name = req
        .bug_name
        .unwrap_or_else(|| state.control.default_bug_name().to_string());

    info!("Start transcription requested for {} ({})", call_id, bug_name);

    let command = Command {
        call_id: call_id.clone(),
        action: Action::Start {
            language: req.language,
            interim: req.interim,
            stereo: req.stereo,
            bug_name: bug_name.clone(),
        },
    };
    let outcome = state.control.execute(command).await;

    respond(call_id, bug_name, outcome)
}

/// POST /calls/:call_id/transcription/stop
pub async fn stop_transcription(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
    req: Option<Json<StopTranscriptionRequest>>,
) -> impl IntoResponse {
    let req = req.map(|Json(req)| req).unwrap_or_default();
    let bug_name = req
        .bug_name
        .unwrap_or_else(|| state.control.default_bug_name().to_string());

    info!("Stop transcription requested for {} ({})", call_id, bug_name);

    let command = Command {
        call_id: call_id.clone(),
        action: Action::Stop {
            bug_name: bug_name.clone(),
        },
    };
    let outcome = state.control.execute(command).await;

    respond(call_id, bug_name, outcome)
}

/// GET /calls/:call_id/transcription
/// Sessions currently registered on a call
pub async fn get_transcription_status(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> impl IntoResponse {
    let sessions = state.control.manager().sessions(&call_id).await;
    (StatusCode::OK, Json(sessions))
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

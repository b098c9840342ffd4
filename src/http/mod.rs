//! HTTP control API
//!
//! This module exposes the control commands over REST:
//! - POST /api/transcribe - Run a textual `<call-id> start|stop ...` command
//! - POST /calls/:call_id/transcription/start - Start transcription (JSON)
//! - POST /calls/:call_id/transcription/stop - Stop transcription (JSON)
//! - GET /calls/:call_id/transcription - Sessions on a call
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use handlers::{StartTranscriptionRequest, StopTranscriptionRequest, TranscriptionResponse};
pub use routes::create_router;
pub use state::AppState;

//! Error types for transcription control and session lifecycle

use thiserror::Error;

/// Failure of a single command or session operation.
///
/// Nothing here is process-fatal: each error is scoped to the command or
/// session that produced it.
#[derive(Error, Debug)]
pub enum TranscribeError {
    /// Malformed control command
    #[error("Usage error: {0}")]
    Usage(String),

    /// Target call could not be resolved
    #[error("Call not found: {0}")]
    CallNotFound(String),

    /// Call could not be prepared for interception (e.g. pre-answer failed)
    #[error("Cannot prepare call {call_id}: {reason}")]
    Precondition { call_id: String, reason: String },

    /// Recognizer rejected the session configuration or stream start
    #[error("Recognizer init failed for {session}: {reason}")]
    BackendInit { session: String, reason: String },

    /// Interceptor attach failed after the recognizer stream was opened
    #[error("Interceptor attach failed for {session}: {reason}")]
    Attach { session: String, reason: String },

    /// Best-effort event delivery failed
    #[error("Event delivery failed: {0}")]
    Delivery(String),

    /// Recognizer stream cleanup or relay failed
    #[error("Recognizer error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, TranscribeError>;

//! Transcription session lifecycle
//!
//! This module provides the `SessionManager` which owns every session and
//! runs its state machine (`Starting → Active → Closing → Closed`):
//! - resolving the per-call `SessionConfig`
//! - opening the recognizer stream and attaching the interceptor
//! - relaying intercepted frames while `Active`
//! - idempotent stop and sequential restart, serialized per session key

mod config;
mod manager;
mod session;
mod stats;

pub use config::{is_true, vars, SessionConfig};
pub use manager::{SessionManager, StartRequest};
pub use session::{Session, SessionKey, SessionState};
pub use stats::SessionStats;

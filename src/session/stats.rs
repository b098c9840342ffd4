use super::session::SessionState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Snapshot of a transcription session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    pub session_id: Uuid,
    pub call_id: String,
    pub bug_name: String,
    pub state: SessionState,
    pub language: String,
    pub channels: u16,
    pub sample_rate: u32,

    /// When the session was created
    pub started_at: DateTime<Utc>,

    /// Frames handed to the recognizer
    pub frames_relayed: u64,

    /// Frames that arrived outside `Active` or were refused by the recognizer
    pub frames_dropped: u64,
}

use serde::{Deserialize, Serialize};

pub const EVENT_SUBCLASS_PREFIX: &str = "nuance_transcribe";

/// Kind of a normalized transcription event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    VadDetected,
    EndOfUtterance,
    StartOfTranscript,
    EndOfTranscript,
    MaxDurationExceeded,
    NoAudioDetected,
    PlayInterrupt,
    Results,
}

impl EventKind {
    /// Custom event subclass name
    pub fn subclass(&self) -> &'static str {
        match self {
            EventKind::VadDetected => "nuance_transcribe::vad_detected",
            EventKind::EndOfUtterance => "nuance_transcribe::end_of_utterance",
            EventKind::StartOfTranscript => "nuance_transcribe::start_of_transcript",
            EventKind::EndOfTranscript => "nuance_transcribe::end_of_transcript",
            EventKind::MaxDurationExceeded => "nuance_transcribe::max_duration_exceeded",
            EventKind::NoAudioDetected => "nuance_transcribe::no_audio_detected",
            EventKind::PlayInterrupt => "nuance_transcribe::play_interrupt",
            EventKind::Results => "nuance_transcribe::transcription",
        }
    }
}

/// Normalized event ready for the platform bus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,

    /// Call the event belongs to
    pub call_id: String,

    /// `transcription-vendor` header
    pub vendor: String,

    /// `media-bugname` header
    pub bug_name: Option<String>,

    /// Raw recognizer payload, only for `Results`
    pub body: Option<String>,
}

impl Event {
    /// Headers in the order the host attaches them
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![
            ("Event-Subclass", self.kind.subclass().to_string()),
            ("Unique-ID", self.call_id.clone()),
            ("transcription-vendor", self.vendor.clone()),
        ];
        if let Some(bug_name) = &self.bug_name {
            headers.push(("media-bugname", bug_name.clone()));
        }
        headers
    }
}

/// Event queued on a call's own queue rather than fired on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallEvent {
    /// Caller started talking; playback logic uses it to barge in on prompts
    DetectedSpeech,
}

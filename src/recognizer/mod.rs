//! Streaming speech-recognition backend interface
//!
//! The recognizer itself (transport, auth, grammar of its results) lives
//! outside this crate. The core only needs to open a stream per session,
//! hand it audio without blocking, receive its signals and clean it up.

use crate::audio::AudioFrame;
use crate::session::SessionConfig;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Signal emitted by the recognizer, mapped from its wire vocabulary.
///
/// Anything the vocabulary does not name is a results payload and is kept
/// verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    VadDetected,
    EndOfUtterance,
    StartOfTranscript,
    EndOfTranscript,
    MaxDurationExceeded,
    NoAudioDetected,
    PlayInterrupt,
    Results(String),
}

impl Signal {
    /// Map a wire signal name. Unknown names carry `payload` as results.
    pub fn from_wire(name: &str, payload: impl Into<String>) -> Self {
        match name {
            "vad_detected" => Signal::VadDetected,
            "end_of_utterance" => Signal::EndOfUtterance,
            "start_of_transcript" => Signal::StartOfTranscript,
            "end_of_transcript" => Signal::EndOfTranscript,
            "max_duration_exceeded" => Signal::MaxDurationExceeded,
            "no_audio" => Signal::NoAudioDetected,
            "play_interrupt" => Signal::PlayInterrupt,
            _ => Signal::Results(payload.into()),
        }
    }

    /// Wire name; `None` for results
    pub fn wire_name(&self) -> Option<&'static str> {
        match self {
            Signal::VadDetected => Some("vad_detected"),
            Signal::EndOfUtterance => Some("end_of_utterance"),
            Signal::StartOfTranscript => Some("start_of_transcript"),
            Signal::EndOfTranscript => Some("end_of_transcript"),
            Signal::MaxDurationExceeded => Some("max_duration_exceeded"),
            Signal::NoAudioDetected => Some("no_audio"),
            Signal::PlayInterrupt => Some("play_interrupt"),
            Signal::Results(_) => None,
        }
    }
}

/// Receiver of recognizer signals.
///
/// Called from the recognizer's own I/O task, concurrently with audio delivery.
pub trait SignalSink: Send + Sync {
    fn on_signal(&self, signal: Signal);
}

/// Everything a recognizer needs to open a stream for one session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamRequest {
    pub stream_id: Uuid,
    pub call_id: String,
    pub bug_name: String,
    pub config: SessionConfig,
}

/// Process-scoped recognizer handle.
///
/// Constructed once by the hosting application and shut down once on exit.
#[async_trait::async_trait]
pub trait RecognizerBackend: Send + Sync {
    /// Open a recognition stream; signals for it go to `sink`
    async fn open(
        &self,
        request: StreamRequest,
        sink: Arc<dyn SignalSink>,
    ) -> Result<Box<dyn RecognizerStream>>;

    /// Release process-wide resources. No stream may be opened afterwards.
    async fn shutdown(&self) -> Result<()>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// One open recognition stream
#[async_trait::async_trait]
pub trait RecognizerStream: Send + Sync {
    /// Queue a frame for the recognizer. Must not block or do network I/O inline.
    fn submit_frame(&self, frame: AudioFrame) -> Result<()>;

    /// End the stream. `is_final` is set when the call itself is going away
    /// (flush what was heard) and clear on an explicit stop (cancel).
    async fn cleanup(&self, is_final: bool) -> Result<()>;
}

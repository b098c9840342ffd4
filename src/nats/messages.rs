use crate::audio::{AudioFrame, CodecInfo};
use crate::events::{CallEvent, Event};
use crate::recognizer::Signal;
use crate::session::SessionConfig;
use anyhow::{Context, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

fn encode_pcm(frame: &AudioFrame) -> String {
    base64::engine::general_purpose::STANDARD.encode(frame.to_pcm_bytes())
}

fn decode_pcm(pcm: &str) -> Result<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(pcm)
        .context("Invalid base64 PCM payload")
}

fn default_channels() -> u16 {
    1
}

// ============================================================================
// Recognizer
// ============================================================================

/// Sent once before the first frame of a recognition stream
#[derive(Debug, Serialize, Deserialize)]
pub struct StreamOpenMessage {
    pub stream_id: String,
    pub call_id: String,
    pub bug_name: String,
    pub config: SessionConfig,
    pub timestamp: String, // RFC3339 timestamp
}

/// Audio frame published to the recognizer
#[derive(Debug, Serialize, Deserialize)]
pub struct AudioFrameMessage {
    pub stream_id: String,
    pub sequence: u32,
    pub pcm: String, // Base64-encoded PCM bytes
    pub sample_rate: u32,
    pub channels: u16,
    pub timestamp: String, // RFC3339 timestamp
    #[serde(rename = "final")]
    pub final_frame: bool,
    /// On the final marker: drop buffered audio instead of flushing it
    #[serde(default)]
    pub abort: bool,
}

impl AudioFrameMessage {
    pub fn from_frame(stream_id: &str, sequence: u32, frame: &AudioFrame) -> Self {
        Self {
            stream_id: stream_id.to_string(),
            sequence,
            pcm: encode_pcm(frame),
            sample_rate: frame.sample_rate,
            channels: frame.channels,
            timestamp: chrono::Utc::now().to_rfc3339(),
            final_frame: false,
            abort: false,
        }
    }

    /// End-of-stream marker; `abort` cancels instead of flushing
    pub fn final_marker(stream_id: &str, sequence: u32, abort: bool) -> Self {
        Self {
            stream_id: stream_id.to_string(),
            sequence,
            pcm: String::new(),
            sample_rate: 0,
            channels: 0,
            timestamp: chrono::Utc::now().to_rfc3339(),
            final_frame: true,
            abort,
        }
    }
}

/// Signal envelope received from the recognizer.
///
/// `name` is the signal vocabulary; anything it does not name (or no name at
/// all) makes `payload` a results document.
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignalMessage {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub payload: Option<String>,
}

impl SignalMessage {
    pub fn into_signal(self) -> Signal {
        Signal::from_wire(
            self.name.as_deref().unwrap_or_default(),
            self.payload.unwrap_or_default(),
        )
    }
}

/// Decode one message from the recognizer's signal subject.
///
/// Only an object made of `name` and/or `payload` is an envelope. Anything
/// else is a bare results document and is passed on as received.
pub fn decode_signal(bytes: &[u8]) -> Signal {
    if let Ok(message) = serde_json::from_slice::<SignalMessage>(bytes) {
        if message.name.is_some() || message.payload.is_some() {
            return message.into_signal();
        }
    }

    match std::str::from_utf8(bytes) {
        Ok(text) => Signal::Results(text.to_string()),
        Err(e) => {
            warn!("Results payload is not valid UTF-8 ({}), passing it on lossily", e);
            Signal::Results(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

// ============================================================================
// Telephony host
// ============================================================================

/// Reply to `<calls>.<call-id>.locate`
#[derive(Debug, Serialize, Deserialize)]
pub struct CallInfoMessage {
    pub call_id: String,
    #[serde(default)]
    pub variables: HashMap<String, String>,
    #[serde(default)]
    pub read_codec: CodecInfo,
}

/// Request to attach (or detach) an interceptor
#[derive(Debug, Serialize, Deserialize)]
pub struct AttachMessage {
    pub call_id: String,
    pub bug_name: String,
    pub read_stream: bool,
    pub write_stream: bool,
    pub stereo: bool,
    /// Where the host must publish intercepted media
    pub media_subject: String,
}

/// Generic host acknowledgement
#[derive(Debug, Serialize, Deserialize)]
pub struct AckMessage {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Intercepted media published by the host
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MediaMessage {
    Frame {
        pcm: String, // Base64-encoded PCM bytes
        sample_rate: u32,
        #[serde(default = "default_channels")]
        channels: u16,
        #[serde(default)]
        timestamp_ms: u64,
    },
    Hangup,
}

impl MediaMessage {
    pub fn frame(frame: &AudioFrame) -> Self {
        MediaMessage::Frame {
            pcm: encode_pcm(frame),
            sample_rate: frame.sample_rate,
            channels: frame.channels,
            timestamp_ms: frame.timestamp_ms,
        }
    }

    /// Decoded frame, `None` for control messages
    pub fn to_frame(&self) -> Result<Option<AudioFrame>> {
        match self {
            MediaMessage::Frame {
                pcm,
                sample_rate,
                channels,
                timestamp_ms,
            } => {
                let bytes = decode_pcm(pcm)?;
                Ok(Some(AudioFrame::from_pcm_bytes(
                    &bytes,
                    *sample_rate,
                    *channels,
                    *timestamp_ms,
                )))
            }
            MediaMessage::Hangup => Ok(None),
        }
    }
}

// ============================================================================
// Events
// ============================================================================

/// Custom event as published on `<events>.<call-id>`
#[derive(Debug, Serialize, Deserialize)]
pub struct EventMessage {
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Option<String>,
}

impl From<&Event> for EventMessage {
    fn from(event: &Event) -> Self {
        Self {
            headers: event
                .headers()
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
            body: event.body.clone(),
        }
    }
}

/// Event queued on a call, published on `<calls>.<call-id>.queue`
#[derive(Debug, Serialize, Deserialize)]
pub struct CallEventMessage {
    pub call_id: String,
    pub event: CallEvent,
}

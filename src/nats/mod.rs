//! NATS adapters for the telephony host, the recognizer and the event bus
//!
//! The transcription service sits on a NATS bus next to the media server and
//! the recognizer gateway. Subject prefixes come from `SubjectsConfig`.

pub mod bus;
pub mod client;
pub mod host;
pub mod messages;
pub mod recognizer;

pub use bus::NatsEventBus;
pub use client::NatsClient;
pub use host::NatsCallLocator;
pub use messages::{
    decode_signal, AckMessage, AttachMessage, AudioFrameMessage, CallEventMessage,
    CallInfoMessage, EventMessage, MediaMessage, SignalMessage, StreamOpenMessage,
};
pub use recognizer::NatsRecognizer;

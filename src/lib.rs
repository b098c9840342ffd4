pub mod audio;
pub mod call;
pub mod config;
pub mod control;
pub mod error;
pub mod events;
pub mod http;
pub mod nats;
pub mod recognizer;
pub mod session;

pub use audio::{AudioFrame, CodecInfo};
pub use call::{Call, CallLocator, CallRef, InterceptFlags, Interception, MediaEvent, MediaSink, VariableStore};
pub use config::Config;
pub use control::{Command, CommandOutcome, ControlHandler};
pub use error::{Result, TranscribeError};
pub use events::{CallEvent, Event, EventBus, EventKind, EventNormalizer};
pub use http::{create_router, AppState};
pub use nats::{NatsCallLocator, NatsClient, NatsEventBus, NatsRecognizer};
pub use recognizer::{RecognizerBackend, RecognizerStream, Signal, SignalSink, StreamRequest};
pub use session::{SessionConfig, SessionKey, SessionManager, SessionState, SessionStats, StartRequest};

use super::config::SessionConfig;
use super::stats::SessionStats;
use crate::audio::AudioFrame;
use crate::call::Interception;
use crate::events::EventNormalizer;
use crate::recognizer::{RecognizerStream, Signal, SignalSink};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// (call id, bug-name): at most one session per key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub call_id: String,
    pub bug_name: String,
}

impl SessionKey {
    pub fn new(call_id: impl Into<String>, bug_name: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            bug_name: bug_name.into(),
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.call_id, self.bug_name)
    }
}

/// Lifecycle state. `Closed` is terminal and equivalent to no session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Starting,
    Active,
    Closing,
    Closed,
}

impl SessionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => SessionState::Starting,
            1 => SessionState::Active,
            2 => SessionState::Closing,
            _ => SessionState::Closed,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            SessionState::Starting => 0,
            SessionState::Active => 1,
            SessionState::Closing => 2,
            SessionState::Closed => 3,
        }
    }
}

/// Atomic state shared by a session, its audio tap and its signal relay
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new(state: SessionState) -> Self {
        Self(AtomicU8::new(state.as_u8()))
    }

    pub(crate) fn get(&self) -> SessionState {
        SessionState::from_u8(self.0.load(Ordering::SeqCst))
    }

    fn set(&self, state: SessionState) {
        self.0.store(state.as_u8(), Ordering::SeqCst);
    }

    /// Move to `to` if currently in one of `from`. Only one caller can win.
    fn transition(&self, from: &[SessionState], to: SessionState) -> bool {
        self.0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                from.contains(&SessionState::from_u8(current))
                    .then_some(to.as_u8())
            })
            .is_ok()
    }
}

/// What triggered a teardown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TeardownCause {
    /// Explicit stop or restart: cancel the stream, detach the interceptor
    Stop,
    /// Interceptor closed with the call: flush the stream, nothing to detach
    CallClosed,
}

/// Forwards recognizer signals to the normalizer until the session is closed
pub(crate) struct SignalRelay {
    state: Arc<StateCell>,
    normalizer: Arc<EventNormalizer>,
}

impl SignalRelay {
    pub(crate) fn new(state: Arc<StateCell>, normalizer: Arc<EventNormalizer>) -> Self {
        Self { state, normalizer }
    }
}

impl SignalSink for SignalRelay {
    fn on_signal(&self, signal: Signal) {
        if self.state.get() == SessionState::Closed {
            debug!(
                "Dropping {:?} for closed session on {}",
                signal.wire_name().unwrap_or("results"),
                self.normalizer.call_id()
            );
            return;
        }
        self.normalizer.dispatch(signal);
    }
}

/// One transcription session: a recognizer stream fed by an interceptor
pub struct Session {
    id: Uuid,
    key: SessionKey,
    config: SessionConfig,
    started_at: DateTime<Utc>,
    state: Arc<StateCell>,
    normalizer: Arc<EventNormalizer>,
    stream: Box<dyn RecognizerStream>,
    interception: Mutex<Option<Box<dyn Interception>>>,
    frames_relayed: AtomicU64,
    frames_dropped: AtomicU64,
}

impl Session {
    pub(crate) fn new(
        id: Uuid,
        key: SessionKey,
        config: SessionConfig,
        state: Arc<StateCell>,
        normalizer: Arc<EventNormalizer>,
        stream: Box<dyn RecognizerStream>,
    ) -> Self {
        Self {
            id,
            key,
            config,
            started_at: Utc::now(),
            state,
            normalizer,
            stream,
            interception: Mutex::new(None),
            frames_relayed: AtomicU64::new(0),
            frames_dropped: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            session_id: self.id,
            call_id: self.key.call_id.clone(),
            bug_name: self.key.bug_name.clone(),
            state: self.state(),
            language: self.config.language.clone(),
            channels: self.config.channels,
            sample_rate: self.config.sample_rate,
            started_at: self.started_at,
            frames_relayed: self.frames_relayed.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn set_interception(&self, interception: Box<dyn Interception>) {
        *self.interception.lock().unwrap_or_else(PoisonError::into_inner) = Some(interception);
    }

    pub(crate) fn activate(&self) -> bool {
        self.state
            .transition(&[SessionState::Starting], SessionState::Active)
    }

    /// Hand a frame to the recognizer. Frames outside `Active` are dropped.
    pub(crate) fn relay_frame(&self, frame: AudioFrame) -> bool {
        if self.state() != SessionState::Active {
            self.frames_dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        match self.stream.submit_frame(frame) {
            Ok(()) => {
                self.frames_relayed.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(e) => {
                self.frames_dropped.fetch_add(1, Ordering::Relaxed);
                debug!("Recognizer refused frame for {}: {:#}", self.key, e);
                false
            }
        }
    }

    /// Interceptor reported it is live
    pub(crate) fn interceptor_ready(&self) {
        info!("Interceptor initialized for {}", self.key);
        self.normalizer.dispatch(Signal::StartOfTranscript);
    }

    /// Claim the teardown. Returns false if someone else already did.
    pub(crate) fn begin_close(&self) -> bool {
        self.state.transition(
            &[SessionState::Starting, SessionState::Active],
            SessionState::Closing,
        )
    }

    /// Run the teardown claimed by `begin_close`
    pub(crate) async fn teardown(&self, cause: TeardownCause) -> Result<()> {
        self.normalizer.dispatch(Signal::EndOfTranscript);

        let is_final = cause == TeardownCause::CallClosed;
        info!("Cleaning up recognizer stream for {} (final={})", self.key, is_final);
        let cleanup = self.stream.cleanup(is_final).await;

        let interception = self
            .interception
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let (TeardownCause::Stop, Some(interception)) = (cause, interception) {
            if let Err(e) = interception.detach().await {
                warn!("Failed to detach interceptor for {}: {:#}", self.key, e);
            }
        }

        self.state.set(SessionState::Closed);
        cleanup
    }

    /// Undo a start that failed after the recognizer stream was opened
    pub(crate) async fn abort(&self) {
        self.state.set(SessionState::Closing);
        if let Err(e) = self.stream.cleanup(false).await {
            warn!("Failed to release recognizer stream for {}: {:#}", self.key, e);
        }
        self.state.set(SessionState::Closed);
    }
}

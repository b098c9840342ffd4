use super::config::SessionConfig;
use super::session::{Session, SessionKey, SessionState, SignalRelay, StateCell, TeardownCause};
use super::stats::SessionStats;
use crate::call::{Call, InterceptFlags, MediaEvent, MediaSink};
use crate::error::{Result, TranscribeError};
use crate::events::{EventBus, EventNormalizer};
use crate::recognizer::{RecognizerBackend, StreamRequest};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::runtime::Handle;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Per-key lock guarding the key's (at most one) registered session
type Slot = Arc<AsyncMutex<Option<Arc<Session>>>>;

/// Parameters of a start command
#[derive(Debug, Clone)]
pub struct StartRequest {
    pub language: String,
    pub interim: bool,
    pub flags: InterceptFlags,
    pub bug_name: String,
}

/// Owns all transcription sessions and serializes their transitions per key.
///
/// Start, stop and interceptor close for the same `SessionKey` never run
/// concurrently; different keys proceed independently.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    backend: Arc<dyn RecognizerBackend>,
    bus: Arc<dyn EventBus>,
    vendor: String,
    slots: Mutex<HashMap<SessionKey, Slot>>,
}

impl SessionManager {
    pub fn new(
        backend: Arc<dyn RecognizerBackend>,
        bus: Arc<dyn EventBus>,
        vendor: impl Into<String>,
    ) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                backend,
                bus,
                vendor: vendor.into(),
                slots: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Start transcribing `call` under `request.bug_name`.
    ///
    /// An existing session on the same key is fully torn down first. On any
    /// failure nothing stays registered and no recognizer stream is leaked.
    pub async fn start(&self, call: &dyn Call, request: StartRequest) -> Result<Uuid> {
        let key = SessionKey::new(call.id(), request.bug_name.clone());
        let slot = self.inner.slot(&key);

        let result = {
            let mut current = slot.lock().await;

            if let Some(previous) = current.clone() {
                debug!("Removing session {} from previous transcribe on {}", previous.id(), key);
                if let Err(e) = self.inner.close(&previous, TeardownCause::Stop).await {
                    warn!("Previous session on {} did not close cleanly: {}", key, e);
                }
                *current = None;
            }

            match self.inner.open_session(call, &key, &request).await {
                Ok(session) => {
                    let id = session.id();
                    *current = Some(session);
                    Ok(id)
                }
                Err(e) => Err(e),
            }
        };

        drop(slot);
        self.inner.prune(&key);
        result
    }

    /// Stop the session on (`call_id`, `bug_name`). No session is not an error.
    pub async fn stop(&self, call_id: &str, bug_name: &str) -> Result<()> {
        let key = SessionKey::new(call_id, bug_name);
        let Some(slot) = self.inner.existing_slot(&key) else {
            debug!("No session on {}, nothing to stop", key);
            return Ok(());
        };

        let result = {
            let mut current = slot.lock().await;
            match current.clone() {
                Some(session) => {
                    info!("Stopping transcription on {}", key);
                    let closed = self.inner.close(&session, TeardownCause::Stop).await;
                    *current = None;
                    closed
                }
                None => Ok(()),
            }
        };

        drop(slot);
        self.inner.prune(&key);
        result
    }

    /// Snapshots of the sessions registered on a call
    pub async fn sessions(&self, call_id: &str) -> Vec<SessionStats> {
        let mut stats = Vec::new();
        for (key, slot) in self.inner.all_slots() {
            if key.call_id != call_id {
                continue;
            }
            if let Some(session) = slot.lock().await.as_ref() {
                stats.push(session.stats());
            }
        }
        stats.sort_by(|a, b| a.bug_name.cmp(&b.bug_name));
        stats
    }

    /// Snapshot of one session
    pub async fn session(&self, call_id: &str, bug_name: &str) -> Option<SessionStats> {
        let slot = self.inner.existing_slot(&SessionKey::new(call_id, bug_name))?;
        let current = slot.lock().await;
        current.as_ref().map(|session| session.stats())
    }

    /// Number of registered sessions across all calls
    pub async fn session_count(&self) -> usize {
        let mut count = 0;
        for (_, slot) in self.inner.all_slots() {
            if slot.lock().await.is_some() {
                count += 1;
            }
        }
        count
    }

    /// Stop every registered session. Returns how many were stopped.
    pub async fn shutdown(&self) -> usize {
        let mut stopped = 0;
        for (key, slot) in self.inner.all_slots() {
            let mut current = slot.lock().await;
            if let Some(session) = current.clone() {
                if let Err(e) = self.inner.close(&session, TeardownCause::Stop).await {
                    warn!("Session on {} did not close cleanly: {}", key, e);
                }
                *current = None;
                stopped += 1;
            }
            drop(current);
            drop(slot);
            self.inner.prune(&key);
        }
        info!("Stopped {} transcription session(s)", stopped);
        stopped
    }
}

impl ManagerInner {
    fn slot(&self, key: &SessionKey) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(key.clone()).or_default())
    }

    fn existing_slot(&self, key: &SessionKey) -> Option<Slot> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.get(key).cloned()
    }

    fn all_slots(&self) -> Vec<(SessionKey, Slot)> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots
            .iter()
            .map(|(key, slot)| (key.clone(), Arc::clone(slot)))
            .collect()
    }

    /// Forget the key's lock once nobody holds it and no session is registered
    fn prune(&self, key: &SessionKey) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let idle = match slots.get(key) {
            Some(slot) => {
                Arc::strong_count(slot) == 1
                    && slot.try_lock().map(|current| current.is_none()).unwrap_or(false)
            }
            None => false,
        };
        if idle {
            slots.remove(key);
        }
    }

    /// Steps (b) to (f) of a start; the caller holds the key's lock
    async fn open_session(
        self: &Arc<Self>,
        call: &dyn Call,
        key: &SessionKey,
        request: &StartRequest,
    ) -> Result<Arc<Session>> {
        call.pre_answer()
            .await
            .map_err(|e| TranscribeError::Precondition {
                call_id: key.call_id.clone(),
                reason: format!("{:#}", e),
            })?;

        let sample_rate = call.read_codec().effective_sample_rate();
        let config = SessionConfig::resolve(
            call,
            request.language.clone(),
            request.interim,
            request.flags.channels(),
            sample_rate,
        );

        let normalizer = Arc::new(EventNormalizer::new(
            key.call_id.clone(),
            Some(key.bug_name.clone()),
            self.vendor.clone(),
            Arc::clone(&self.bus),
        ));
        let state = Arc::new(StateCell::new(SessionState::Starting));
        let relay = Arc::new(SignalRelay::new(Arc::clone(&state), Arc::clone(&normalizer)));

        let stream_id = Uuid::new_v4();
        let stream_request = StreamRequest {
            stream_id,
            call_id: key.call_id.clone(),
            bug_name: key.bug_name.clone(),
            config: config.clone(),
        };
        let stream = self
            .backend
            .open(stream_request, relay)
            .await
            .map_err(|e| {
                error!("Error initializing {} session for {}: {:#}", self.backend.name(), key, e);
                TranscribeError::BackendInit {
                    session: key.to_string(),
                    reason: format!("{:#}", e),
                }
            })?;

        let session = Arc::new(Session::new(
            stream_id,
            key.clone(),
            config,
            state,
            normalizer,
            stream,
        ));
        let tap = Arc::new(SessionTap {
            session: Arc::downgrade(&session),
            manager: Arc::downgrade(self),
            runtime: Handle::current(),
        });

        match call.attach_interceptor(&key.bug_name, request.flags, tap).await {
            Ok(interception) => session.set_interception(interception),
            Err(e) => {
                error!("Failed to attach interceptor {}: {:#}", key, e);
                session.abort().await;
                return Err(TranscribeError::Attach {
                    session: key.to_string(),
                    reason: format!("{:#}", e),
                });
            }
        }

        if !session.activate() {
            warn!("Session {} left Starting before activation", key);
        }
        info!(
            "Transcription active on {} ({}, {}Hz, {} channel(s))",
            key,
            session.config().language,
            session.config().sample_rate,
            session.config().channels
        );

        Ok(session)
    }

    async fn close(&self, session: &Session, cause: TeardownCause) -> Result<()> {
        if !session.begin_close() {
            debug!("Session {} already closing", session.key());
            return Ok(());
        }
        session
            .teardown(cause)
            .await
            .map_err(|e| TranscribeError::Backend(format!("{:#}", e)))
    }

    /// Teardown driven by the interceptor closing with the call
    async fn interceptor_closed(self: Arc<Self>, session: Arc<Session>) {
        let key = session.key().clone();
        let slot = self.slot(&key);
        {
            let mut current = slot.lock().await;
            if let Err(e) = self.close(&session, TeardownCause::CallClosed).await {
                warn!("Session on {} did not close cleanly: {}", key, e);
            }
            if current.as_ref().is_some_and(|s| s.id() == session.id()) {
                *current = None;
            }
        }
        drop(slot);
        self.prune(&key);
    }
}

/// Interceptor callback of one session, runs on the media thread
struct SessionTap {
    session: Weak<Session>,
    manager: Weak<ManagerInner>,
    runtime: Handle,
}

impl MediaSink for SessionTap {
    fn on_media(&self, event: MediaEvent) {
        let Some(session) = self.session.upgrade() else {
            return;
        };

        match event {
            MediaEvent::Init => session.interceptor_ready(),
            MediaEvent::Frame(frame) => {
                session.relay_frame(frame);
            }
            MediaEvent::Close => {
                if matches!(session.state(), SessionState::Closing | SessionState::Closed) {
                    return;
                }
                info!("Interceptor closed for {}, cleaning up", session.key());
                if let Some(manager) = self.manager.upgrade() {
                    self.runtime.spawn(manager.interceptor_closed(session));
                }
            }
        }
    }
}

use super::{CallEvent, Event, EventBus, EventKind};
use crate::error::TranscribeError;
use crate::recognizer::{Signal, SignalSink};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Turns recognizer signals into platform events for one session
pub struct EventNormalizer {
    call_id: String,
    bug_name: Option<String>,
    vendor: String,
    bus: Arc<dyn EventBus>,
}

impl EventNormalizer {
    pub fn new(
        call_id: impl Into<String>,
        bug_name: Option<String>,
        vendor: impl Into<String>,
        bus: Arc<dyn EventBus>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            bug_name,
            vendor: vendor.into(),
            bus,
        }
    }

    /// Map a signal to the event it produces
    pub fn normalize(&self, signal: Signal) -> Event {
        let (kind, body) = match signal {
            Signal::VadDetected => (EventKind::VadDetected, None),
            Signal::EndOfUtterance => (EventKind::EndOfUtterance, None),
            Signal::StartOfTranscript => (EventKind::StartOfTranscript, None),
            Signal::EndOfTranscript => (EventKind::EndOfTranscript, None),
            Signal::MaxDurationExceeded => (EventKind::MaxDurationExceeded, None),
            Signal::NoAudioDetected => (EventKind::NoAudioDetected, None),
            Signal::PlayInterrupt => (EventKind::PlayInterrupt, None),
            Signal::Results(payload) => (EventKind::Results, Some(payload)),
        };

        Event {
            kind,
            call_id: self.call_id.clone(),
            vendor: self.vendor.clone(),
            bug_name: self.bug_name.clone(),
            body,
        }
    }

    /// Normalize and deliver a signal.
    ///
    /// `PlayInterrupt` first queues `DetectedSpeech` on the call, then fires
    /// its custom event whether or not queuing worked.
    pub fn dispatch(&self, signal: Signal) {
        match &signal {
            Signal::PlayInterrupt => {
                if let Err(e) = self
                    .bus
                    .queue_call_event(&self.call_id, CallEvent::DetectedSpeech)
                {
                    error!("Unable to queue play interrupt event on {}: {:#}", self.call_id, e);
                }
            }
            Signal::Results(payload) => {
                info!(
                    "{} json payload: {}",
                    self.bug_name.as_deref().unwrap_or(crate::control::DEFAULT_BUG_NAME),
                    payload
                );
            }
            _ => {}
        }

        let event = self.normalize(signal);
        let kind = event.kind;
        if let Err(e) = self.bus.fire(event) {
            let err = TranscribeError::Delivery(format!("{:#}", e));
            warn!("Dropping {:?} event for {}: {}", kind, self.call_id, err);
        }
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }
}

impl SignalSink for EventNormalizer {
    fn on_signal(&self, signal: Signal) {
        self.dispatch(signal);
    }
}

//! Platform event taxonomy and delivery
//!
//! Recognizer signals are normalized into `Event`s (custom events with a
//! subclass, vendor and bug-name header) and handed to an `EventBus`.

mod event;
mod normalizer;

pub use event::{CallEvent, Event, EventKind, EVENT_SUBCLASS_PREFIX};
pub use normalizer::EventNormalizer;

use anyhow::Result;

/// Thread-safe, fire-and-forget event delivery into the telephony platform
pub trait EventBus: Send + Sync {
    /// Fire a custom event. Must not block on consumers.
    fn fire(&self, event: Event) -> Result<()>;

    /// Queue an event on the call's own event queue
    fn queue_call_event(&self, call_id: &str, event: CallEvent) -> Result<()>;
}

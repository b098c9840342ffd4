//! Telephony host interfaces
//!
//! The host owns calls, their variables and the media interceptor ("bug")
//! mechanism. This module describes what the transcription core needs from it:
//! - `CallLocator` resolves a call id to a live `CallRef`
//! - `Call` exposes variables, the read codec, pre-answer and interceptor attach
//! - `MediaSink` receives init/frame/close notifications on the audio thread

use crate::audio::{AudioFrame, CodecInfo};
use anyhow::Result;
use std::collections::HashMap;
use std::ops::Deref;
use std::sync::Arc;

/// Read access to a call's named variables
pub trait VariableStore: Send + Sync {
    fn variable(&self, name: &str) -> Option<String>;
}

impl VariableStore for HashMap<String, String> {
    fn variable(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Which streams the interceptor taps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InterceptFlags {
    /// Audio received from the caller
    pub read_stream: bool,
    /// Audio sent to the caller
    pub write_stream: bool,
    /// Deliver read and write as two interleaved channels
    pub stereo: bool,
}

impl InterceptFlags {
    /// Read-only, single channel
    pub fn mono() -> Self {
        Self {
            read_stream: true,
            write_stream: false,
            stereo: false,
        }
    }

    /// Both directions, two channels
    pub fn stereo() -> Self {
        Self {
            read_stream: true,
            write_stream: true,
            stereo: true,
        }
    }

    pub fn channels(&self) -> u16 {
        if self.stereo {
            2
        } else {
            1
        }
    }
}

/// Notification delivered by an attached interceptor
#[derive(Debug, Clone)]
pub enum MediaEvent {
    /// Interceptor is live on the call
    Init,
    /// One frame of intercepted audio
    Frame(AudioFrame),
    /// Interceptor is being removed (detach or call teardown)
    Close,
}

/// Receiver of interceptor notifications.
///
/// Invoked on the host's media thread: implementations must return quickly
/// and never block.
pub trait MediaSink: Send + Sync {
    fn on_media(&self, event: MediaEvent);
}

/// Handle to an attached interceptor
#[async_trait::async_trait]
pub trait Interception: Send + Sync {
    /// Remove the interceptor from the call
    async fn detach(&self) -> Result<()>;
}

/// A live call on the telephony host
#[async_trait::async_trait]
pub trait Call: VariableStore {
    fn id(&self) -> &str;

    /// Codec negotiated for audio read from the call
    fn read_codec(&self) -> CodecInfo;

    /// Put the call in a state where media flows (early media if not answered yet)
    async fn pre_answer(&self) -> Result<()>;

    /// Attach an audio interceptor named `bug_name`
    async fn attach_interceptor(
        &self,
        bug_name: &str,
        flags: InterceptFlags,
        sink: Arc<dyn MediaSink>,
    ) -> Result<Box<dyn Interception>>;

    /// Drop the reference taken by `CallLocator::locate`
    fn release(&self) {}
}

/// Resolves call ids to live calls
#[async_trait::async_trait]
pub trait CallLocator: Send + Sync {
    /// `Ok(None)` when no such call exists
    async fn locate(&self, call_id: &str) -> Result<Option<CallRef>>;
}

/// Counted reference to a located call, released on drop
pub struct CallRef {
    call: Arc<dyn Call>,
}

impl CallRef {
    pub fn new(call: Arc<dyn Call>) -> Self {
        Self { call }
    }
}

impl Deref for CallRef {
    type Target = dyn Call;

    fn deref(&self) -> &Self::Target {
        self.call.as_ref()
    }
}

impl Drop for CallRef {
    fn drop(&mut self) {
        self.call.release();
    }
}

// In-memory stand-ins for the telephony host, recognizer and event bus.
//
// Every interaction is recorded so tests can assert on order and counts.

#![allow(dead_code)]

use anyhow::{anyhow, bail, Result};
use nuance_transcribe::call::{
    Call, CallLocator, CallRef, InterceptFlags, Interception, MediaEvent, MediaSink, VariableStore,
};
use nuance_transcribe::events::{CallEvent, Event, EventBus, EventKind};
use nuance_transcribe::recognizer::{
    RecognizerBackend, RecognizerStream, SignalSink, StreamRequest,
};
use nuance_transcribe::session::SessionManager;
use nuance_transcribe::{AudioFrame, CodecInfo};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// Event bus
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Fired(Event),
    Queued(String, CallEvent),
}

#[derive(Default)]
pub struct RecordingBus {
    pub deliveries: Mutex<Vec<Delivery>>,
    pub fail_queue: AtomicBool,
    pub fail_fire: AtomicBool,
}

impl RecordingBus {
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().unwrap().clone()
    }

    pub fn events(&self) -> Vec<Event> {
        self.deliveries()
            .into_iter()
            .filter_map(|d| match d {
                Delivery::Fired(event) => Some(event),
                Delivery::Queued(..) => None,
            })
            .collect()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.events().into_iter().map(|e| e.kind).collect()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.kinds().into_iter().filter(|k| *k == kind).count()
    }
}

impl EventBus for RecordingBus {
    fn fire(&self, event: Event) -> Result<()> {
        if self.fail_fire.load(Ordering::SeqCst) {
            bail!("bus down");
        }
        self.deliveries.lock().unwrap().push(Delivery::Fired(event));
        Ok(())
    }

    fn queue_call_event(&self, call_id: &str, event: CallEvent) -> Result<()> {
        if self.fail_queue.load(Ordering::SeqCst) {
            bail!("queue full");
        }
        self.deliveries
            .lock()
            .unwrap()
            .push(Delivery::Queued(call_id.to_string(), event));
        Ok(())
    }
}

// ============================================================================
// Recognizer
// ============================================================================

#[derive(Default)]
pub struct FakeStream {
    pub frames: Mutex<Vec<AudioFrame>>,
    pub cleanups: Mutex<Vec<bool>>,
    pub fail_cleanup: AtomicBool,
}

impl FakeStream {
    pub fn frame_count(&self) -> usize {
        self.frames.lock().unwrap().len()
    }

    pub fn cleanups(&self) -> Vec<bool> {
        self.cleanups.lock().unwrap().clone()
    }
}

struct StreamHandle(Arc<FakeStream>);

#[async_trait::async_trait]
impl RecognizerStream for StreamHandle {
    fn submit_frame(&self, frame: AudioFrame) -> Result<()> {
        if !self.0.cleanups.lock().unwrap().is_empty() {
            bail!("stream already cleaned up");
        }
        self.0.frames.lock().unwrap().push(frame);
        Ok(())
    }

    async fn cleanup(&self, is_final: bool) -> Result<()> {
        self.0.cleanups.lock().unwrap().push(is_final);
        if self.0.fail_cleanup.load(Ordering::SeqCst) {
            bail!("cleanup failed");
        }
        Ok(())
    }
}

pub struct OpenedStream {
    pub request: StreamRequest,
    pub sink: Arc<dyn SignalSink>,
    pub stream: Arc<FakeStream>,
}

#[derive(Default)]
pub struct FakeBackend {
    pub opened: Mutex<Vec<OpenedStream>>,
    pub fail_open: AtomicBool,
    pub shutdowns: AtomicUsize,
}

impl FakeBackend {
    pub fn open_count(&self) -> usize {
        self.opened.lock().unwrap().len()
    }

    pub fn request(&self, index: usize) -> StreamRequest {
        self.opened.lock().unwrap()[index].request.clone()
    }

    pub fn stream(&self, index: usize) -> Arc<FakeStream> {
        Arc::clone(&self.opened.lock().unwrap()[index].stream)
    }

    pub fn sink(&self, index: usize) -> Arc<dyn SignalSink> {
        Arc::clone(&self.opened.lock().unwrap()[index].sink)
    }
}

#[async_trait::async_trait]
impl RecognizerBackend for FakeBackend {
    async fn open(
        &self,
        request: StreamRequest,
        sink: Arc<dyn SignalSink>,
    ) -> Result<Box<dyn RecognizerStream>> {
        if self.fail_open.load(Ordering::SeqCst) {
            bail!("invalid language");
        }
        let stream = Arc::new(FakeStream::default());
        self.opened.lock().unwrap().push(OpenedStream {
            request,
            sink,
            stream: Arc::clone(&stream),
        });
        Ok(Box::new(StreamHandle(stream)))
    }

    async fn shutdown(&self) -> Result<()> {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &str {
        "fake"
    }
}

// ============================================================================
// Telephony host
// ============================================================================

pub struct Attachment {
    pub bug_name: String,
    pub flags: InterceptFlags,
    pub sink: Arc<dyn MediaSink>,
    pub detaches: Arc<AtomicUsize>,
}

pub struct FakeCall {
    pub id: String,
    pub variables: HashMap<String, String>,
    pub codec: CodecInfo,
    pub fail_pre_answer: AtomicBool,
    pub fail_attach: AtomicBool,
    /// Deliver a frame during attach, before the session is active
    pub frame_on_attach: AtomicBool,
    pub pre_answers: AtomicUsize,
    pub releases: AtomicUsize,
    pub attachments: Mutex<Vec<Attachment>>,
}

impl FakeCall {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            variables: HashMap::new(),
            codec: CodecInfo::new("PCMU", 8000, 8000),
            fail_pre_answer: AtomicBool::new(false),
            fail_attach: AtomicBool::new(false),
            frame_on_attach: AtomicBool::new(false),
            pre_answers: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
            attachments: Mutex::new(Vec::new()),
        }
    }

    pub fn with_variable(mut self, name: &str, value: &str) -> Self {
        self.variables.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_codec(mut self, codec: CodecInfo) -> Self {
        self.codec = codec;
        self
    }

    pub fn attach_count(&self) -> usize {
        self.attachments.lock().unwrap().len()
    }

    pub fn flags(&self, index: usize) -> InterceptFlags {
        self.attachments.lock().unwrap()[index].flags
    }

    pub fn sink(&self, index: usize) -> Arc<dyn MediaSink> {
        Arc::clone(&self.attachments.lock().unwrap()[index].sink)
    }

    pub fn detaches(&self, index: usize) -> usize {
        self.attachments.lock().unwrap()[index]
            .detaches
            .load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

impl VariableStore for FakeCall {
    fn variable(&self, name: &str) -> Option<String> {
        self.variables.get(name).cloned()
    }
}

/// Detaching delivers `Close`, as the host does when a bug is removed
struct FakeInterception {
    sink: Arc<dyn MediaSink>,
    detaches: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl Interception for FakeInterception {
    async fn detach(&self) -> Result<()> {
        self.detaches.fetch_add(1, Ordering::SeqCst);
        self.sink.on_media(MediaEvent::Close);
        Ok(())
    }
}

#[async_trait::async_trait]
impl Call for FakeCall {
    fn id(&self) -> &str {
        &self.id
    }

    fn read_codec(&self) -> CodecInfo {
        self.codec.clone()
    }

    async fn pre_answer(&self) -> Result<()> {
        self.pre_answers.fetch_add(1, Ordering::SeqCst);
        if self.fail_pre_answer.load(Ordering::SeqCst) {
            bail!("channel is hung up");
        }
        Ok(())
    }

    async fn attach_interceptor(
        &self,
        bug_name: &str,
        flags: InterceptFlags,
        sink: Arc<dyn MediaSink>,
    ) -> Result<Box<dyn Interception>> {
        if self.fail_attach.load(Ordering::SeqCst) {
            return Err(anyhow!("media bug refused"));
        }

        sink.on_media(MediaEvent::Init);
        if self.frame_on_attach.load(Ordering::SeqCst) {
            sink.on_media(MediaEvent::Frame(frame(0)));
        }

        let detaches = Arc::new(AtomicUsize::new(0));
        self.attachments.lock().unwrap().push(Attachment {
            bug_name: bug_name.to_string(),
            flags,
            sink: Arc::clone(&sink),
            detaches: Arc::clone(&detaches),
        });

        Ok(Box::new(FakeInterception { sink, detaches }))
    }

    fn release(&self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// Shares `FakeCall`s with the code under test while keeping them inspectable
#[derive(Default)]
pub struct FakeLocator {
    pub calls: Mutex<HashMap<String, Arc<FakeCall>>>,
    pub fail: AtomicBool,
}

impl FakeLocator {
    pub fn add(&self, call: FakeCall) -> Arc<FakeCall> {
        let call = Arc::new(call);
        self.calls
            .lock()
            .unwrap()
            .insert(call.id.clone(), Arc::clone(&call));
        call
    }
}

#[async_trait::async_trait]
impl CallLocator for FakeLocator {
    async fn locate(&self, call_id: &str) -> Result<Option<CallRef>> {
        if self.fail.load(Ordering::SeqCst) {
            bail!("host unreachable");
        }
        let call = self.calls.lock().unwrap().get(call_id).cloned();
        Ok(call.map(|call| CallRef::new(call as Arc<dyn Call>)))
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub struct Harness {
    pub backend: Arc<FakeBackend>,
    pub bus: Arc<RecordingBus>,
    pub manager: SessionManager,
}

impl Harness {
    pub fn new() -> Self {
        let backend = Arc::new(FakeBackend::default());
        let bus = Arc::new(RecordingBus::default());
        let manager = SessionManager::new(
            Arc::clone(&backend) as Arc<dyn RecognizerBackend>,
            Arc::clone(&bus) as Arc<dyn EventBus>,
            "nuance",
        );
        Self {
            backend,
            bus,
            manager,
        }
    }
}

pub fn frame(timestamp_ms: u64) -> AudioFrame {
    AudioFrame {
        samples: vec![0; 160],
        sample_rate: 8000,
        channels: 1,
        timestamp_ms,
    }
}

/// Poll until `condition` holds, for work done on spawned tasks
pub async fn wait_until<F: Fn() -> bool>(condition: F) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

pub async fn wait_for_sessions(manager: &SessionManager, expected: usize) {
    for _ in 0..200 {
        if manager.session_count().await == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!(
        "expected {} session(s), still {}",
        expected,
        manager.session_count().await
    );
}

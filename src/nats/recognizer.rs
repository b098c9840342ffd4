use super::client::NatsClient;
use super::messages::{decode_signal, AudioFrameMessage, StreamOpenMessage};
use crate::audio::AudioFrame;
use crate::config::SubjectsConfig;
use crate::recognizer::{RecognizerBackend, RecognizerStream, SignalSink, StreamRequest};
use anyhow::{anyhow, bail, Context, Result};
use futures::stream::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Upper bound on waiting for queued frames to drain at cleanup
const FINISH_TIMEOUT: Duration = Duration::from_secs(5);

enum StreamCommand {
    Frame(AudioFrame),
    Finish { abort: bool, done: oneshot::Sender<()> },
}

/// Recognizer gateway reached over NATS.
///
/// One instance per process: create it at startup, call `shutdown` once on exit.
pub struct NatsRecognizer {
    client: NatsClient,
    subjects: SubjectsConfig,
    shut_down: AtomicBool,
}

impl NatsRecognizer {
    pub fn new(client: NatsClient, subjects: SubjectsConfig) -> Self {
        info!("Recognizer gateway on {}.*", subjects.recognizer_audio);
        Self {
            client,
            subjects,
            shut_down: AtomicBool::new(false),
        }
    }
}

#[async_trait::async_trait]
impl RecognizerBackend for NatsRecognizer {
    async fn open(
        &self,
        request: StreamRequest,
        sink: Arc<dyn SignalSink>,
    ) -> Result<Box<dyn RecognizerStream>> {
        if self.shut_down.load(Ordering::SeqCst) {
            bail!("Recognizer has been shut down");
        }

        let stream_id = request.stream_id.to_string();
        let audio_subject = format!("{}.{}", self.subjects.recognizer_audio, stream_id);

        // Subscribe to signals before the recognizer learns about the stream
        let mut signals = self
            .client
            .subscribe(format!("{}.{}", self.subjects.recognizer_signals, stream_id))
            .await?;

        let open = StreamOpenMessage {
            stream_id: stream_id.clone(),
            call_id: request.call_id.clone(),
            bug_name: request.bug_name.clone(),
            config: request.config.clone(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        self.client
            .publish_json(format!("{}.open", audio_subject), &open)
            .await
            .context("Failed to open recognition stream")?;

        info!(
            "Opened recognition stream {} for {}/{} ({}, {}Hz)",
            stream_id, request.call_id, request.bug_name, request.config.language, request.config.sample_rate
        );

        let signal_task = tokio::spawn(async move {
            while let Some(message) = signals.next().await {
                sink.on_signal(decode_signal(&message.payload));
            }
        });

        let (tx, mut rx) = mpsc::unbounded_channel::<StreamCommand>();
        let client = self.client.clone();
        let frame_stream_id = stream_id.clone();

        tokio::spawn(async move {
            let mut sequence: u32 = 0;

            while let Some(command) = rx.recv().await {
                match command {
                    StreamCommand::Frame(frame) => {
                        let message = AudioFrameMessage::from_frame(&frame_stream_id, sequence, &frame);
                        sequence = sequence.wrapping_add(1);
                        if let Err(e) = client.publish_json(audio_subject.clone(), &message).await {
                            warn!("Failed to publish audio frame: {:#}", e);
                        }
                    }
                    StreamCommand::Finish { abort, done } => {
                        let marker = AudioFrameMessage::final_marker(&frame_stream_id, sequence, abort);
                        if let Err(e) = client.publish_json(audio_subject.clone(), &marker).await {
                            warn!("Failed to send final frame: {:#}", e);
                        }
                        let _ = done.send(());
                        break;
                    }
                }
            }
        });

        Ok(Box::new(NatsRecognizerStream {
            stream_id,
            commands: Mutex::new(Some(tx)),
            signal_task: Mutex::new(Some(signal_task)),
        }))
    }

    async fn shutdown(&self) -> Result<()> {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        info!("Shutting down recognizer gateway");
        self.client.flush().await
    }

    fn name(&self) -> &str {
        "nuance"
    }
}

struct NatsRecognizerStream {
    stream_id: String,
    commands: Mutex<Option<mpsc::UnboundedSender<StreamCommand>>>,
    signal_task: Mutex<Option<JoinHandle<()>>>,
}

#[async_trait::async_trait]
impl RecognizerStream for NatsRecognizerStream {
    fn submit_frame(&self, frame: AudioFrame) -> Result<()> {
        let commands = self.commands.lock().unwrap_or_else(PoisonError::into_inner);
        match commands.as_ref() {
            Some(tx) => tx
                .send(StreamCommand::Frame(frame))
                .map_err(|_| anyhow!("frame pump for {} stopped", self.stream_id)),
            None => bail!("stream {} is closed", self.stream_id),
        }
    }

    async fn cleanup(&self, is_final: bool) -> Result<()> {
        let commands = self.commands.lock().unwrap_or_else(PoisonError::into_inner).take();
        let Some(commands) = commands else {
            return Ok(());
        };

        let (done_tx, done_rx) = oneshot::channel();
        let finished = match commands.send(StreamCommand::Finish {
            abort: !is_final,
            done: done_tx,
        }) {
            Ok(()) => match tokio::time::timeout(FINISH_TIMEOUT, done_rx).await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(_)) => Err(anyhow!("frame pump for {} stopped", self.stream_id)),
                Err(_) => Err(anyhow!("timed out finishing stream {}", self.stream_id)),
            },
            Err(_) => Err(anyhow!("frame pump for {} stopped", self.stream_id)),
        };

        let signal_task = self.signal_task.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(task) = signal_task {
            task.abort();
        }

        info!("Closed recognition stream {} (final={})", self.stream_id, is_final);
        finished
    }
}

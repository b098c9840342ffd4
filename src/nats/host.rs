use super::client::NatsClient;
use super::messages::{AckMessage, AttachMessage, CallInfoMessage, MediaMessage};
use crate::audio::CodecInfo;
use crate::call::{
    Call, CallLocator, CallRef, InterceptFlags, Interception, MediaEvent, MediaSink, VariableStore,
};
use crate::config::SubjectsConfig;
use anyhow::{bail, Result};
use futures::stream::StreamExt;
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

#[derive(Debug, Serialize)]
struct CallRequest<'a> {
    call_id: &'a str,
}

fn check_ack(ack: Option<AckMessage>, what: &str) -> Result<()> {
    match ack {
        Some(AckMessage { ok: true, .. }) => Ok(()),
        Some(AckMessage { error, .. }) => bail!(
            "{} refused: {}",
            what,
            error.unwrap_or_else(|| "no reason given".to_string())
        ),
        None => bail!("{} got an empty reply", what),
    }
}

/// Resolves calls by asking the media server over NATS
pub struct NatsCallLocator {
    client: NatsClient,
    subjects: SubjectsConfig,
}

impl NatsCallLocator {
    pub fn new(client: NatsClient, subjects: SubjectsConfig) -> Self {
        Self { client, subjects }
    }
}

#[async_trait::async_trait]
impl CallLocator for NatsCallLocator {
    async fn locate(&self, call_id: &str) -> Result<Option<CallRef>> {
        let subject = format!("{}.{}.locate", self.subjects.calls, call_id);

        // No responder means no such call; anything else is a bus failure
        let info: Option<CallInfoMessage> = self
            .client
            .request_json(subject, &CallRequest { call_id })
            .await?;
        if info.is_none() {
            debug!("Call {} not located", call_id);
        }

        Ok(info.map(|info| {
            CallRef::new(Arc::new(NatsCall {
                client: self.client.clone(),
                subjects: self.subjects.clone(),
                info,
            }))
        }))
    }
}

/// Call as described by the media server's locate reply
struct NatsCall {
    client: NatsClient,
    subjects: SubjectsConfig,
    info: CallInfoMessage,
}

impl NatsCall {
    fn call_subject(&self, verb: &str) -> String {
        format!("{}.{}.{}", self.subjects.calls, self.info.call_id, verb)
    }
}

impl VariableStore for NatsCall {
    fn variable(&self, name: &str) -> Option<String> {
        self.info.variables.get(name).cloned()
    }
}

#[async_trait::async_trait]
impl Call for NatsCall {
    fn id(&self) -> &str {
        &self.info.call_id
    }

    fn read_codec(&self) -> CodecInfo {
        self.info.read_codec.clone()
    }

    async fn pre_answer(&self) -> Result<()> {
        let ack = self
            .client
            .request_json(
                self.call_subject("pre_answer"),
                &CallRequest {
                    call_id: &self.info.call_id,
                },
            )
            .await?;
        check_ack(ack, "pre-answer")
    }

    async fn attach_interceptor(
        &self,
        bug_name: &str,
        flags: InterceptFlags,
        sink: Arc<dyn MediaSink>,
    ) -> Result<Box<dyn Interception>> {
        let media_subject = format!("{}.{}.{}", self.subjects.media, self.info.call_id, bug_name);

        // Listen before asking the host to publish
        let mut subscriber = self.client.subscribe(media_subject.clone()).await?;

        let request = AttachMessage {
            call_id: self.info.call_id.clone(),
            bug_name: bug_name.to_string(),
            read_stream: flags.read_stream,
            write_stream: flags.write_stream,
            stereo: flags.stereo,
            media_subject,
        };

        let attached = self
            .client
            .request_json(self.call_subject("attach"), &request)
            .await
            .and_then(|ack| check_ack(ack, "attach"));
        if let Err(e) = attached {
            if let Err(unsub) = subscriber.unsubscribe().await {
                debug!("Unsubscribe after failed attach: {}", unsub);
            }
            return Err(e);
        }

        info!("Interceptor {} attached to {}", bug_name, self.info.call_id);

        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let label = format!("{}/{}", self.info.call_id, bug_name);

        tokio::spawn(async move {
            sink.on_media(MediaEvent::Init);

            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    message = subscriber.next() => {
                        let Some(message) = message else { break };
                        match serde_json::from_slice::<MediaMessage>(&message.payload) {
                            Ok(MediaMessage::Hangup) => {
                                info!("Media stream {} hung up", label);
                                break;
                            }
                            Ok(media) => match media.to_frame() {
                                Ok(Some(frame)) => sink.on_media(MediaEvent::Frame(frame)),
                                Ok(None) => {}
                                Err(e) => warn!("Bad frame on {}: {:#}", label, e),
                            },
                            Err(e) => warn!("Malformed media message on {}: {}", label, e),
                        }
                    }
                }
            }

            sink.on_media(MediaEvent::Close);

            if let Err(e) = subscriber.unsubscribe().await {
                debug!("Unsubscribe from {} failed: {}", label, e);
            }
        });

        Ok(Box::new(NatsInterception {
            client: self.client.clone(),
            detach_subject: self.call_subject("detach"),
            request,
            stop: Mutex::new(Some(stop_tx)),
        }))
    }
}

struct NatsInterception {
    client: NatsClient,
    detach_subject: String,
    request: AttachMessage,
    stop: Mutex<Option<oneshot::Sender<()>>>,
}

#[async_trait::async_trait]
impl Interception for NatsInterception {
    async fn detach(&self) -> Result<()> {
        let stop = self.stop.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(stop) = stop {
            // The media task may already be gone after a hangup
            let _ = stop.send(());
        }

        let ack = self
            .client
            .request_json(self.detach_subject.clone(), &self.request)
            .await?;
        check_ack(ack, "detach")
    }
}

use super::client::NatsClient;
use super::messages::{CallEventMessage, EventMessage};
use crate::config::SubjectsConfig;
use crate::events::{CallEvent, Event, EventBus};
use anyhow::{anyhow, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

enum Outbound {
    Event(Event),
    CallEvent { call_id: String, event: CallEvent },
}

/// Event bus publishing to NATS.
///
/// Callers only enqueue; a single pump task publishes, so deliveries keep
/// the order in which they were made.
pub struct NatsEventBus {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl NatsEventBus {
    /// Create the bus and spawn its pump. The pump ends once the bus is dropped.
    pub fn spawn(client: NatsClient, subjects: SubjectsConfig) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<Outbound>();

        let pump = tokio::spawn(async move {
            info!("Event pump started");

            while let Some(outbound) = rx.recv().await {
                let published = match outbound {
                    Outbound::Event(event) => {
                        let subject = format!("{}.{}", subjects.events, event.call_id);
                        client.publish_json(subject, &EventMessage::from(&event)).await
                    }
                    Outbound::CallEvent { call_id, event } => {
                        let subject = format!("{}.{}.queue", subjects.calls, call_id);
                        client
                            .publish_json(subject, &CallEventMessage { call_id, event })
                            .await
                    }
                };

                if let Err(e) = published {
                    error!("Failed to publish event: {:#}", e);
                }
            }

            info!("Event pump stopped");
        });

        (Self { tx }, pump)
    }
}

impl EventBus for NatsEventBus {
    fn fire(&self, event: Event) -> Result<()> {
        self.tx
            .send(Outbound::Event(event))
            .map_err(|_| anyhow!("event pump stopped"))
    }

    fn queue_call_event(&self, call_id: &str, event: CallEvent) -> Result<()> {
        self.tx
            .send(Outbound::CallEvent {
                call_id: call_id.to_string(),
                event,
            })
            .map_err(|_| anyhow!("event pump stopped"))
    }
}

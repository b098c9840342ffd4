use anyhow::{Context, Result};
use async_nats::client::RequestErrorKind;
use async_nats::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

/// Request failures meaning nobody serves the subject
fn is_no_reply(kind: RequestErrorKind) -> bool {
    matches!(kind, RequestErrorKind::NoResponders)
}

/// Thin wrapper over the NATS connection shared by all adapters
#[derive(Clone)]
pub struct NatsClient {
    client: Client,
}

impl NatsClient {
    /// Connect to NATS server
    pub async fn connect(url: &str) -> Result<Self> {
        info!("Connecting to NATS at {}", url);

        let client = async_nats::connect(url)
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to NATS successfully");

        Ok(Self { client })
    }

    /// Publish a JSON message
    pub async fn publish_json<T: Serialize>(&self, subject: String, message: &T) -> Result<()> {
        let payload = serde_json::to_vec(message)?;

        self.client
            .publish(subject.clone(), payload.into())
            .await
            .with_context(|| format!("Failed to publish to {}", subject))?;

        debug!("Published to {}", subject);

        Ok(())
    }

    /// Send a JSON request and decode the reply.
    ///
    /// An empty reply or no responder at all is `None`; timeouts and
    /// connection failures are errors.
    pub async fn request_json<T: Serialize, R: DeserializeOwned>(
        &self,
        subject: String,
        message: &T,
    ) -> Result<Option<R>> {
        let payload = serde_json::to_vec(message)?;

        let reply = match self.client.request(subject.clone(), payload.into()).await {
            Ok(reply) => reply,
            Err(e) if is_no_reply(e.kind()) => {
                debug!("No responders on {}", subject);
                return Ok(None);
            }
            Err(e) => return Err(e).with_context(|| format!("Request to {} failed", subject)),
        };

        if reply.payload.is_empty() {
            return Ok(None);
        }

        let decoded = serde_json::from_slice(&reply.payload)
            .with_context(|| format!("Malformed reply from {}", subject))?;

        Ok(Some(decoded))
    }

    /// Subscribe to a subject
    pub async fn subscribe(&self, subject: String) -> Result<async_nats::Subscriber> {
        debug!("Subscribing to {}", subject);

        let subscriber = self
            .client
            .subscribe(subject.clone())
            .await
            .with_context(|| format!("Failed to subscribe to {}", subject))?;

        Ok(subscriber)
    }

    /// Flush buffered publishes
    pub async fn flush(&self) -> Result<()> {
        self.client.flush().await.context("Failed to flush NATS connection")?;
        Ok(())
    }
}

//! NATS plumbing: the [`Transport`] implementation and the inbound stream.

use std::time::Duration;

use async_nats::{Client, Message};
use async_trait::async_trait;
use fsm::{Transport, TransportError};
use futures_util::stream::{self, Stream, StreamExt};

use crate::error::ServerError;

/// Subscriptions covering every two- and three-segment subject.
pub const SUBSCRIPTIONS: [&str; 2] = ["*.*", "*.*.*"];

/// Connects to the bus.
pub async fn connect(url: &str) -> Result<Client, ServerError> {
    let client = async_nats::ConnectOptions::new()
        .name("provisioning-fsm")
        .connect(url)
        .await
        .map_err(|e| ServerError::Connect {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
    tracing::info!(%url, "Connected to NATS");
    Ok(client)
}

/// Subscribes to [`SUBSCRIPTIONS`] and merges them into one stream of
/// `(subject, payload)` pairs, in arrival order per subscription.
pub async fn inbound(
    client: &Client,
) -> Result<impl Stream<Item = (String, Vec<u8>)> + Unpin + use<>, ServerError> {
    let mut subscribers = Vec::with_capacity(SUBSCRIPTIONS.len());
    for subject in SUBSCRIPTIONS {
        let subscriber = client
            .subscribe(subject)
            .await
            .map_err(|e| ServerError::Subscribe {
                subject: subject.to_string(),
                reason: e.to_string(),
            })?;
        subscribers.push(subscriber);
    }

    Ok(stream::select_all(subscribers)
        .map(|message: Message| (message.subject.to_string(), message.payload.to_vec())))
}

/// [`Transport`] backed by a NATS client.
#[derive(Debug, Clone)]
pub struct NatsTransport {
    client: Client,
}

impl NatsTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for NatsTransport {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        self.client
            .publish(subject.to_string(), payload.into())
            .await
            .map_err(|e| TransportError::Publish {
                subject: subject.to_string(),
                reason: e.to_string(),
            })
    }

    async fn request(
        &self,
        subject: &str,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        let reply = tokio::time::timeout(
            timeout,
            self.client.request(subject.to_string(), payload.into()),
        )
        .await
        .map_err(|_| TransportError::Timeout {
            subject: subject.to_string(),
            timeout,
        })?
        .map_err(|e| TransportError::Request {
            subject: subject.to_string(),
            reason: e.to_string(),
        })?;
        Ok(reply.payload.to_vec())
    }
}

//! Message transport trait and in-memory implementation.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Publish to '{subject}' failed: {reason}")]
    Publish { subject: String, reason: String },

    #[error("Request to '{subject}' failed: {reason}")]
    Request { subject: String, reason: String },

    #[error("Request to '{subject}' timed out after {timeout:?}")]
    Timeout { subject: String, timeout: Duration },
}

/// Trait for the pub/sub bus the FSM talks to.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Publishes a message without waiting for a reply.
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), TransportError>;

    /// Sends a request and waits up to `timeout` for the reply.
    async fn request(
        &self,
        subject: &str,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        (**self).publish(subject, payload).await
    }

    async fn request(
        &self,
        subject: &str,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        (**self).request(subject, payload, timeout).await
    }
}

/// A message seen by the in-memory transport.
#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub subject: String,
    pub payload: Vec<u8>,
}

impl SentMessage {
    /// Decodes the payload as JSON.
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.payload).unwrap_or(serde_json::Value::Null)
    }
}

#[derive(Debug, Default)]
struct InMemoryTransportState {
    published: Vec<SentMessage>,
    requests: Vec<SentMessage>,
    replies: HashMap<String, VecDeque<Vec<u8>>>,
    fail_on_publish: bool,
    fail_on_request: bool,
}

/// In-memory transport for testing.
///
/// Records every publish and request. Requests are answered from scripted
/// replies, or with `{}` when none is queued for the subject.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTransport {
    state: Arc<Mutex<InMemoryTransportState>>,
}

impl InMemoryTransport {
    /// Creates a new in-memory transport.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, InMemoryTransportState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns every published message, oldest first.
    pub fn published(&self) -> Vec<SentMessage> {
        self.state().published.clone()
    }

    /// Returns published messages on one subject.
    pub fn published_on(&self, subject: &str) -> Vec<SentMessage> {
        self.state()
            .published
            .iter()
            .filter(|m| m.subject == subject)
            .cloned()
            .collect()
    }

    /// Returns every request sent, oldest first.
    pub fn requests(&self) -> Vec<SentMessage> {
        self.state().requests.clone()
    }

    /// Queues a reply for the next request on `subject`.
    pub fn push_reply(&self, subject: &str, reply: Vec<u8>) {
        self.state()
            .replies
            .entry(subject.to_string())
            .or_default()
            .push_back(reply);
    }

    /// Configures the transport to fail every publish.
    pub fn set_fail_on_publish(&self, fail: bool) {
        self.state().fail_on_publish = fail;
    }

    /// Configures the transport to time out every request.
    pub fn set_fail_on_request(&self, fail: bool) {
        self.state().fail_on_request = fail;
    }

    /// Forgets everything recorded so far.
    pub fn clear(&self) {
        let mut state = self.state();
        state.published.clear();
        state.requests.clear();
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        let mut state = self.state();
        if state.fail_on_publish {
            return Err(TransportError::Publish {
                subject: subject.to_string(),
                reason: "simulated failure".to_string(),
            });
        }
        state.published.push(SentMessage {
            subject: subject.to_string(),
            payload,
        });
        Ok(())
    }

    async fn request(
        &self,
        subject: &str,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        let mut state = self.state();
        state.requests.push(SentMessage {
            subject: subject.to_string(),
            payload,
        });
        if state.fail_on_request {
            return Err(TransportError::Timeout {
                subject: subject.to_string(),
                timeout,
            });
        }
        Ok(state
            .replies
            .get_mut(subject)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| b"{}".to_vec()))
    }
}

//! Human-readable progress output for the service owner.
//!
//! Monitor output is fire-and-forget: failures are logged and never affect
//! message handling.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use common::ServiceId;
use serde::{Deserialize, Serialize};

use crate::transport::Transport;

/// Subject monitor lines are published on.
pub const MONITOR_SUBJECT: &str = "monitor.user";

/// Severity of a monitor line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Level {
    #[serde(rename = "INFO")]
    Info,
    #[serde(rename = "ERROR")]
    Error,
    /// Continuation line (list entries under a heading).
    #[serde(rename = "")]
    Plain,
}

/// One line of user-facing output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorMessage {
    pub body: String,
    pub level: Level,
}

impl MonitorMessage {
    pub fn info(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            level: Level::Info,
        }
    }

    pub fn error(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            level: Level::Error,
        }
    }

    pub fn plain(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            level: Level::Plain,
        }
    }
}

/// Trait for user-facing progress output.
#[async_trait]
pub trait Monitor: Send + Sync {
    /// Emits lines for a service. Never fails.
    async fn emit(&self, service: &ServiceId, messages: Vec<MonitorMessage>);
}

#[derive(Serialize)]
struct MonitorEnvelope<'a> {
    service: &'a ServiceId,
    messages: Vec<MonitorMessage>,
}

/// Publishes monitor lines on [`MONITOR_SUBJECT`].
#[derive(Debug, Clone)]
pub struct TransportMonitor<T> {
    transport: T,
}

impl<T: Transport> TransportMonitor<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl<T: Transport> Monitor for TransportMonitor<T> {
    async fn emit(&self, service: &ServiceId, messages: Vec<MonitorMessage>) {
        if messages.is_empty() {
            return;
        }
        let envelope = MonitorEnvelope { service, messages };
        let payload = match serde_json::to_vec(&envelope) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(%service, error = %e, "Can't encode monitor output");
                return;
            }
        };
        if let Err(e) = self.transport.publish(MONITOR_SUBJECT, payload).await {
            tracing::warn!(%service, error = %e, "Can't send monitor output");
        }
    }
}

/// Monitor that keeps every line in memory, for tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMonitor {
    lines: Arc<Mutex<Vec<(ServiceId, MonitorMessage)>>>,
}

impl InMemoryMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every line emitted for a service, oldest first.
    pub fn lines_for(&self, service: &ServiceId) -> Vec<MonitorMessage> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(id, _)| id == service)
            .map(|(_, line)| line.clone())
            .collect()
    }

    /// Returns the bodies of every line emitted for a service.
    pub fn bodies_for(&self, service: &ServiceId) -> Vec<String> {
        self.lines_for(service).into_iter().map(|m| m.body).collect()
    }
}

#[async_trait]
impl Monitor for InMemoryMonitor {
    async fn emit(&self, service: &ServiceId, messages: Vec<MonitorMessage>) {
        let mut lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        lines.extend(messages.into_iter().map(|m| (service.clone(), m)));
    }
}

#[async_trait]
impl<M: Monitor + ?Sized> Monitor for Arc<M> {
    async fn emit(&self, service: &ServiceId, messages: Vec<MonitorMessage>) {
        (**self).emit(service, messages).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::InMemoryTransport;

    #[tokio::test]
    async fn transport_monitor_publishes_envelope() {
        let transport = InMemoryTransport::new();
        let monitor = TransportMonitor::new(transport.clone());
        let id = ServiceId::new("svc-1");

        monitor
            .emit(
                &id,
                vec![
                    MonitorMessage::info("Creating networks:"),
                    MonitorMessage::plain("\t- 10.1.0.0/24"),
                ],
            )
            .await;

        let sent = transport.published_on(MONITOR_SUBJECT);
        assert_eq!(sent.len(), 1);
        let body = sent[0].json();
        assert_eq!(body["service"], "svc-1");
        assert_eq!(body["messages"][0]["level"], "INFO");
        assert_eq!(body["messages"][1]["level"], "");
    }

    #[tokio::test]
    async fn transport_failure_is_swallowed() {
        let transport = InMemoryTransport::new();
        transport.set_fail_on_publish(true);
        let monitor = TransportMonitor::new(transport.clone());

        monitor
            .emit(&ServiceId::new("svc-1"), vec![MonitorMessage::error("boom")])
            .await;

        assert!(transport.published().is_empty());
    }

    #[tokio::test]
    async fn in_memory_monitor_filters_by_service() {
        let monitor = InMemoryMonitor::new();
        let a = ServiceId::new("a");
        monitor.emit(&a, vec![MonitorMessage::info("one")]).await;
        monitor
            .emit(&ServiceId::new("b"), vec![MonitorMessage::info("two")])
            .await;

        assert_eq!(monitor.bodies_for(&a), vec!["one"]);
    }
}

//! Per-message handling flow.
//!
//! ```text
//! load ─▶ route ─▶ manage ─▶ [advance + prepare next] ─▶ save ─▶ publish
//!                                                              └▶ monitor / status
//! ```
//!
//! Everything up to the save works on in-memory copies. Any error before the
//! save drops the message and leaves the stored aggregate as it was. A failed
//! publish puts the previous document back (or removes a service that was
//! created by this message).

use std::time::{Duration, Instant};

use common::ServiceId;
use domain::Service;
use serde::Serialize;
use serde_json::Value;
use service_store::ServiceStore;

use crate::engine;
use crate::error::{FsmError, Result};
use crate::monitor::Monitor;
use crate::publisher::{self, Publication};
use crate::repository::ServiceRepository;
use crate::router::MessageRouter;
use crate::subject::{Outcome, ServiceCommand, Subject};
use crate::transport::Transport;

/// Subject the status tracker listens on.
pub const STATUS_SUBJECT: &str = "service.set";

/// Default timeout for status tracker requests.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(1);

/// Inbound subjects allowed to run against a service that is not stored yet.
const CREATING_SUBJECTS: [&str; 2] = ["service.create", "service.import"];

/// What happened to one handled message.
#[derive(Debug, Clone, PartialEq)]
pub struct HandleOutcome {
    pub service_id: ServiceId,
    /// Event fired on the workflow.
    pub routed_subject: String,
    /// Subject published as a result, if the workflow had a next event.
    pub published: Option<String>,
    /// Status of the service after handling.
    pub status: String,
}

#[derive(Serialize)]
struct StatusUpdate<'a> {
    id: &'a ServiceId,
    status: &'a str,
}

/// Drives services through their workflow, one inbound message at a time.
///
/// Messages for the same service must be handed to one coordinator in
/// arrival order; the coordinator does not lock aggregates.
pub struct Coordinator<S, T, M>
where
    S: ServiceStore,
    T: Transport,
    M: Monitor,
{
    repository: ServiceRepository<S>,
    transport: T,
    monitor: M,
    router: MessageRouter,
    request_timeout: Duration,
}

impl<S, T, M> Coordinator<S, T, M>
where
    S: ServiceStore,
    T: Transport,
    M: Monitor,
{
    /// Creates a coordinator using the built-in workflows.
    pub fn new(store: S, transport: T, monitor: M) -> Self {
        Self {
            repository: ServiceRepository::new(store),
            transport,
            monitor,
            router: MessageRouter::new(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Replaces the message router.
    pub fn with_router(mut self, router: MessageRouter) -> Self {
        self.router = router;
        self
    }

    /// Sets the timeout for status tracker requests.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn repository(&self) -> &ServiceRepository<S> {
        &self.repository
    }

    /// Handles one inbound message.
    #[tracing::instrument(skip(self, body))]
    pub async fn handle(&self, subject: &str, body: &[u8]) -> Result<HandleOutcome> {
        let started = Instant::now();
        metrics::counter!("fsm_messages_received_total", "subject" => subject.to_string())
            .increment(1);

        let result = self.process(subject, body).await;

        metrics::histogram!("fsm_message_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        match &result {
            Ok(outcome) => tracing::info!(
                id = %outcome.service_id,
                routed = %outcome.routed_subject,
                published = ?outcome.published,
                status = %outcome.status,
                "Message handled"
            ),
            Err(e) => {
                metrics::counter!("fsm_messages_rejected_total").increment(1);
                tracing::warn!(error = %e, "Message dropped");
            }
        }
        result
    }

    async fn process(&self, subject: &str, body: &[u8]) -> Result<HandleOutcome> {
        let id = service_id(body)?;
        let previous = self.repository.load(&id).await?;
        let mut service = match &previous {
            Some(service) => service.clone(),
            None if CREATING_SUBJECTS.contains(&subject) => Service::new(id.clone()),
            None => return Err(FsmError::ServiceNotFound(id)),
        };

        let routed = self.router.route(&mut service, subject, body)?;
        let next = engine::manage(&mut service, &routed.subject)?;

        let publication = match next {
            Some(event) => {
                engine::advance(&mut service, &event)?;
                Some(publisher::prepare(&mut service, &event)?)
            }
            None => None,
        };

        self.repository.save(&service).await?;

        if let Some(publication) = &publication {
            if let Err(e) = self
                .transport
                .publish(&publication.subject, publication.payload.clone())
                .await
            {
                self.restore(&id, previous).await;
                return Err(e.into());
            }
            metrics::counter!(
                "fsm_messages_published_total",
                "subject" => publication.subject.clone()
            )
            .increment(1);
        }

        self.monitor.emit(&service.id, routed.effects.monitor).await;
        if let Some(status) = routed.effects.status_update {
            self.update_status(&service.id, status).await;
        }

        let published = match publication {
            Some(publication) => Some(self.announce(&service, publication).await?),
            None => None,
        };

        Ok(HandleOutcome {
            service_id: service.id,
            routed_subject: routed.subject,
            published,
            status: service.status,
        })
    }

    /// Puts back the last durable state after a failed publish, so the same
    /// inbound message can be retried.
    async fn restore(&self, id: &ServiceId, previous: Option<Service>) {
        let restored = match &previous {
            Some(service) => self.repository.save(service).await,
            None => self.repository.delete(id).await,
        };
        if let Err(e) = restored {
            tracing::error!(%id, error = %e, "Can't restore service after failed publish");
        }
    }

    /// Runs the side effects of a sent publication.
    async fn announce(&self, service: &Service, publication: Publication) -> Result<String> {
        let Publication {
            subject,
            status_update,
            monitor,
            ..
        } = publication;

        self.monitor.emit(&service.id, monitor).await;
        if let Some(status) = status_update {
            self.update_status(&service.id, status).await;
        }

        if matches!(
            Subject::parse(&subject),
            Ok(Subject::Terminal(ServiceCommand::Delete, Outcome::Done))
        ) {
            tracing::info!(id = %service.id, "Service deleted, removing aggregate");
            self.repository.delete(&service.id).await?;
        }

        Ok(subject)
    }

    /// Pushes a status to the status tracker. Failures are logged only.
    async fn update_status(&self, id: &ServiceId, status: &str) {
        let payload = match serde_json::to_vec(&StatusUpdate { id, status }) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(%id, error = %e, "Can't encode status update");
                return;
            }
        };
        if let Err(e) = self
            .transport
            .request(STATUS_SUBJECT, payload, self.request_timeout)
            .await
        {
            tracing::warn!(%id, %status, error = %e, "Status tracker did not acknowledge update");
        }
    }
}

/// Extracts the service id from a message body (`service`, else `id`).
pub fn service_id(body: &[u8]) -> Result<ServiceId> {
    let value: Value = serde_json::from_slice(body)?;
    ["service", "id"]
        .into_iter()
        .filter_map(|key| value.get(key).and_then(Value::as_str))
        .find(|id| !id.is_empty())
        .map(ServiceId::new)
        .ok_or(FsmError::MissingServiceId)
}

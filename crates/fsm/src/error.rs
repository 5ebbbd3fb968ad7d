//! FSM error types.

use common::ServiceId;
use domain::{DomainError, ResourceType};
use service_store::StoreError;
use thiserror::Error;

use crate::transport::TransportError;

/// Errors that can occur while handling one message.
///
/// Any of these aborts the current message: the aggregate stays at its last
/// stored state and nothing is published.
#[derive(Debug, Error)]
pub enum FsmError {
    /// The subject is neither whitelisted by the workflow nor always legal.
    #[error("Message not supported: {0}")]
    MessageNotSupported(String),

    /// The subject does not follow the `<type>.<verb>[.<outcome>]` grammar.
    #[error("Malformed subject: {0}")]
    MalformedSubject(String),

    /// The subject names a resource type the aggregate does not hold.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// No arc matches, or the status has no outgoing arcs.
    #[error("Transition error: {0}")]
    Transition(#[source] DomainError),

    /// The message body is not valid JSON for the expected shape.
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// The message body carries neither `service` nor `id`.
    #[error("Message body carries no service id")]
    MissingServiceId,

    /// A report names the same component twice.
    #[error("Duplicate component '{name}' in {resource} report")]
    DuplicateComponent {
        resource: ResourceType,
        name: String,
    },

    /// The store failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// No aggregate is stored for the service and the message cannot create one.
    #[error("Service not found: {0}")]
    ServiceNotFound(ServiceId),

    /// Publishing or a request/reply exchange failed.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The pending collection an outbound command would carry is absent.
    #[error("Component {0} not present")]
    ComponentsNotPresent(String),
}

impl FsmError {
    /// Returns true for errors caused by the message itself rather than by a
    /// collaborator.
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            FsmError::MessageNotSupported(_)
                | FsmError::MalformedSubject(_)
                | FsmError::UnknownResource(_)
                | FsmError::Transition(_)
                | FsmError::Decode(_)
                | FsmError::MissingServiceId
                | FsmError::DuplicateComponent { .. }
        )
    }
}

impl From<DomainError> for FsmError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::UnknownResource(name) => FsmError::UnknownResource(name),
            DomainError::DuplicateComponent { resource, name } => {
                FsmError::DuplicateComponent { resource, name }
            }
            DomainError::Serialization(e) => FsmError::Decode(e),
            other => FsmError::Transition(other),
        }
    }
}

/// Convenience type alias for FSM results.
pub type Result<T> = std::result::Result<T, FsmError>;

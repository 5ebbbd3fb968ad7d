//! Domain error types.

use thiserror::Error;

use crate::service::ResourceType;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// No arc leaves `status` on `event`.
    #[error("Invalid status({status}) event ({event}) pair")]
    NoMatchingTransition { status: String, event: String },

    /// The status has no outgoing arcs.
    #[error("No new event defined for status {status}")]
    NoEventDefined { status: String },

    /// A report or collection names the same component twice.
    #[error("Duplicate component '{name}' in {resource} report")]
    DuplicateComponent {
        resource: ResourceType,
        name: String,
    },

    /// The resource type key is not one the aggregate knows about.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

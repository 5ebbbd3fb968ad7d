//! Service aggregate implementation.

use chrono::{DateTime, Utc};
use common::ServiceId;
use serde::{Deserialize, Serialize};

use super::collection::Collection;
use super::registry::{ResourceRegistry, ResourceType, Stage};
use super::resources::Datacenter;
use crate::workflow::{Workflow, status};

/// Service aggregate root.
///
/// One environment under construction: its identity, its current position in
/// the workflow graph and every component collection the workers have
/// reported on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Service {
    #[serde(default)]
    pub id: ServiceId,

    #[serde(default)]
    pub name: String,

    #[serde(rename = "type", default)]
    pub service_type: String,

    #[serde(default)]
    pub client_name: String,

    /// Current workflow status. Empty means not started.
    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub workflow: Workflow,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub endpoint: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_ip: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,

    /// Message of the most recent provider failure.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub last_known_error: String,

    #[serde(flatten)]
    pub resources: ResourceRegistry,
}

impl Service {
    /// Creates an empty service with the given ID.
    pub fn new(id: impl Into<ServiceId>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Decodes a service document.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Encodes the service document.
    pub fn to_vec(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Returns the status the workflow should be evaluated from.
    pub fn effective_status(&self) -> &str {
        if self.status.is_empty() {
            status::CREATED
        } else {
            &self.status
        }
    }

    /// Returns the main collection for `resource`, if the service has one.
    pub fn collection(&self, resource: ResourceType) -> Option<&Collection> {
        self.resources.collection(resource)
    }

    /// Returns the pending collection for `resource` at `stage`.
    pub fn pending(&self, resource: ResourceType, stage: Stage) -> Option<&Collection> {
        self.resources.pending(resource, stage)
    }

    /// Returns the collection executions should be dispatched to or reconciled
    /// into. While bootstrapping, executions are bootstraps.
    pub fn effective_resource(&self, resource: ResourceType) -> ResourceType {
        if resource == ResourceType::Executions && self.status == status::BOOTSTRAPPING {
            ResourceType::Bootstraps
        } else {
            resource
        }
    }

    /// Records a provider failure and parks the service in `pre-failed`.
    pub fn mark_as_failed(&mut self, error: impl Into<String>) {
        self.status = status::PRE_FAILED.to_string();
        self.last_known_error = error.into();
    }

    /// Returns the first datacenter, decoded.
    pub fn datacenter(&self) -> Option<Datacenter> {
        self.collection(ResourceType::Datacenters)
            .and_then(|c| c.items.first())
            .and_then(|c| c.decode().ok())
    }
}

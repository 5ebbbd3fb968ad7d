//! Worker outcome reports.

use std::collections::HashSet;

use common::ServiceId;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::service::{Component, ComponentStatus, ResourceType};

/// The body of every `<type>.<verb>.<done|error>` message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenericComponentReport {
    #[serde(default)]
    pub service: ServiceId,

    #[serde(default)]
    pub components: Vec<Component>,

    #[serde(default)]
    pub status: ComponentStatus,

    #[serde(default)]
    pub error_code: String,

    #[serde(default, alias = "error")]
    pub error_message: String,

    #[serde(default)]
    pub sequential_processing: bool,
}

impl GenericComponentReport {
    /// Decodes a report from a message body.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Rejects reports that name the same component twice.
    pub fn ensure_unique_names(&self, resource: ResourceType) -> Result<(), DomainError> {
        let mut seen = HashSet::with_capacity(self.components.len());
        for component in &self.components {
            if !seen.insert(component.name.as_str()) {
                return Err(DomainError::DuplicateComponent {
                    resource,
                    name: component.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Returns the component with the given name.
    pub fn find(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.name == name)
    }

    /// Returns the errored components, in report order.
    pub fn errored(&self) -> impl Iterator<Item = &Component> {
        self.components.iter().filter(|c| c.is_errored())
    }

    /// Returns the message describing the first failure in the report.
    pub fn first_error(&self) -> Option<&str> {
        self.errored()
            .map(|c| c.error_message.as_str())
            .find(|m| !m.is_empty())
            .or_else(|| (!self.error_message.is_empty()).then_some(self.error_message.as_str()))
    }
}

//! Components: one provisioned resource instance.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Lifecycle status of a component or collection.
///
/// Workers may send statuses the FSM does not interpret; those are kept
/// verbatim in [`ComponentStatus::Other`] so nothing is lost on a round trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ComponentStatus {
    /// No outcome yet.
    #[default]
    Pending,
    InProgress,
    Completed,
    Errored,
    Other(String),
}

impl ComponentStatus {
    /// Returns the wire representation.
    pub fn as_str(&self) -> &str {
        match self {
            ComponentStatus::Pending => "",
            ComponentStatus::InProgress => "in_progress",
            ComponentStatus::Completed => "completed",
            ComponentStatus::Errored => "errored",
            ComponentStatus::Other(s) => s,
        }
    }

    pub fn is_errored(&self) -> bool {
        matches!(self, ComponentStatus::Errored)
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, ComponentStatus::Completed)
    }
}

impl From<String> for ComponentStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "" => ComponentStatus::Pending,
            "in_progress" => ComponentStatus::InProgress,
            "completed" => ComponentStatus::Completed,
            "errored" => ComponentStatus::Errored,
            _ => ComponentStatus::Other(s),
        }
    }
}

impl From<&str> for ComponentStatus {
    fn from(s: &str) -> Self {
        ComponentStatus::from(s.to_string())
    }
}

impl From<ComponentStatus> for String {
    fn from(status: ComponentStatus) -> Self {
        match status {
            ComponentStatus::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for ComponentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A resource instance: common lifecycle fields plus a resource-specific
/// attribute bag.
///
/// The bag is kept as raw JSON so that attributes the FSM never reads
/// (disk layouts, rule lists, provider IDs) survive untouched from the
/// service definition through to the worker.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Component {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub status: ComponentStatus,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error_code: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error_message: String,

    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Component {
    /// Creates a component with the given name and no attributes.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the status (builder style).
    pub fn with_status(mut self, status: impl Into<ComponentStatus>) -> Self {
        self.status = status.into();
        self
    }

    /// Sets an attribute (builder style).
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Sets the error detail (builder style).
    pub fn with_error(mut self, code: impl Into<String>, message: impl Into<String>) -> Self {
        self.error_code = code.into();
        self.error_message = message.into();
        self
    }

    /// Returns an attribute by key.
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Returns a string attribute by key.
    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }

    pub fn is_errored(&self) -> bool {
        self.status.is_errored()
    }

    pub fn is_completed(&self) -> bool {
        self.status.is_completed()
    }

    /// Decodes the component into one of the typed resource views.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(serde_json::to_value(self)?)
    }
}

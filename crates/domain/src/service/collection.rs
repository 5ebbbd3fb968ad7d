//! Collections: a named group of components of one resource type.

use serde::{Deserialize, Serialize};

use super::component::{Component, ComponentStatus};

/// An ordered group of components keyed by unique name, plus
/// collection-level status and flags.
///
/// The same shape is used for a type's main collection and for its pending
/// `to_create`/`to_update`/`to_delete` staging collections.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Collection {
    #[serde(default)]
    pub items: Vec<Component>,

    #[serde(default)]
    pub status: ComponentStatus,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error_code: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error_message: String,

    #[serde(default)]
    pub started: bool,

    #[serde(default)]
    pub finished: bool,

    #[serde(default)]
    pub sequential_processing: bool,
}

impl Collection {
    /// Creates a collection holding the given items.
    pub fn with_items(items: Vec<Component>) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the index of the item with the given name.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.items.iter().position(|c| c.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&Component> {
        self.items.iter().find(|c| c.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Component> {
        self.items.iter_mut().find(|c| c.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Replaces the item with the same name, or appends it.
    pub fn upsert(&mut self, component: Component) {
        match self.position(&component.name) {
            Some(i) => self.items[i] = component,
            None => self.items.push(component),
        }
    }

    /// Returns the item names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|c| c.name.as_str())
    }

    /// Copies report-level error detail onto this collection.
    pub fn set_error(&mut self, code: &str, message: &str) {
        self.error_code = code.to_string();
        self.error_message = message.to_string();
    }
}

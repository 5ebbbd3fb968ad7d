//! Typed registry of component collections.
//!
//! Each resource type owns one [`ResourceSet`]: its collection plus up to
//! three pending collections. On the wire the registry flattens into the
//! service document as `<type>`, `<type>_to_create`, `<type>_to_update` and
//! `<type>_to_delete` keys.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use super::collection::Collection;
use crate::error::DomainError;

/// The resource types a service can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceType {
    Datacenters,
    Routers,
    Networks,
    Instances,
    Firewalls,
    Nats,
    Executions,
    Bootstraps,
    Vpcs,
    Elbs,
}

impl ResourceType {
    pub const ALL: [ResourceType; 10] = [
        ResourceType::Datacenters,
        ResourceType::Routers,
        ResourceType::Networks,
        ResourceType::Instances,
        ResourceType::Firewalls,
        ResourceType::Nats,
        ResourceType::Executions,
        ResourceType::Bootstraps,
        ResourceType::Vpcs,
        ResourceType::Elbs,
    ];

    /// Returns the document key (also the subject prefix).
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Datacenters => "datacenters",
            ResourceType::Routers => "routers",
            ResourceType::Networks => "networks",
            ResourceType::Instances => "instances",
            ResourceType::Firewalls => "firewalls",
            ResourceType::Nats => "nats",
            ResourceType::Executions => "executions",
            ResourceType::Bootstraps => "bootstraps",
            ResourceType::Vpcs => "vpcs",
            ResourceType::Elbs => "elbs",
        }
    }

    /// Singular, capitalised name used in user-facing messages.
    pub fn label(&self) -> &'static str {
        match self {
            ResourceType::Datacenters => "Datacenter",
            ResourceType::Routers => "Router",
            ResourceType::Networks => "Network",
            ResourceType::Instances => "Instance",
            ResourceType::Firewalls => "Firewall",
            ResourceType::Nats => "Nat",
            ResourceType::Executions => "Execution",
            ResourceType::Bootstraps => "Bootstrap",
            ResourceType::Vpcs => "Vpc",
            ResourceType::Elbs => "Elb",
        }
    }
}

impl FromStr for ResourceType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceType::ALL
            .into_iter()
            .find(|rt| rt.as_str() == s)
            .ok_or_else(|| DomainError::UnknownResource(s.to_string()))
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle stage of an outstanding worker request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Create,
    Update,
    Delete,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Create, Stage::Update, Stage::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Create => "create",
            Stage::Update => "update",
            Stage::Delete => "delete",
        }
    }

    /// Progressive form used in user-facing messages.
    pub fn gerund(&self) -> &'static str {
        match self {
            Stage::Create => "Creating",
            Stage::Update => "Updating",
            Stage::Delete => "Deleting",
        }
    }

    /// Past participle used in progress messages ("Routers created").
    pub fn past(&self) -> &'static str {
        match self {
            Stage::Create => "created",
            Stage::Update => "updated",
            Stage::Delete => "deleted",
        }
    }

    /// Noun form used in failure messages ("creation failed").
    pub fn noun(&self) -> &'static str {
        match self {
            Stage::Create => "creation",
            Stage::Update => "modification",
            Stage::Delete => "deletion",
        }
    }

    fn suffix(&self) -> &'static str {
        match self {
            Stage::Create => "_to_create",
            Stage::Update => "_to_update",
            Stage::Delete => "_to_delete",
        }
    }
}

impl FromStr for Stage {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| DomainError::UnknownResource(s.to_string()))
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A resource type's collection and its pending collections.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResourceSet {
    pub collection: Collection,
    pub to_create: Option<Collection>,
    pub to_update: Option<Collection>,
    pub to_delete: Option<Collection>,
}

impl ResourceSet {
    pub fn pending(&self, stage: Stage) -> Option<&Collection> {
        match stage {
            Stage::Create => self.to_create.as_ref(),
            Stage::Update => self.to_update.as_ref(),
            Stage::Delete => self.to_delete.as_ref(),
        }
    }

    fn pending_slot(&mut self, stage: Stage) -> &mut Option<Collection> {
        match stage {
            Stage::Create => &mut self.to_create,
            Stage::Update => &mut self.to_update,
            Stage::Delete => &mut self.to_delete,
        }
    }

    /// Returns the pending collection for `stage`, creating it if absent.
    pub fn pending_mut(&mut self, stage: Stage) -> &mut Collection {
        self.pending_slot(stage).get_or_insert_with(Collection::default)
    }

    /// Replaces the pending collection for `stage`.
    pub fn set_pending(&mut self, stage: Stage, collection: Collection) {
        *self.pending_slot(stage) = Some(collection);
    }
}

/// Mapping from resource type to its [`ResourceSet`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResourceRegistry {
    sets: BTreeMap<ResourceType, ResourceSet>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, resource: ResourceType) -> Option<&ResourceSet> {
        self.sets.get(&resource)
    }

    /// Returns the set for `resource`, creating an empty one if absent.
    pub fn entry(&mut self, resource: ResourceType) -> &mut ResourceSet {
        self.sets.entry(resource).or_default()
    }

    pub fn collection(&self, resource: ResourceType) -> Option<&Collection> {
        self.get(resource).map(|set| &set.collection)
    }

    pub fn pending(&self, resource: ResourceType, stage: Stage) -> Option<&Collection> {
        self.get(resource).and_then(|set| set.pending(stage))
    }

    pub fn iter(&self) -> impl Iterator<Item = (ResourceType, &ResourceSet)> {
        self.sets.iter().map(|(rt, set)| (*rt, set))
    }

    /// Resolves a document key (`routers`, `nats_to_delete`, ...).
    pub fn parse_key(key: &str) -> Option<(ResourceType, Option<Stage>)> {
        for stage in Stage::ALL {
            if let Some(prefix) = key.strip_suffix(stage.suffix()) {
                return prefix.parse().ok().map(|rt| (rt, Some(stage)));
            }
        }
        key.parse().ok().map(|rt| (rt, None))
    }
}

impl Serialize for ResourceRegistry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (resource, set) in &self.sets {
            map.serialize_entry(resource.as_str(), &set.collection)?;
            for stage in Stage::ALL {
                if let Some(pending) = set.pending(stage) {
                    let key = format!("{}{}", resource.as_str(), stage.suffix());
                    map.serialize_entry(&key, pending)?;
                }
            }
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ResourceRegistry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
        let mut registry = ResourceRegistry::new();

        for (key, value) in raw {
            // Keys that are not collections belong to other parts of the document.
            let Some((resource, stage)) = ResourceRegistry::parse_key(&key) else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            let collection: Collection = serde_json::from_value(value)
                .map_err(|e| D::Error::custom(format!("invalid collection '{key}': {e}")))?;
            let set = registry.entry(resource);
            match stage {
                None => set.collection = collection,
                Some(stage) => set.set_pending(stage, collection),
            }
        }

        Ok(registry)
    }
}

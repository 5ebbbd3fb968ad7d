//! Service aggregate and its component collections.

pub mod aggregate;
pub mod collection;
pub mod component;
pub mod registry;
pub mod resources;

pub use aggregate::Service;
pub use collection::Collection;
pub use component::{Component, ComponentStatus};
pub use registry::{ResourceRegistry, ResourceSet, ResourceType, Stage};

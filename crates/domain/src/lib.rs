//! Domain layer for the provisioning FSM.
//!
//! This crate provides the core domain abstractions including:
//! - Workflow graph (arcs between status names) and its built-in definitions
//! - Service aggregate with a typed registry of component collections
//! - Reconciliation rules that fold worker reports into the aggregate

pub mod error;
pub mod reconcile;
pub mod report;
pub mod service;
pub mod workflow;

pub use error::DomainError;
pub use reconcile::{create_result, delete_result, reconcile, update_result};
pub use report::GenericComponentReport;
pub use service::{
    Collection, Component, ComponentStatus, ResourceRegistry, ResourceSet, ResourceType, Service,
    Stage, resources,
};
pub use workflow::{Transition, Workflow, status};

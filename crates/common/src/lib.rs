//! Shared types for the provisioning FSM.

pub mod types;

pub use types::ServiceId;

//! Provisioning workflow engine.
//!
//! This crate turns inbound bus messages into changes on a service aggregate
//! and the next outbound command:
//! - Subject grammar and the message router with its dispatch table
//! - Error manager for worker failure reports
//! - Workflow driver (`advance` / `next` / `manage`)
//! - Template resolution and outbound payload preparation
//! - Transport, monitor and repository seams, plus the coordinator tying
//!   them together

pub mod coordinator;
pub mod engine;
pub mod error;
pub mod error_manager;
pub mod monitor;
pub mod publisher;
pub mod repository;
pub mod router;
pub mod subject;
pub mod template;
pub mod transport;

pub use coordinator::{Coordinator, HandleOutcome, STATUS_SUBJECT, service_id};
pub use engine::{advance, manage, next};
pub use error::{FsmError, Result};
pub use error_manager::{is_an_error_message, mark_as_failed};
pub use monitor::{InMemoryMonitor, Level, Monitor, MonitorMessage, TransportMonitor};
pub use publisher::{Publication, prepare};
pub use repository::ServiceRepository;
pub use router::{Effects, MessageRouter, Routed};
pub use subject::{Outcome, ServiceCommand, Subject, Verb};
pub use transport::{InMemoryTransport, SentMessage, Transport, TransportError};

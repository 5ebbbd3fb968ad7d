//! Key/value persistence for service aggregates.
//!
//! The FSM treats storage as an opaque byte store keyed by service ID. This
//! crate provides the [`ServiceStore`] contract plus an in-memory and a
//! PostgreSQL implementation.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use common::ServiceId;
pub use error::{Result, StoreError};
pub use memory::InMemoryServiceStore;
pub use postgres::PostgresServiceStore;
pub use store::{KEY_PREFIX, ServiceStore, ServiceStoreExt, storage_key};

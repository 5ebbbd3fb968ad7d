use async_trait::async_trait;

use crate::{Result, ServiceId, StoreError};

/// Prefix applied to every storage key.
pub const KEY_PREFIX: &str = "FSM_";

/// Builds the storage key for a service.
pub fn storage_key(id: &ServiceId) -> Result<String> {
    if id.is_empty() {
        return Err(StoreError::EmptyKey);
    }
    Ok(format!("{KEY_PREFIX}{id}"))
}

/// Core trait for aggregate persistence.
///
/// Values are opaque bytes; serialization is the caller's concern.
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait ServiceStore: Send + Sync {
    /// Returns the stored document for a service, or None if absent.
    async fn get(&self, id: &ServiceId) -> Result<Option<Vec<u8>>>;

    /// Stores (or replaces) the document for a service.
    async fn set(&self, id: &ServiceId, body: Vec<u8>) -> Result<()>;

    /// Removes the document for a service.
    ///
    /// Deleting an absent service is not an error.
    async fn delete(&self, id: &ServiceId) -> Result<()>;
}

/// Extension trait providing convenience methods for service stores.
#[async_trait]
pub trait ServiceStoreExt: ServiceStore {
    /// Checks if a document exists for the service.
    async fn exists(&self, id: &ServiceId) -> Result<bool> {
        Ok(self.get(id).await?.is_some())
    }
}

impl<T: ServiceStore + ?Sized> ServiceStoreExt for T {}

#[async_trait]
impl<T: ServiceStore + ?Sized> ServiceStore for std::sync::Arc<T> {
    async fn get(&self, id: &ServiceId) -> Result<Option<Vec<u8>>> {
        (**self).get(id).await
    }

    async fn set(&self, id: &ServiceId, body: Vec<u8>) -> Result<()> {
        (**self).set(id, body).await
    }

    async fn delete(&self, id: &ServiceId) -> Result<()> {
        (**self).delete(id).await
    }
}

//! Typed access to stored service aggregates.

use common::ServiceId;
use domain::Service;
use service_store::ServiceStore;

use crate::error::Result;

/// Loads and saves [`Service`] aggregates on top of a byte-oriented
/// [`ServiceStore`].
#[derive(Debug, Clone)]
pub struct ServiceRepository<S: ServiceStore> {
    store: S,
}

impl<S: ServiceStore> ServiceRepository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Loads a service. Returns None if nothing is stored under its id.
    #[tracing::instrument(skip(self))]
    pub async fn load(&self, id: &ServiceId) -> Result<Option<Service>> {
        match self.store.get(id).await? {
            Some(bytes) => Ok(Some(Service::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Stores the full service document.
    #[tracing::instrument(skip(self, service), fields(id = %service.id, status = %service.status))]
    pub async fn save(&self, service: &Service) -> Result<()> {
        let bytes = service.to_vec()?;
        self.store.set(&service.id, bytes).await?;
        Ok(())
    }

    /// Removes a service.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: &ServiceId) -> Result<()> {
        self.store.delete(id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FsmError;
    use domain::{Component, ResourceType, Stage};
    use service_store::InMemoryServiceStore;

    #[tokio::test]
    async fn save_then_load_returns_same_service() {
        let repository = ServiceRepository::new(InMemoryServiceStore::new());
        let mut service = Service::new("svc-1");
        service.status = "creating_networks".into();
        service
            .resources
            .entry(ResourceType::Networks)
            .pending_mut(Stage::Create)
            .upsert(Component::new("n1"));

        repository.save(&service).await.unwrap();
        let loaded = repository.load(&service.id).await.unwrap().unwrap();

        assert_eq!(loaded, service);
    }

    #[tokio::test]
    async fn missing_service_is_none() {
        let repository = ServiceRepository::new(InMemoryServiceStore::new());
        assert!(repository.load(&ServiceId::new("nope")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_document_is_a_decode_error() {
        let store = InMemoryServiceStore::new();
        let id = ServiceId::new("svc-1");
        store.set(&id, b"not json".to_vec()).await.unwrap();
        let repository = ServiceRepository::new(store);

        let err = repository.load(&id).await.unwrap_err();

        assert!(matches!(err, FsmError::Decode(_)));
    }

    #[tokio::test]
    async fn store_failure_surfaces_as_store_error() {
        let store = InMemoryServiceStore::new();
        store.set_fail_on_write(true);
        let repository = ServiceRepository::new(store);

        let err = repository.save(&Service::new("svc-1")).await.unwrap_err();

        assert!(matches!(err, FsmError::Store(_)));
    }

    #[tokio::test]
    async fn delete_removes_service() {
        let repository = ServiceRepository::new(InMemoryServiceStore::new());
        let service = Service::new("svc-1");
        repository.save(&service).await.unwrap();

        repository.delete(&service.id).await.unwrap();

        assert!(repository.load(&service.id).await.unwrap().is_none());
    }
}

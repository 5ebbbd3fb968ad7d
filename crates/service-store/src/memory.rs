use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{Result, ServiceId, StoreError, store::ServiceStore, storage_key};

/// In-memory service store implementation for testing.
///
/// Provides the same interface as the PostgreSQL implementation, plus a
/// switches to simulate backend outages.
#[derive(Clone, Default)]
pub struct InMemoryServiceStore {
    documents: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    fail_on_write: Arc<AtomicBool>,
    fail_on_read: Arc<AtomicBool>,
}

impl InMemoryServiceStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored services.
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    /// Returns true if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    /// Clears all documents.
    pub async fn clear(&self) {
        self.documents.write().await.clear();
    }

    /// Makes every subsequent `set`/`delete` fail until switched off.
    pub fn set_fail_on_write(&self, fail: bool) {
        self.fail_on_write.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent `get` fail until switched off.
    pub fn set_fail_on_read(&self, fail: bool) {
        self.fail_on_read.store(fail, Ordering::SeqCst);
    }

    fn check_readable(&self) -> Result<()> {
        if self.fail_on_read.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("reads disabled".to_string()));
        }
        Ok(())
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_on_write.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ServiceStore for InMemoryServiceStore {
    async fn get(&self, id: &ServiceId) -> Result<Option<Vec<u8>>> {
        self.check_readable()?;
        let key = storage_key(id)?;
        Ok(self.documents.read().await.get(&key).cloned())
    }

    async fn set(&self, id: &ServiceId, body: Vec<u8>) -> Result<()> {
        self.check_writable()?;
        let key = storage_key(id)?;
        self.documents.write().await.insert(key, body);
        Ok(())
    }

    async fn delete(&self, id: &ServiceId) -> Result<()> {
        self.check_writable()?;
        let key = storage_key(id)?;
        self.documents.write().await.remove(&key);
        Ok(())
    }
}

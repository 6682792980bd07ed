// # Memory Remote Store
//
// In-memory implementation of RemoteStore.
//
// ## Purpose
//
// Behaves like a provider zone held in a map: ids are assigned on create and
// stay stable across updates. Nothing survives the process.
//
// ## When to Use
//
// - Testing the planner and executor without a network
// - Rehearsing a sync against a hand-seeded zone

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

use crate::Error;
use crate::record::{DeclaredRecord, IdentityKey, RemoteRecord};
use crate::traits::RemoteStore;

/// In-memory remote store implementation
///
/// Records are kept in a map keyed by their assigned id, protected by a
/// RwLock. Clones share the same zone.
///
/// # Example
///
/// ```rust,no_run
/// use dnsync_core::store::MemoryRemoteStore;
/// use dnsync_core::traits::RemoteStore;
/// use dnsync_core::{DeclaredRecord, RecordType};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryRemoteStore::new();
///
///     let record = DeclaredRecord::new("api.example.com", RecordType::A, "10.0.0.5");
///     let created = store.create(&record).await?;
///
///     let found = store.find_by_name_and_type(&record.key()).await?;
///     assert_eq!(found.map(|r| r.id), Some(created.id));
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryRemoteStore {
    inner: Arc<RwLock<BTreeMap<String, RemoteRecord>>>,
    next_id: Arc<AtomicU64>,
}

impl MemoryRemoteStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record directly, bypassing any bookkeeping a caller might do
    pub async fn seed(&self, record: DeclaredRecord) -> RemoteRecord {
        let remote = RemoteRecord::from_declared(self.allocate_id(), &record);
        self.inner
            .write()
            .await
            .insert(remote.id.clone(), remote.clone());
        remote
    }

    /// Get the number of records in the store
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// All stored records, ordered by identity key
    pub async fn records(&self) -> Vec<RemoteRecord> {
        let mut records: Vec<_> = self.inner.read().await.values().cloned().collect();
        records.sort_by(|a, b| a.key().cmp(&b.key()).then_with(|| a.id.cmp(&b.id)));
        records
    }

    fn allocate_id(&self) -> String {
        format!("mem-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn find_by_name_and_type(&self, key: &IdentityKey) -> Result<Option<RemoteRecord>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.values().find(|r| &r.key() == key).cloned())
    }

    async fn create(&self, record: &DeclaredRecord) -> Result<RemoteRecord, Error> {
        Ok(self.seed(record.clone()).await)
    }

    async fn update(&self, id: &str, record: &DeclaredRecord) -> Result<RemoteRecord, Error> {
        let mut guard = self.inner.write().await;
        let slot = guard
            .get_mut(id)
            .ok_or_else(|| Error::not_found(format!("no record with id {id}")))?;
        *slot = RemoteRecord::from_declared(id, record);
        Ok(slot.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Error::not_found(format!("no record with id {id}")))
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}

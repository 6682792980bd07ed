// # Remote Store Trait
//
// Defines the interface to the provider that holds the live record set.
//
// ## Implementations
//
// - Cloudflare: `dnsync-provider-cloudflare` crate
// - In-memory: `dnsync_core::store::MemoryRemoteStore` (tests, dry runs)
//
// ## Usage
//
// ```rust,ignore
// use dnsync_core::{IdentityKey, RecordType, RemoteStore};
//
// async fn show(store: &dyn RemoteStore) -> dnsync_core::Result<()> {
//     let key = IdentityKey::new("api.example.com", RecordType::A);
//     if let Some(remote) = store.find_by_name_and_type(&key).await? {
//         println!("{} -> {}", remote.id, remote.content);
//     }
//     Ok(())
// }
// ```

use crate::config::ProviderConfig;
use crate::error::Result;
use crate::record::{DeclaredRecord, IdentityKey, RemoteRecord};
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for remote store implementations
///
/// # Trust Level: Untrusted
///
/// Stores are external integrations and must stay single-shot:
///
/// ## Allowed Capabilities
/// - ✅ Perform HTTP/HTTPS API calls to their endpoints only
/// - ✅ Map provider responses into [`RemoteRecord`]
/// - ✅ Return success or failure
///
/// ## Forbidden Capabilities
/// - ❌ Retry or back off (a re-run of the whole sync is the retry)
/// - ❌ Decide whether a mutation is needed (owned by the plan builder)
/// - ❌ Cache records between calls (lookups must see live state)
/// - ❌ Spawn tasks or threads
///
/// A transport timeout must come back as an error for which
/// [`Error::is_retryable`](crate::Error::is_retryable) is true.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Find the record stored under an identity key
    ///
    /// # Returns
    ///
    /// - `Ok(Some(record))`: the provider holds a record with this name and type
    /// - `Ok(None)`: no such record; this is not an error
    /// - `Err(Error)`: the lookup itself failed
    async fn find_by_name_and_type(&self, key: &IdentityKey) -> Result<Option<RemoteRecord>>;

    /// Create a record; the provider assigns its id
    async fn create(&self, record: &DeclaredRecord) -> Result<RemoteRecord>;

    /// Overwrite the synced fields of the record with the given id
    async fn update(&self, id: &str, record: &DeclaredRecord) -> Result<RemoteRecord>;

    /// Remove the record with the given id
    async fn delete(&self, id: &str) -> Result<()>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing remote stores from configuration
pub trait RemoteStoreFactory: Send + Sync {
    /// Create a RemoteStore instance from configuration
    ///
    /// Stores are shared with executor tasks, hence the `Arc`.
    fn create(&self, config: &ProviderConfig, dry_run: bool) -> Result<Arc<dyn RemoteStore>>;
}

//! Remote index
//!
//! Resolves an identity key into the provider's current record. Lookups are
//! made one key at a time and only for keys the planner actually needs; the
//! zone is never bulk-fetched.

use crate::error::Result;
use crate::record::{IdentityKey, RemoteRecord};
use crate::traits::RemoteStore;
use async_trait::async_trait;
use tracing::debug;

#[async_trait]
pub trait RemoteIndex: Send + Sync {
    /// `Ok(None)` is a lookup miss, which callers treat as policy, not failure
    async fn lookup(&self, key: &IdentityKey) -> Result<Option<RemoteRecord>>;
}

#[async_trait]
impl<S: RemoteStore + ?Sized> RemoteIndex for S {
    async fn lookup(&self, key: &IdentityKey) -> Result<Option<RemoteRecord>> {
        let found = self.find_by_name_and_type(key).await?;
        match &found {
            Some(remote) => debug!("{} resolved to remote id {}", key, remote.id),
            None => debug!("{} not present in {}", key, self.provider_name()),
        }
        Ok(found)
    }
}

//! Plugin-based registry
//!
//! The registry lets remote stores and history sources be registered at
//! runtime, so the binary never branches on provider names itself.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dnsync_core::Registry;
//!
//! let registry = Registry::new();
//! dnsync_provider_cloudflare::register(&registry);
//! dnsync_history_git::register(&registry);
//!
//! let store = registry.create_store(&config.provider, config.engine.dry_run)?;
//! let history = registry.create_history(&config.history)?;
//! ```

use crate::config::{HistoryConfig, ProviderConfig};
use crate::error::{Error, Result};
use crate::traits::{HistorySource, HistorySourceFactory, RemoteStore, RemoteStoreFactory};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Registry of store and history factories
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct Registry {
    /// Registered remote store factories
    stores: RwLock<HashMap<String, Box<dyn RemoteStoreFactory>>>,

    /// Registered history source factories
    histories: RwLock<HashMap<String, Box<dyn HistorySourceFactory>>>,
}

impl Registry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a remote store factory under a provider type name
    pub fn register_store(&self, name: impl Into<String>, factory: Box<dyn RemoteStoreFactory>) {
        let mut stores = self.stores.write().unwrap_or_else(PoisonError::into_inner);
        stores.insert(name.into(), factory);
    }

    /// Register a history source factory under a source type name
    pub fn register_history(&self, name: impl Into<String>, factory: Box<dyn HistorySourceFactory>) {
        let mut histories = self.histories.write().unwrap_or_else(PoisonError::into_inner);
        histories.insert(name.into(), factory);
    }

    /// Create a remote store from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Arc<dyn RemoteStore>)`: Created store instance
    /// - `Err(Error)`: If the provider type is not registered or creation fails
    pub fn create_store(&self, config: &ProviderConfig, dry_run: bool) -> Result<Arc<dyn RemoteStore>> {
        let provider_type = config.type_name();
        let stores = self.stores.read().unwrap_or_else(PoisonError::into_inner);

        let factory = stores
            .get(provider_type)
            .ok_or_else(|| Error::config(format!("Unknown provider type: {}", provider_type)))?;

        factory.create(config, dry_run)
    }

    /// Create a history source from configuration
    pub fn create_history(&self, config: &HistoryConfig) -> Result<Box<dyn HistorySource>> {
        let source_type = config.type_name();
        let histories = self.histories.read().unwrap_or_else(PoisonError::into_inner);

        let factory = histories
            .get(source_type)
            .ok_or_else(|| Error::config(format!("Unknown history source type: {}", source_type)))?;

        factory.create(config)
    }

    /// List all registered provider types
    pub fn list_stores(&self) -> Vec<String> {
        let stores = self.stores.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = stores.keys().cloned().collect();
        names.sort();
        names
    }

    /// List all registered history source types
    pub fn list_histories(&self) -> Vec<String> {
        let histories = self.histories.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = histories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a provider type is registered
    pub fn has_store(&self, name: &str) -> bool {
        let stores = self.stores.read().unwrap_or_else(PoisonError::into_inner);
        stores.contains_key(name)
    }

    /// Check if a history source type is registered
    pub fn has_history(&self, name: &str) -> bool {
        let histories = self.histories.read().unwrap_or_else(PoisonError::into_inner);
        histories.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryRemoteStore;

    struct MemoryStoreFactory;

    impl RemoteStoreFactory for MemoryStoreFactory {
        fn create(&self, _config: &ProviderConfig, _dry_run: bool) -> Result<Arc<dyn RemoteStore>> {
            Ok(Arc::new(MemoryRemoteStore::new()))
        }
    }

    fn custom(factory: &str) -> ProviderConfig {
        ProviderConfig::Custom {
            factory: factory.to_string(),
            config: serde_json::json!({}),
        }
    }

    #[test]
    fn test_registry_registration() {
        let registry = Registry::new();
        assert!(!registry.has_store("memory"));

        registry.register_store("memory", Box::new(MemoryStoreFactory));

        assert!(registry.has_store("memory"));
        assert_eq!(registry.list_stores(), vec!["memory".to_string()]);

        let store = registry.create_store(&custom("memory"), false).unwrap();
        assert_eq!(store.provider_name(), "memory");
    }

    #[test]
    fn test_unknown_types_are_config_errors() {
        let registry = Registry::new();
        assert!(matches!(
            registry.create_store(&custom("route53"), false),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            registry.create_history(&HistoryConfig::default()),
            Err(Error::Config(_))
        ));
        assert!(registry.list_histories().is_empty());
        assert!(!registry.has_history("git"));
    }
}

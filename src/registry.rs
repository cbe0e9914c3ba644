//! Adapter registry: backend constructors keyed by adapter name
//!
//! Built once at startup and handed to [`Engine::new`](crate::Engine::new).
//! There is no process-wide table; tests build their own registry with fakes.

use crate::error::{Result, TagCacheError};
use crate::store::{CacheStore, MemoryStore};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Constructor for an uninitialized backend
pub type AdapterFactory = Arc<dyn Fn() -> Box<dyn CacheStore> + Send + Sync>;

/// Name-to-constructor table for cache backends
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    factories: HashMap<String, AdapterFactory>,
}

impl AdapterRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every bundled backend
    ///
    /// Always `memory`; `redis` when the `redis-backend` feature is on.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.factories.insert(
            "memory".to_string(),
            Arc::new(|| Box::new(MemoryStore::new()) as Box<dyn CacheStore>),
        );

        #[cfg(feature = "redis-backend")]
        registry.factories.insert(
            "redis".to_string(),
            Arc::new(|| Box::new(crate::store::RedisStore::new()) as Box<dyn CacheStore>),
        );

        registry
    }

    /// Register `factory` under `name`
    ///
    /// Registering a name twice is a configuration error.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> Result<()>
    where
        F: Fn() -> Box<dyn CacheStore> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(TagCacheError::DuplicateAdapter { name });
        }

        debug!("Registered cache adapter '{}'", name);
        self.factories.insert(name, Arc::new(factory));
        Ok(())
    }

    /// Check if `name` is registered
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered adapter names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Construct a fresh, uninitialized backend for `name`
    pub fn create(&self, name: &str) -> Result<Box<dyn CacheStore>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| TagCacheError::UnknownAdapter {
                name: name.to_string(),
            })?;
        Ok(factory())
    }
}

impl fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("adapters", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_include_memory() {
        let registry = AdapterRegistry::with_defaults();
        assert!(registry.contains("memory"));
        assert!(registry.create("memory").is_ok());
    }

    #[test]
    fn test_unknown_adapter() {
        let registry = AdapterRegistry::new();
        match registry.create("memcache") {
            Err(TagCacheError::UnknownAdapter { name }) => assert_eq!(name, "memcache"),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("unregistered adapter should not resolve"),
        }
    }

    #[test]
    fn test_duplicate_registration() {
        let mut registry = AdapterRegistry::new();
        registry
            .register("mem", || Box::new(MemoryStore::new()))
            .unwrap();

        let err = registry
            .register("mem", || Box::new(MemoryStore::new()))
            .unwrap_err();
        assert!(matches!(err, TagCacheError::DuplicateAdapter { .. }));
        assert!(err.is_config());
    }

    #[test]
    fn test_duplicate_of_builtin() {
        let mut registry = AdapterRegistry::with_defaults();
        assert!(registry
            .register("memory", || Box::new(MemoryStore::new()))
            .is_err());
    }

    #[test]
    fn test_names_sorted() {
        let mut registry = AdapterRegistry::new();
        registry.register("b", || Box::new(MemoryStore::new())).unwrap();
        registry.register("a", || Box::new(MemoryStore::new())).unwrap();
        assert_eq!(registry.names(), vec!["a", "b"]);
    }
}

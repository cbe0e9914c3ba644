//! Cache facade: adapter resolution plus plain and tagged access

use crate::config::Options;
use crate::error::Result;
use crate::registry::AdapterRegistry;
use crate::store::CacheStore;
use crate::tag::TagCache;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Entry point for cache users
///
/// Holds one initialized backend. Plain calls go straight to it;
/// [`Engine::with_tags`] hands out tagged views sharing the same backend.
#[derive(Clone)]
pub struct Engine {
    options: Options,
    store: Arc<dyn CacheStore>,
}

impl Engine {
    /// Resolve, construct and initialize the configured adapter
    ///
    /// # Errors
    /// * `ConfigError` if the options are invalid
    /// * `UnknownAdapter` if `options.adapter` is not registered
    /// * whatever the backend's `initialize` returns (bad payload,
    ///   unreachable server)
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    /// use tagcache::{AdapterRegistry, Engine, Options};
    ///
    /// # #[tokio::main]
    /// # async fn main() -> tagcache::Result<()> {
    /// let registry = AdapterRegistry::with_defaults();
    /// let cache = Engine::new(&registry, Options::default()).await?;
    ///
    /// cache.set("da", "weisd", Duration::from_secs(300)).await?;
    /// assert_eq!(cache.get("da").await?, Some("weisd".to_string()));
    /// # Ok(())
    /// # }
    /// ```
    pub async fn new(registry: &AdapterRegistry, options: Options) -> Result<Self> {
        options.validate()?;

        let mut store = registry.create(&options.adapter)?;
        store.initialize(&options).await?;

        info!(
            "Cache engine ready (adapter: {}, section: '{}')",
            options.adapter, options.section
        );

        Ok(Self {
            options,
            store: Arc::from(store),
        })
    }

    /// Wrap a store that is already initialized
    pub fn from_store(store: Arc<dyn CacheStore>, options: Options) -> Self {
        Self { options, store }
    }

    /// Options the engine was built with
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Shared handle to the backend
    pub fn store(&self) -> Arc<dyn CacheStore> {
        Arc::clone(&self.store)
    }

    /// Tagged view over the same backend
    pub fn with_tags<I, S>(&self, names: I) -> TagCache
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TagCache::new(Arc::clone(&self.store), names)
    }

    /// Store `value` under `key`; a zero ttl never expires
    pub async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.store.set(key, value, ttl).await
    }

    /// Store every entry with the same ttl
    pub async fn batch_set(&self, items: &HashMap<String, String>, ttl: Duration) -> Result<()> {
        self.store.batch_set(items, ttl).await
    }

    /// Fetch `key`, `None` when absent or expired
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        self.store.get(key).await
    }

    /// Fetch several keys, results aligned with `keys`
    pub async fn batch_get(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        self.store.batch_get(keys).await
    }

    /// Remove `key`
    pub async fn delete(&self, key: &str) -> Result<()> {
        self.store.delete(key).await
    }

    /// Atomically add 1 to the counter at `key`, starting from 0
    pub async fn increment(&self, key: &str) -> Result<i64> {
        self.store.increment(key).await
    }

    /// Atomically subtract 1 from the counter at `key`, starting from 0
    pub async fn decrement(&self, key: &str) -> Result<i64> {
        self.store.decrement(key).await
    }

    /// Drop everything the backend holds for this section, tag versions included
    pub async fn flush(&self) -> Result<()> {
        self.store.flush_all().await
    }

    /// Reset the expiry of `key`; a zero ttl removes it
    pub async fn touch(&self, key: &str, ttl: Duration) -> Result<()> {
        self.store.touch(key, ttl).await
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

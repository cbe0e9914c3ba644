//! # Storage Contract
//!
//! [`CacheStore`] is the capability set every backend implements. The tagged
//! layer only ever talks to a backend through this trait, so any key-value
//! store with an atomic counter can sit underneath it.
//!
//! ## Requirements on implementations
//!
//! - `increment`/`decrement` must be atomic: concurrent callers on the same key
//!   never lose an update. Tag versions depend on it.
//! - An absent key counts as `0` for `increment`/`decrement`.
//! - A ttl of [`Duration::ZERO`] (see [`NO_EXPIRY`]) means the entry never expires.
//! - `get` reports absence as `None`; an empty string is a real value.
//! - `batch_get` returns one slot per requested key, in request order.
//! - Errors are returned, never swallowed, and never retried here.

pub mod memory;
#[cfg(feature = "redis-backend")]
pub mod redis;

use crate::config::Options;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

pub use memory::{MemoryConfig, MemoryStore};
#[cfg(feature = "redis-backend")]
pub use self::redis::{RedisConfig, RedisStore};

/// TTL meaning "keep until deleted"
pub const NO_EXPIRY: Duration = Duration::ZERO;

/// Key-value backend consumed by the engine and the tagged cache
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Store `value` under `key`
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Store every entry with the same ttl
    async fn batch_set(&self, items: &HashMap<String, String>, ttl: Duration) -> Result<()>;

    /// Fetch the value under `key`
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Fetch several keys at once, aligned to `keys`
    async fn batch_get(&self, keys: &[String]) -> Result<Vec<Option<String>>>;

    /// Remove `key`; removing an absent key succeeds
    async fn delete(&self, key: &str) -> Result<()>;

    /// Atomically add one and return the new value
    async fn increment(&self, key: &str) -> Result<i64>;

    /// Atomically subtract one and return the new value
    async fn decrement(&self, key: &str) -> Result<i64>;

    /// Drop every entry this store owns
    async fn flush_all(&self) -> Result<()>;

    /// Replace the expiry of an existing key
    async fn touch(&self, key: &str, ttl: Duration) -> Result<()>;

    /// Startup hook: parse adapter config, connect, check liveness
    async fn initialize(&mut self, options: &Options) -> Result<()>;
}

/// Join the configured section and a key the way every bundled backend does
pub(crate) fn prefixed_key(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}:{}", prefix, key)
    }
}

//! In-process backend with lazy TTL expiry
//!
//! Entries live in a `HashMap` behind a tokio `RwLock`. Expired entries are
//! dropped when they are read, by [`MemoryStore::cleanup_expired`], or by the
//! optional sweeper task configured through `gc_interval`.

use crate::config::Options;
use crate::error::{Result, TagCacheError};
use crate::store::{prefixed_key, CacheStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Adapter payload for the memory backend
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MemoryConfig {
    /// Seconds between expiry sweeps; 0 disables the sweeper
    pub gc_interval: u64,
}

type Entries = Arc<RwLock<HashMap<String, MemoryEntry>>>;

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl MemoryEntry {
    fn new(value: String, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: expiry_from(ttl),
        }
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(at) if now >= at)
    }
}

fn expiry_from(ttl: Duration) -> Option<DateTime<Utc>> {
    if ttl.is_zero() {
        return None;
    }
    // Out-of-range ttls are treated as "never".
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|d| Utc::now().checked_add_signed(d))
}

/// Memory-backed [`CacheStore`], registered as the `memory` adapter
#[derive(Default)]
pub struct MemoryStore {
    prefix: String,
    entries: Entries,
}

impl MemoryStore {
    /// Create an empty store without a key prefix
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store whose keys are prefixed with `section`
    pub fn with_prefix(section: impl Into<String>) -> Self {
        Self {
            prefix: section.into(),
            entries: Entries::default(),
        }
    }

    /// Number of live (unexpired) entries
    pub async fn len(&self) -> usize {
        let now = Utc::now();
        let entries = self.entries.read().await;
        entries.values().filter(|e| !e.is_expired(now)).count()
    }

    /// Check if the store holds no live entries
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Remove all expired entries, returning how many were dropped
    pub async fn cleanup_expired(&self) -> usize {
        sweep(&self.entries).await
    }

    fn key(&self, key: &str) -> String {
        prefixed_key(&self.prefix, key)
    }

    async fn add(&self, key: &str, delta: i64) -> Result<i64> {
        let key = self.key(key);
        let now = Utc::now();
        let mut entries = self.entries.write().await;

        let (current, expires_at) = match entries.get(&key) {
            Some(entry) if !entry.is_expired(now) => {
                let current = entry
                    .value
                    .parse::<i64>()
                    .map_err(|_| TagCacheError::NotAnInteger { key: key.clone() })?;
                (current, entry.expires_at)
            }
            _ => (0, None),
        };

        let next = current.checked_add(delta).ok_or_else(|| {
            TagCacheError::BackendError(format!("increment or decrement would overflow at '{}'", key))
        })?;

        entries.insert(
            key,
            MemoryEntry {
                value: next.to_string(),
                expires_at,
            },
        );

        Ok(next)
    }
}

async fn sweep(entries: &RwLock<HashMap<String, MemoryEntry>>) -> usize {
    let now = Utc::now();
    let mut entries = entries.write().await;
    let before = entries.len();
    entries.retain(|_, entry| !entry.is_expired(now));
    let removed = before - entries.len();

    if removed > 0 {
        debug!("Swept {} expired entries", removed);
    }
    removed
}

/// Background sweeper; stops once the owning store is dropped
async fn run_sweeper(entries: Weak<RwLock<HashMap<String, MemoryEntry>>>, interval: Duration) {
    loop {
        tokio::time::sleep(interval).await;

        let Some(live) = entries.upgrade() else {
            debug!("Memory store dropped, stopping sweeper");
            return;
        };
        sweep(&live).await;
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(self.key(key), MemoryEntry::new(value.to_string(), ttl));
        Ok(())
    }

    async fn batch_set(&self, items: &HashMap<String, String>, ttl: Duration) -> Result<()> {
        let mut entries = self.entries.write().await;
        for (key, value) in items {
            entries.insert(self.key(key), MemoryEntry::new(value.clone(), ttl));
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let key = self.key(key);
        let now = Utc::now();

        {
            let entries = self.entries.read().await;
            match entries.get(&key) {
                Some(entry) if !entry.is_expired(now) => {
                    debug!("Cache hit: {}", key);
                    return Ok(Some(entry.value.clone()));
                }
                Some(_) => {}
                None => {
                    debug!("Cache miss: {}", key);
                    return Ok(None);
                }
            }
        }

        // Expired: drop it unless a writer replaced it meanwhile.
        let mut entries = self.entries.write().await;
        if entries.get(&key).is_some_and(|e| e.is_expired(now)) {
            entries.remove(&key);
        }
        debug!("Cache entry expired: {}", key);
        Ok(None)
    }

    async fn batch_get(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        let now = Utc::now();
        let entries = self.entries.read().await;

        Ok(keys
            .iter()
            .map(|key| {
                entries
                    .get(&self.key(key))
                    .filter(|e| !e.is_expired(now))
                    .map(|e| e.value.clone())
            })
            .collect())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.remove(&self.key(key));
        Ok(())
    }

    async fn increment(&self, key: &str) -> Result<i64> {
        self.add(key, 1).await
    }

    async fn decrement(&self, key: &str) -> Result<i64> {
        self.add(key, -1).await
    }

    async fn flush_all(&self) -> Result<()> {
        let mut entries = self.entries.write().await;

        if self.prefix.is_empty() {
            entries.clear();
        } else {
            let owned = format!("{}:", self.prefix);
            entries.retain(|key, _| !key.starts_with(&owned));
        }

        info!("Flushed memory store (prefix: '{}')", self.prefix);
        Ok(())
    }

    async fn touch(&self, key: &str, ttl: Duration) -> Result<()> {
        let now = Utc::now();
        let mut entries = self.entries.write().await;

        if let Some(entry) = entries.get_mut(&self.key(key)) {
            if !entry.is_expired(now) {
                entry.expires_at = expiry_from(ttl);
            }
        }
        Ok(())
    }

    async fn initialize(&mut self, options: &Options) -> Result<()> {
        let config: MemoryConfig = options.parse_adapter_config()?;
        self.prefix = options.section.clone();

        if config.gc_interval > 0 {
            let interval = Duration::from_secs(config.gc_interval);
            tokio::spawn(run_sweeper(Arc::downgrade(&self.entries), interval));
            info!("Started memory store sweeper (interval: {:?})", interval);
        }

        info!("Initialized memory store (prefix: '{}')", self.prefix);
        Ok(())
    }
}

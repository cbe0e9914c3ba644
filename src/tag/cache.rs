//! Tagged cache: a store view scoped to a tag set

use crate::error::Result;
use crate::store::CacheStore;
use crate::tag::set::TagSet;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Separator between namespace and logical key before hashing
pub const KEY_SEPARATOR: &str = ":";

/// Digest of `namespace:key`, the key actually sent to the backend
///
/// Lowercase hex MD5, 32 characters, so it can never take the
/// `tag:<name>:key` shape used for version counters.
pub fn tagged_key_for(namespace: &str, key: &str) -> String {
    format!(
        "{:x}",
        md5::compute(format!("{}{}{}", namespace, KEY_SEPARATOR, key))
    )
}

/// Cache view whose keys live in the namespace of a tag set
///
/// Every data operation recomputes the namespace, so a flush from any other
/// handle is seen by the very next call. `flush` bumps tag versions and
/// leaves stored values to expire on their own.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use tagcache::store::{CacheStore, MemoryStore};
/// use tagcache::TagCache;
///
/// # #[tokio::main]
/// # async fn main() -> tagcache::Result<()> {
/// let store: Arc<dyn CacheStore> = Arc::new(MemoryStore::new());
///
/// let users = TagCache::new(Arc::clone(&store), ["users"]);
/// users.set("alice", "admin", Duration::from_secs(300)).await?;
/// assert_eq!(users.get("alice").await?, Some("admin".to_string()));
///
/// users.flush().await?;
/// assert_eq!(users.get("alice").await?, None);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct TagCache {
    store: Arc<dyn CacheStore>,
    tag_set: TagSet,
}

impl TagCache {
    /// Create a tagged view over `store`
    pub fn new<I, S>(store: Arc<dyn CacheStore>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tag_set = TagSet::new(Arc::clone(&store), names);
        Self { store, tag_set }
    }

    /// Attach more tags, builder style
    pub fn add_tags<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tag_set.add_names(names);
        self
    }

    /// The tag set this view is scoped to
    pub fn tags(&self) -> &TagSet {
        &self.tag_set
    }

    /// Backend key for `key` under the current namespace
    pub async fn tagged_key(&self, key: &str) -> Result<String> {
        let namespace = self.tag_set.namespace().await?;
        Ok(tagged_key_for(&namespace, key))
    }

    /// Store `value` under `key`
    pub async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let tagged = self.tagged_key(key).await?;
        self.store.set(&tagged, value, ttl).await
    }

    /// Store every entry against a single namespace snapshot
    pub async fn batch_set(&self, items: &HashMap<String, String>, ttl: Duration) -> Result<()> {
        let namespace = self.tag_set.namespace().await?;
        let tagged: HashMap<String, String> = items
            .iter()
            .map(|(key, value)| (tagged_key_for(&namespace, key), value.clone()))
            .collect();

        self.store.batch_set(&tagged, ttl).await
    }

    /// Fetch the value under `key`
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let tagged = self.tagged_key(key).await?;
        let value = self.store.get(&tagged).await?;

        if value.is_none() {
            debug!("Tagged miss: {} ({:?})", key, self.tag_set);
        }
        Ok(value)
    }

    /// Fetch several keys against a single namespace snapshot
    pub async fn batch_get(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        let namespace = self.tag_set.namespace().await?;
        let tagged: Vec<String> = keys
            .iter()
            .map(|key| tagged_key_for(&namespace, key))
            .collect();

        self.store.batch_get(&tagged).await
    }

    /// Remove `key`
    pub async fn delete(&self, key: &str) -> Result<()> {
        let tagged = self.tagged_key(key).await?;
        self.store.delete(&tagged).await
    }

    /// Atomically add one to the counter under `key`
    pub async fn increment(&self, key: &str) -> Result<i64> {
        let tagged = self.tagged_key(key).await?;
        self.store.increment(&tagged).await
    }

    /// Atomically subtract one from the counter under `key`
    pub async fn decrement(&self, key: &str) -> Result<i64> {
        let tagged = self.tagged_key(key).await?;
        self.store.decrement(&tagged).await
    }

    /// Replace the expiry of `key`
    pub async fn touch(&self, key: &str, ttl: Duration) -> Result<()> {
        let tagged = self.tagged_key(key).await?;
        self.store.touch(&tagged, ttl).await
    }

    /// Invalidate everything stored under any of this view's tags
    pub async fn flush(&self) -> Result<()> {
        debug!("Flushing tags {:?}", self.tag_set.names().collect::<Vec<_>>());
        self.tag_set.reset_all().await
    }
}

impl fmt::Debug for TagCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagCache")
            .field("tag_set", &self.tag_set)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    const TTL: Duration = Duration::from_secs(300);

    fn store() -> Arc<dyn CacheStore> {
        Arc::new(MemoryStore::new())
    }

    #[test]
    fn test_tagged_key_for_is_md5_hex() {
        // md5(":k")
        let key = tagged_key_for("", "k");
        assert_eq!(key.len(), 32);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(key, format!("{:x}", md5::compute(":k")));
        assert_ne!(tagged_key_for("1", "k"), key);
    }

    #[tokio::test]
    async fn test_tagged_key_deterministic() {
        let cache = TagCache::new(store(), ["x"]);
        let first = cache.tagged_key("k").await.unwrap();
        let second = cache.tagged_key("k").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first, tagged_key_for("tag:x:key=1", "k"));
    }

    #[tokio::test]
    async fn test_unrelated_tags_do_not_share_keys() {
        let shared = store();
        let x = TagCache::new(Arc::clone(&shared), ["x"]);
        let y = TagCache::new(Arc::clone(&shared), ["y"]);

        x.set("k1", "v1", TTL).await.unwrap();

        assert_ne!(x.tagged_key("k1").await.unwrap(), y.tagged_key("k1").await.unwrap());
        assert_eq!(y.get("k1").await.unwrap(), None);
        assert_eq!(x.get("k1").await.unwrap(), Some("v1".to_string()));
    }

    #[tokio::test]
    async fn test_no_tags_uses_empty_namespace() {
        let cache = TagCache::new(store(), Vec::<String>::new());
        assert_eq!(cache.tagged_key("k").await.unwrap(), tagged_key_for("", "k"));

        cache.set("k", "v", TTL).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn test_set_get_flush() {
        let cache = TagCache::new(store(), ["x"]);

        cache.set("k", "v", TTL).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some("v".to_string()));

        cache.flush().await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_flush_does_not_delete_values() {
        let shared = Arc::new(MemoryStore::new());
        let cache = TagCache::new(shared.clone() as Arc<dyn CacheStore>, ["x"]);

        cache.set("k", "v", TTL).await.unwrap();
        let entries_before = shared.len().await;

        cache.flush().await.unwrap();

        assert_eq!(shared.len().await, entries_before);
    }

    #[tokio::test]
    async fn test_add_tags_changes_namespace() {
        let shared = store();
        let single = TagCache::new(Arc::clone(&shared), ["a"]);
        single.set("k", "only-a", TTL).await.unwrap();

        let both = TagCache::new(Arc::clone(&shared), ["a"]).add_tags(["b"]);
        assert_eq!(both.tags().len(), 2);
        assert_eq!(both.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_counters_and_delete() {
        let cache = TagCache::new(store(), ["counters"]);

        assert_eq!(cache.increment("hits").await.unwrap(), 1);
        assert_eq!(cache.increment("hits").await.unwrap(), 2);
        assert_eq!(cache.decrement("hits").await.unwrap(), 1);

        cache.delete("hits").await.unwrap();
        assert_eq!(cache.get("hits").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_touch_refreshes_expiry() {
        let cache = TagCache::new(store(), ["session"]);

        cache.set("sid", "abc", Duration::from_millis(50)).await.unwrap();
        cache.touch("sid", Duration::from_secs(60)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(cache.get("sid").await.unwrap(), Some("abc".to_string()));
    }

    #[tokio::test]
    async fn test_batch_operations() {
        let cache = TagCache::new(store(), ["batch"]);

        let mut items = HashMap::new();
        items.insert("a".to_string(), "1".to_string());
        items.insert("b".to_string(), "2".to_string());
        cache.batch_set(&items, TTL).await.unwrap();

        let keys = vec!["b".to_string(), "missing".to_string(), "a".to_string()];
        assert_eq!(
            cache.batch_get(&keys).await.unwrap(),
            vec![Some("2".to_string()), None, Some("1".to_string())]
        );
        assert_eq!(cache.get("a").await.unwrap(), Some("1".to_string()));
    }
}

//! Tag registry: names, version counters and namespace composition

use crate::error::Result;
use crate::store::{CacheStore, NO_EXPIRY};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Separator between tag entries inside a namespace
pub const NAMESPACE_SEPARATOR: &str = "|";

/// Separator between a tag and its version inside a namespace entry
pub const VERSION_SEPARATOR: &str = "=";

/// Versions above this are reset to 0 instead of incremented further
pub const VERSION_RESET_THRESHOLD: i64 = i64::MAX - 10;

/// Backend key holding the version counter of `name`
pub fn tag_key(name: &str) -> String {
    format!("tag:{}:key", name)
}

/// Namespace entry for one tag: `tag:<name>:key=<version>`
///
/// Separator characters inside `name` are backslash-escaped, so distinct
/// tag sets never render to the same namespace.
fn namespace_entry(name: &str, version: &str) -> String {
    let mut escaped = String::with_capacity(name.len());
    for c in name.chars() {
        if matches!(c, '\\' | '|' | '=') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    format!("{}{}{}", tag_key(&escaped), VERSION_SEPARATOR, version)
}

/// A set of tag names plus the store their version counters live in
///
/// Names are kept in a `BTreeSet`, so duplicates collapse and iteration is
/// always ascending. That ordering is what makes [`TagSet::namespace`]
/// independent of the order callers listed their tags in.
#[derive(Clone)]
pub struct TagSet {
    store: Arc<dyn CacheStore>,
    names: BTreeSet<String>,
}

impl TagSet {
    /// Create a tag set over `store` seeded with `names`
    pub fn new<I, S>(store: Arc<dyn CacheStore>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self {
            store,
            names: BTreeSet::new(),
        };
        set.set_names(names);
        set
    }

    /// Replace the owned names
    pub fn set_names<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names = names.into_iter().map(Into::into).collect();
    }

    /// Union `names` into the owned names
    pub fn add_names<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names.extend(names.into_iter().map(Into::into));
    }

    /// Owned names in ascending order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Number of owned names
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check if no names are owned
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Current version of `name`, creating the counter on first use
    pub async fn tag_version(&self, name: &str) -> Result<String> {
        match self.store.get(&tag_key(name)).await? {
            Some(version) => Ok(version),
            None => {
                debug!("Tag '{}' has no version yet, creating it", name);
                self.bump(name).await
            }
        }
    }

    /// Versions of every owned tag, ordered by tag name
    pub async fn tag_versions(&self) -> Result<Vec<String>> {
        let mut versions = Vec::with_capacity(self.names.len());
        for name in &self.names {
            versions.push(self.tag_version(name).await?);
        }
        Ok(versions)
    }

    /// Namespace string derived from the owned tags and their versions
    ///
    /// Each tag contributes `tag:<name>:key=<version>`, in ascending name
    /// order. Empty when no tags are owned.
    pub async fn namespace(&self) -> Result<String> {
        let versions = self.tag_versions().await?;
        let entries: Vec<String> = self
            .names
            .iter()
            .zip(versions.iter())
            .map(|(name, version)| namespace_entry(name, version))
            .collect();
        Ok(entries.join(NAMESPACE_SEPARATOR))
    }

    /// Advance the version of `name` and return the new value
    ///
    /// A counter that passes [`VERSION_RESET_THRESHOLD`] is set back to 0.
    pub async fn bump(&self, name: &str) -> Result<String> {
        let key = tag_key(name);
        let version = self.store.increment(&key).await?;

        if version > VERSION_RESET_THRESHOLD {
            warn!("Tag '{}' version {} near i64::MAX, resetting to 0", name, version);
            self.store.set(&key, "0", NO_EXPIRY).await?;
            return Ok("0".to_string());
        }

        debug!("Bumped tag '{}' to version {}", name, version);
        Ok(version.to_string())
    }

    /// Bump every owned tag
    ///
    /// Stops at the first failure; tags bumped before it stay bumped, which
    /// only means a retry skips a version number.
    pub async fn reset_all(&self) -> Result<()> {
        for name in &self.names {
            self.bump(name).await?;
        }
        Ok(())
    }
}

impl fmt::Debug for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagSet").field("names", &self.names).finish()
    }
}

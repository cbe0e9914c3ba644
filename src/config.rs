//! Configuration for building a cache engine

use crate::error::{Result, TagCacheError};
use serde::{Deserialize, Serialize};

/// Adapter used when none is configured
pub const DEFAULT_ADAPTER: &str = "memory";

/// Environment variable holding the adapter name
pub const ENV_ADAPTER: &str = "TAGCACHE_ADAPTER";

/// Environment variable holding the adapter JSON payload
pub const ENV_ADAPTER_CONFIG: &str = "TAGCACHE_ADAPTER_CONFIG";

/// Environment variable holding the key prefix
pub const ENV_SECTION: &str = "TAGCACHE_SECTION";

/// Options consumed by [`Engine::new`](crate::Engine::new)
///
/// `adapter_config` is handed to the backend verbatim; the engine never
/// looks inside it. `section` is the key prefix backends apply so several
/// cache users can share one server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Options {
    /// Name of the registered adapter
    pub adapter: String,

    /// Adapter-specific configuration, usually JSON
    pub adapter_config: String,

    /// Key prefix applied by the backend
    pub section: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            adapter: DEFAULT_ADAPTER.to_string(),
            adapter_config: String::new(),
            section: String::new(),
        }
    }
}

impl Options {
    /// Create a new builder for engine options
    pub fn builder() -> OptionsBuilder {
        OptionsBuilder::default()
    }

    /// Load options from the process environment
    ///
    /// A `.env` file in the working directory is read first when present.
    /// Unset variables fall back to [`Options::default`].
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let defaults = Options::default();
        let options = Self {
            adapter: std::env::var(ENV_ADAPTER).unwrap_or(defaults.adapter),
            adapter_config: std::env::var(ENV_ADAPTER_CONFIG).unwrap_or(defaults.adapter_config),
            section: std::env::var(ENV_SECTION).unwrap_or(defaults.section),
        };

        options.validate()?;
        Ok(options)
    }

    /// Validate the options
    pub fn validate(&self) -> Result<()> {
        if self.adapter.trim().is_empty() {
            return Err(TagCacheError::ConfigError(
                "adapter name must not be empty".to_string(),
            ));
        }

        if self.section.chars().any(char::is_whitespace) {
            return Err(TagCacheError::ConfigError(format!(
                "section '{}' must not contain whitespace",
                self.section
            )));
        }

        // The section becomes a KEYS pattern on flush
        if self.section.contains(SECTION_GLOB_CHARS) {
            return Err(TagCacheError::ConfigError(format!(
                "section '{}' must not contain glob characters",
                self.section
            )));
        }

        Ok(())
    }

    /// Parse the adapter payload into a backend config type
    ///
    /// An empty payload yields `T::default()`.
    pub fn parse_adapter_config<T>(&self) -> Result<T>
    where
        T: for<'de> Deserialize<'de> + Default,
    {
        if self.adapter_config.trim().is_empty() {
            return Ok(T::default());
        }

        serde_json::from_str(&self.adapter_config).map_err(|e| {
            TagCacheError::ConfigError(format!(
                "invalid {} adapter config: {}",
                self.adapter, e
            ))
        })
    }
}

/// Characters with a meaning in redis `KEYS`/`SCAN` patterns
const SECTION_GLOB_CHARS: &[char] = &['*', '?', '[', ']', '\\'];

/// Builder for engine options
#[derive(Debug, Default)]
pub struct OptionsBuilder {
    adapter: Option<String>,
    adapter_config: Option<String>,
    section: Option<String>,
}

impl OptionsBuilder {
    /// Set the adapter name
    pub fn adapter(mut self, adapter: impl Into<String>) -> Self {
        self.adapter = Some(adapter.into());
        self
    }

    /// Set the adapter payload
    pub fn adapter_config(mut self, config: impl Into<String>) -> Self {
        self.adapter_config = Some(config.into());
        self
    }

    /// Set the key prefix
    pub fn section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    /// Build the options
    pub fn build(self) -> Options {
        let defaults = Options::default();

        Options {
            adapter: self.adapter.unwrap_or(defaults.adapter),
            adapter_config: self.adapter_config.unwrap_or(defaults.adapter_config),
            section: self.section.unwrap_or(defaults.section),
        }
    }
}

//! # tagcache
//!
//! A cache-tagging layer for key-value backends. Entries are written under one
//! or more tags, and a whole tag is invalidated with a single atomic increment
//! instead of a scan over its keys.
//!
//! ## Features
//!
//! - Tag versioning with O(number of tags) invalidation
//! - Order-independent namespaces for tag sets
//! - Pluggable backends through the [`CacheStore`] trait
//! - Explicit [`AdapterRegistry`] for backend selection by name
//! - Bundled in-memory backend, Redis backend behind the `redis-backend` feature
//! - Async-first design using tokio
//!
//! ## Plain Cache
//!
//! ```
//! use std::time::Duration;
//! use tagcache::{AdapterRegistry, Engine, Options};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let registry = AdapterRegistry::with_defaults();
//!     let cache = Engine::new(&registry, Options::default()).await?;
//!
//!     cache.set("da", "weisd", Duration::from_secs(300)).await?;
//!     assert_eq!(cache.get("da").await?, Some("weisd".to_string()));
//!     Ok(())
//! }
//! ```
//!
//! ## Tagged Cache
//!
//! Tag sets compose: an entry written under `["aa", "cc"]` is reachable only
//! through that exact set and disappears when either tag is flushed.
//!
//! ```
//! use std::time::Duration;
//! use tagcache::{AdapterRegistry, Engine, Options};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let registry = AdapterRegistry::with_defaults();
//!     let cache = Engine::new(&registry, Options::default()).await?;
//!     let ttl = Duration::from_secs(300);
//!
//!     cache.with_tags(["dd"]).set("da", "weisd", ttl).await?;
//!     cache.with_tags(["aa", "cc"]).set("cc", "dada", ttl).await?;
//!
//!     cache.with_tags(["aa"]).flush().await?;
//!
//!     assert_eq!(cache.with_tags(["cc", "aa"]).get("cc").await?, None);
//!     assert_eq!(
//!         cache.with_tags(["dd"]).get("da").await?,
//!         Some("weisd".to_string())
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Redis
//!
//! ```no_run
//! # #[cfg(feature = "redis-backend")]
//! # async fn example() -> anyhow::Result<()> {
//! use tagcache::{AdapterRegistry, Engine, Options};
//!
//! let options = Options::builder()
//!     .adapter("redis")
//!     .adapter_config(r#"{"addr":"127.0.0.1:6379"}"#)
//!     .section("dada")
//!     .build();
//!
//! let cache = Engine::new(&AdapterRegistry::with_defaults(), options).await?;
//! cache.with_tags(["users"]).flush().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod registry;
pub mod store;
pub mod tag;

// Re-export main types for convenience
pub use config::{Options, OptionsBuilder};
pub use engine::Engine;
pub use error::{Result, TagCacheError};
pub use registry::{AdapterFactory, AdapterRegistry};
pub use store::{CacheStore, MemoryStore, NO_EXPIRY};
pub use tag::{TagCache, TagSet};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! # Tag versioning
//!
//! Group invalidation without touching individual keys. Every tag owns an
//! integer version counter in the backend (`tag:<name>:key`). A tag set's
//! *namespace* pairs each tag with its version (`tag:<name>:key=<version>`),
//! sorted by tag name and joined with `|`. Data keys are hashed together
//! with that namespace, so bumping any tag's version moves every key of every
//! tag set containing it to a fresh, empty namespace. Invalidation costs one
//! atomic increment per tag, however many keys were written.
//!
//! Old entries are not deleted. They become unreachable and age out through
//! the backend's own expiry.

pub mod cache;
pub mod set;

pub use cache::{tagged_key_for, TagCache};
pub use set::{tag_key, TagSet};

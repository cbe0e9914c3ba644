//! Error types for tagged cache operations
//!
//! Configuration errors surface while an [`Engine`](crate::Engine) is being
//! built. Backend errors are returned unchanged from the operation that hit
//! them. A missing key is never an error; lookups return `Ok(None)`.

use thiserror::Error;

/// Main error type for cache operations
#[derive(Error, Debug)]
pub enum TagCacheError {
    /// No adapter is registered under the requested name
    #[error("Unknown adapter '{name}' (is it registered?)")]
    UnknownAdapter { name: String },

    /// An adapter name was registered twice
    #[error("Adapter '{name}' is already registered")]
    DuplicateAdapter { name: String },

    /// Configuration error - malformed options or adapter payload
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Connection error - backend unreachable or liveness check failed
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Generic backend failure
    #[error("Backend error: {0}")]
    BackendError(String),

    /// Counter operation on a value that does not hold an integer
    #[error("Value at '{key}' is not an integer")]
    NotAnInteger { key: String },

    /// Serialization/Deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Generic error with context
    #[error("Error: {0}")]
    Other(String),
}

impl TagCacheError {
    /// Whether the error stems from setup rather than from a live backend call
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            TagCacheError::UnknownAdapter { .. }
                | TagCacheError::DuplicateAdapter { .. }
                | TagCacheError::ConfigError(_)
        )
    }
}

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, TagCacheError>;

impl From<String> for TagCacheError {
    fn from(s: String) -> Self {
        TagCacheError::Other(s)
    }
}

impl From<&str> for TagCacheError {
    fn from(s: &str) -> Self {
        TagCacheError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for TagCacheError {
    fn from(e: serde_json::Error) -> Self {
        TagCacheError::SerializationError(e.to_string())
    }
}

#[cfg(feature = "redis-backend")]
impl From<redis::RedisError> for TagCacheError {
    fn from(e: redis::RedisError) -> Self {
        if e.is_connection_dropped() || e.is_connection_refusal() || e.is_io_error() {
            TagCacheError::ConnectionError(e.to_string())
        } else {
            TagCacheError::BackendError(e.to_string())
        }
    }
}

//! Cache store error types.

use thiserror::Error;

/// Errors from the key/value store behind the cache layer.
///
/// These never reach callers of `SearchCache`; they are logged and degraded to a miss
/// or a no-op there.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// The store could not be reached.
    #[error("Cache connection error: {0}")]
    ConnectionError(String),

    /// The store rejected a command.
    #[error("Cache command error: {0}")]
    CommandError(String),

    /// A value could not be (de)serialized.
    #[error("Cache serialization error: {0}")]
    SerializationError(String),

    /// The store did not answer within the configured timeout.
    #[error("Cache operation timed out after {0} ms")]
    Timeout(u64),
}

impl CacheError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create a command error.
    pub fn command(msg: impl Into<String>) -> Self {
        Self::CommandError(msg.into())
    }

    /// Create a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_refusal() || err.is_connection_dropped() || err.is_io_error() {
            Self::ConnectionError(err.to_string())
        } else {
            Self::CommandError(err.to_string())
        }
    }
}

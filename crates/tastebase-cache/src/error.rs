//! Error types for cache store operations.

use thiserror::Error;

/// Errors surfaced by the primary store.
///
/// Connection failures are the trigger for the service's degraded mode;
/// everything else is a failed operation reported to the caller.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The primary store could not be reached, at init or at runtime.
    #[error("primary store connection failed: {0}")]
    Connection(String),

    /// A value read from the primary store is not valid JSON.
    ///
    /// Never swallowed: silently returning a miss here would hand the
    /// caller a wrong answer for a key that does exist.
    #[error("failed to decode cached payload for key '{key}'")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A value could not be serialized before transmission.
    #[error("failed to encode value for key '{key}'")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The store replied, but with something unexpected.
    #[error("unexpected primary store reply: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether this error means the primary store connection is gone,
    /// as opposed to a bad payload or reply.
    pub fn is_connection(&self) -> bool {
        matches!(self, StoreError::Connection(_))
    }
}

impl From<deadpool_redis::PoolError> for StoreError {
    fn from(err: deadpool_redis::PoolError) -> Self {
        StoreError::Connection(err.to_string())
    }
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error()
            || err.is_connection_refusal()
            || err.is_connection_dropped()
            || err.is_timeout()
        {
            StoreError::Connection(err.to_string())
        } else {
            StoreError::Backend(err.to_string())
        }
    }
}

//! Cache error types.

use thiserror::Error;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache-related errors.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Invalid configuration rejected at construction.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Redis error.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A byte payload that is not well-formed JSON was rejected.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Connection retries were exhausted.
    #[error("Connection retries exhausted after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },
}

impl CacheError {
    /// Returns true if retrying the operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CacheError::Redis(_) | CacheError::RetriesExhausted { .. }
        )
    }
}

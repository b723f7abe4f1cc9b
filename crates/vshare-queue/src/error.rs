//! Queue error types.

use thiserror::Error;

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Duplicate job: {0}")]
    Duplicate(String),
}

impl QueueError {
    pub fn duplicate(key: impl Into<String>) -> Self {
        Self::Duplicate(key.into())
    }
}

//! Queue error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("message parse error: {0}")]
    Parse(String),

    #[error("provider error: {0}")]
    Provider(String),
}

#[cfg(feature = "redis")]
impl From<::redis::RedisError> for QueueError {
    fn from(e: ::redis::RedisError) -> Self {
        if e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() {
            QueueError::Connection(e.to_string())
        } else {
            QueueError::Provider(e.to_string())
        }
    }
}

//! Queue Error Types

/// Validation failure produced while constructing a message. Always
/// recoverable: the producer decides whether to retry, log, or drop.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Required field is empty: {field}")]
    EmptyField { field: &'static str },

    #[error("Payload too large: {size} bytes (limit: {limit})")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("Response message requires a correlation id")]
    MissingCorrelation,
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Queue iteration already started")]
    AlreadyStarted,

    #[error("Queue is done, no further messages accepted")]
    Done,

    #[error("Queue is full (max size: {max_size})")]
    Full { max_size: usize },

    #[error("Queue is in error state: {reason}")]
    Errored { reason: String },

    #[error("Queue has been destroyed")]
    Destroyed,

    #[error("Invalid message: {0}")]
    Validation(#[from] ValidationError),

    /// Internal invariant failure (poisoned lock, misused reader slot).
    #[error("Queue internal error: {message}")]
    Internal { message: String },
}

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

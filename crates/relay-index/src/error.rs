//! Index error types.

use crate::ports::StoreError;
use thiserror::Error;

/// Errors surfaced by the subscription index.
#[derive(Debug, Clone, Error)]
pub enum IndexError {
    /// The backing store could not complete an operation. The index does
    /// not retry; the caller decides whether the row aborts.
    #[error("Subscription store unavailable: {0}")]
    StoreUnavailable(String),

    /// A stored value did not match the expected record shape.
    #[error("Corrupt record under key '{key}': {reason}")]
    CorruptRecord { key: String, reason: String },
}

impl From<StoreError> for IndexError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => Self::StoreUnavailable(msg),
        }
    }
}

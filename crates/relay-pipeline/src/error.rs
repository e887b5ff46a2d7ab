//! Pipeline error types.

use relay_index::IndexError;
use thiserror::Error;

/// Errors that abort a row's pipeline.
///
/// Resolution and decode failures are terminal *outcomes*, not errors
/// (see [`crate::RowOutcome`]); only a store failure surfaces here.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The subscription store was unavailable; the row aborts with no
    /// partial writes assumed durable.
    #[error(transparent)]
    Index(#[from] IndexError),
}

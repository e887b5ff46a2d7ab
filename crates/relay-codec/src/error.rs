//! Codec error types.

use thiserror::Error;

/// Errors from decoding a hex-encoded blob.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Input does not cover the fixed header.
    #[error("Input too short: expected at least {expected} hex chars after prefix, got {actual}")]
    InputTooShort { expected: usize, actual: usize },

    /// Non-hexadecimal characters inside the fixed header.
    #[error("Invalid hex in header: {0}")]
    InvalidHex(String),
}

//! # Operation Codec
//!
//! Pure, synchronous decoding of the two hex-encoded blobs the relay
//! consumes from the chain:
//!
//! - [`decode_operation`]: a fixed-layout, version-tagged list operation
//!   (follow / unfollow / tag / untag against a 20-byte subject address).
//! - [`decode_list_storage_location`]: the storage-location record that
//!   points at a list's backing contract, chain, and slot.
//!
//! No I/O, no retries, no logging. Malformed input of sufficient length
//! never fails: unrecognized opcodes decode to [`OpKind::Unknown`]. Input
//! shorter than the fixed header is an explicit [`DecodeError`] so callers
//! terminate the row instead of reading garbage.

pub mod error;
pub mod location;
pub mod operation;

pub use error::DecodeError;
pub use location::{decode_list_storage_location, ListStorageLocation};
pub use operation::{decode_operation, OpKind, Operation};

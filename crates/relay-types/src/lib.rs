//! # Shared Types
//!
//! Domain types shared across the relay crates. This is the single source
//! of truth for the address and chat-identifier types and for the closed
//! change-feed row structure consumed by the pipeline.

pub mod address;
pub mod feed;

pub use address::{format_address, is_address, parse_address, AddressParseError};
pub use feed::{EventArgs, FeedRow, LIST_OP_EVENT};

/// A 20-byte account address.
pub type Address = primitive_types::H160;

/// A 256-bit unsigned integer (chain ids, slots, list ids).
pub type U256 = primitive_types::U256;

/// A chat session identifier on the notification transport.
///
/// Telegram chat ids are signed 64-bit integers (negative for groups).
pub type ChatId = i64;

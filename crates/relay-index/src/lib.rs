//! # Subscription Index
//!
//! A logical bidirectional mapping between watched addresses and the chat
//! sessions subscribed to them, persisted in an external key-value store:
//!
//! - `0x<address>` (lowercase) -> `{"chats": [id, ...]}`
//! - `subs:<chat_id>`          -> `{"subs": ["0x...", ...]}`
//!
//! All operations are idempotent. The index never retries a failed store
//! call; retries are an orchestrator concern.
//!
//! ## Concurrency
//!
//! Every mutation is a read-modify-write over individual keys, and the
//! external store is only atomic per key. Two concurrent writers to the
//! same key can lose an update. This is an accepted limitation: the index
//! keeps the read-to-write window as short as possible and does not mask
//! the race.

pub mod error;
pub mod index;
pub mod ports;

pub use error::IndexError;
pub use index::{SubscribeOutcome, SubscriptionIndex};
pub use ports::{StoreError, SubscriptionStore};

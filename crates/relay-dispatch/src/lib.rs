//! # Notification Dispatcher
//!
//! Delivers a formatted notification for one decoded operation to every
//! interested recipient, with:
//!
//! - per-recipient failure isolation (one blocked chat never aborts the
//!   rest),
//! - a configurable pacing delay between successive deliveries to respect
//!   the outbound transport's rate limit,
//! - a per-recipient outcome collected into a [`DeliveryReport`].
//!
//! Recipients arrive as two logical groups (target-watchers, then
//! operator-watchers). A chat present in both groups is delivered to once;
//! the target-watcher group wins the ordering.

pub mod dispatcher;
pub mod ports;
pub mod report;

pub use dispatcher::{format_message, DispatchConfig, Dispatcher};
pub use ports::{DeliveryError, Messenger, SendOptions};
pub use report::{DeliveryOutcome, DeliveryReport, RecipientGroups};

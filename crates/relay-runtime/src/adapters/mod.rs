//! Concrete implementations of the outbound ports.

pub mod chain;
pub mod names;
pub mod store;
pub mod telegram;

pub use chain::JsonRpcRegistry;
pub use names::EnsWorkerClient;
pub use store::{RocksDbConfig, RocksDbStore};
pub use telegram::{InlineKeyboard, TelegramApi, TelegramError};

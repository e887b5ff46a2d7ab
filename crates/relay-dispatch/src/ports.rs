//! Outbound port for the notification transport.

use async_trait::async_trait;
use relay_types::ChatId;
use thiserror::Error;

/// Per-message transport options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendOptions {
    /// Interpret the message body as rich text (HTML).
    pub html: bool,
    /// Suppress link previews for embedded profile links.
    pub disable_link_preview: bool,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            html: true,
            disable_link_preview: true,
        }
    }
}

/// A single delivery failure. Isolated to its recipient.
#[derive(Debug, Clone, Error)]
pub enum DeliveryError {
    /// The transport could not be reached.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The transport rejected the delivery (blocked bot, invalid chat).
    #[error("Delivery rejected: {0}")]
    Rejected(String),
}

/// The notification transport.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Deliver `text` to `chat`. At-least-once; no ordering guarantee
    /// across chats.
    async fn send(
        &self,
        chat: ChatId,
        text: &str,
        options: &SendOptions,
    ) -> Result<(), DeliveryError>;
}

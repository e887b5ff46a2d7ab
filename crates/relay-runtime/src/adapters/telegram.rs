//! Telegram Bot API adapter.
//!
//! Implements the `Messenger` port for outbound notifications and exposes
//! the handful of extra methods the command surface needs (long-poll
//! updates, callback answers, message edits).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use relay_dispatch::{DeliveryError, Messenger, SendOptions};
use relay_types::ChatId;

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("Telegram transport failed: {0}")]
    Transport(String),
    #[error("Telegram rejected {method}: {description}")]
    Api { method: String, description: String },
}

#[derive(Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: ChatId,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub data: Option<String>,
    pub message: Option<Message>,
}

/// One row of inline buttons, each carrying a callback payload.
#[derive(Debug, Clone, Serialize)]
pub struct InlineKeyboard {
    inline_keyboard: Vec<Vec<InlineButton>>,
}

#[derive(Debug, Clone, Serialize)]
struct InlineButton {
    text: String,
    callback_data: String,
}

impl InlineKeyboard {
    /// A single Yes/No row.
    pub fn confirm_row(yes: (&str, &str), no: (&str, &str)) -> Self {
        Self {
            inline_keyboard: vec![vec![
                InlineButton {
                    text: yes.0.to_string(),
                    callback_data: yes.1.to_string(),
                },
                InlineButton {
                    text: no.0.to_string(),
                    callback_data: no.1.to_string(),
                },
            ]],
        }
    }
}

#[derive(Serialize)]
struct LinkPreviewOptions {
    is_disabled: bool,
}

#[derive(Serialize)]
struct SendMessageBody<'a> {
    chat_id: ChatId,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    link_preview_options: Option<LinkPreviewOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<&'a InlineKeyboard>,
}

/// Telegram Bot API client.
pub struct TelegramApi {
    client: Client,
    base_url: String,
}

impl TelegramApi {
    pub fn new(bot_token: &str) -> Result<Self, TelegramError> {
        Self::with_base_url(format!("https://api.telegram.org/bot{bot_token}"))
    }

    /// Point the client at an alternate API server.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, TelegramError> {
        // No overall timeout: getUpdates long-polls for up to the poll
        // timeout plus network latency.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| TelegramError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    async fn call<B: Serialize, T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<T, TelegramError> {
        let url = format!("{}/{}", self.base_url, method);
        let response: ApiResponse<T> = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| TelegramError::Transport(e.to_string()))?
            .json()
            .await
            .map_err(|e| TelegramError::Transport(e.to_string()))?;

        if !response.ok {
            return Err(TelegramError::Api {
                method: method.to_string(),
                description: response
                    .description
                    .unwrap_or_else(|| "no description".to_string()),
            });
        }
        response.result.ok_or_else(|| TelegramError::Api {
            method: method.to_string(),
            description: "ok response without result".to_string(),
        })
    }

    pub async fn send_message(
        &self,
        chat: ChatId,
        text: &str,
        options: &SendOptions,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<Message, TelegramError> {
        let body = SendMessageBody {
            chat_id: chat,
            text,
            parse_mode: options.html.then_some("HTML"),
            link_preview_options: options
                .disable_link_preview
                .then_some(LinkPreviewOptions { is_disabled: true }),
            reply_markup: keyboard,
        };
        self.call("sendMessage", &body).await
    }

    /// Long-poll for updates past `offset`.
    pub async fn get_updates(
        &self,
        offset: i64,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, TelegramError> {
        self.call(
            "getUpdates",
            &serde_json::json!({ "offset": offset, "timeout": timeout_secs }),
        )
        .await
    }

    pub async fn send_chat_action(&self, chat: ChatId, action: &str) -> Result<(), TelegramError> {
        let _: bool = self
            .call(
                "sendChatAction",
                &serde_json::json!({ "chat_id": chat, "action": action }),
            )
            .await?;
        Ok(())
    }

    pub async fn answer_callback_query(
        &self,
        callback_id: &str,
        text: Option<&str>,
    ) -> Result<(), TelegramError> {
        let mut body = serde_json::json!({ "callback_query_id": callback_id });
        if let Some(text) = text {
            body["text"] = serde_json::Value::String(text.to_string());
        }
        let _: bool = self.call("answerCallbackQuery", &body).await?;
        Ok(())
    }

    /// Replace the text of a previously sent message, dropping its
    /// inline keyboard.
    pub async fn edit_message_text(
        &self,
        chat: ChatId,
        message_id: i64,
        text: &str,
    ) -> Result<(), TelegramError> {
        let _: serde_json::Value = self
            .call(
                "editMessageText",
                &serde_json::json!({
                    "chat_id": chat,
                    "message_id": message_id,
                    "text": text,
                }),
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Messenger for TelegramApi {
    async fn send(
        &self,
        chat: ChatId,
        text: &str,
        options: &SendOptions,
    ) -> Result<(), DeliveryError> {
        match self.send_message(chat, text, options, None).await {
            Ok(_) => Ok(()),
            Err(TelegramError::Api { description, .. }) => {
                Err(DeliveryError::Rejected(description))
            }
            Err(TelegramError::Transport(e)) => Err(DeliveryError::Transport(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_body_includes_html_and_preview_suppression() {
        let body = SendMessageBody {
            chat_id: -100,
            text: "hello",
            parse_mode: Some("HTML"),
            link_preview_options: Some(LinkPreviewOptions { is_disabled: true }),
            reply_markup: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["chat_id"], -100);
        assert_eq!(json["parse_mode"], "HTML");
        assert_eq!(json["link_preview_options"]["is_disabled"], true);
        assert!(json.get("reply_markup").is_none());
    }

    #[test]
    fn test_confirm_keyboard_shape() {
        let keyboard = InlineKeyboard::confirm_row(("Yes", "go"), ("No", "stop"));
        let json = serde_json::to_value(&keyboard).unwrap();
        assert_eq!(json["inline_keyboard"][0][0]["text"], "Yes");
        assert_eq!(json["inline_keyboard"][0][1]["callback_data"], "stop");
    }

    #[test]
    fn test_update_deserializes_message_and_callback() {
        let raw = r#"{
            "update_id": 5,
            "message": { "message_id": 1, "chat": { "id": 42 }, "text": "/help" }
        }"#;
        let update: Update = serde_json::from_str(raw).unwrap();
        assert_eq!(update.update_id, 5);
        assert_eq!(update.message.unwrap().chat.id, 42);
        assert!(update.callback_query.is_none());
    }
}

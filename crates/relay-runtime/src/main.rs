//! # Follow-Relay Runtime
//!
//! The relay binary. Wires the concrete adapters into the pipeline and
//! runs three independent loops until Ctrl-C:
//!
//! - the feed loop, spawning one pipeline task per change-feed row;
//! - the command loop, long-polling the chat transport for commands;
//! - the heartbeat loop, pinging a liveness URL on an interval.
//!
//! A failed row, command, or ping never exits the process; only Ctrl-C
//! (or an unusable configuration at startup) does.

mod adapters;
mod commands;
mod config;
mod feed;
mod heartbeat;
mod telemetry;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{error, info, warn};

use relay_dispatch::{DispatchConfig, Dispatcher, SendOptions};
use relay_index::{SubscriptionIndex, SubscriptionStore};
use relay_pipeline::{EventPipeline, NameDirectory, PipelineConfig};
use relay_types::ChatId;

use crate::adapters::telegram::Update;
use crate::adapters::{
    EnsWorkerClient, InlineKeyboard, JsonRpcRegistry, RocksDbConfig, RocksDbStore, TelegramApi,
};
use crate::commands::{
    parse_command, ChatContext, Command, CommandHandler, CANCEL_UNSUBSCRIBE_ALL,
    CONFIRM_UNSUBSCRIBE_ALL,
};
use crate::config::{RelayConfig, HOME_CHAIN_ID};

/// Command replies are plain text; notifications are the only HTML sends.
const REPLY_OPTIONS: SendOptions = SendOptions {
    html: false,
    disable_link_preview: true,
};

/// [`ChatContext`] backed by the Telegram adapter.
struct TelegramChatContext {
    api: Arc<TelegramApi>,
    chat: ChatId,
}

#[async_trait]
impl ChatContext for TelegramChatContext {
    fn chat_id(&self) -> ChatId {
        self.chat
    }

    async fn reply(&self, text: &str) -> Result<()> {
        self.api
            .send_message(self.chat, text, &REPLY_OPTIONS, None)
            .await?;
        Ok(())
    }

    async fn reply_with_confirmation(
        &self,
        text: &str,
        yes_data: &str,
        no_data: &str,
    ) -> Result<()> {
        let keyboard = InlineKeyboard::confirm_row(("Yes", yes_data), ("No", no_data));
        self.api
            .send_message(self.chat, text, &REPLY_OPTIONS, Some(&keyboard))
            .await?;
        Ok(())
    }
}

/// Long-poll for updates and route them to the command handler.
async fn run_command_loop<S, N>(
    api: Arc<TelegramApi>,
    handler: Arc<CommandHandler<S, N>>,
    poll_timeout_secs: u64,
    mut shutdown: watch::Receiver<bool>,
) where
    S: SubscriptionStore,
    N: NameDirectory,
{
    let mut offset = 0i64;
    loop {
        let updates = tokio::select! {
            _ = shutdown.changed() => {
                info!("Command loop stopping on shutdown signal");
                break;
            }
            result = api.get_updates(offset, poll_timeout_secs) => match result {
                Ok(updates) => updates,
                Err(e) => {
                    warn!(error = %e, "getUpdates failed, backing off");
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    continue;
                }
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);
            handle_update(&api, &handler, update).await;
        }
    }
}

async fn handle_update<S, N>(
    api: &Arc<TelegramApi>,
    handler: &Arc<CommandHandler<S, N>>,
    update: Update,
) where
    S: SubscriptionStore,
    N: NameDirectory,
{
    if let Some(message) = update.message {
        let Some(text) = message.text.as_deref() else {
            return;
        };
        let Some(command) = parse_command(text) else {
            return;
        };
        let chat = message.chat.id;
        if matches!(command, Command::Subscribe(_) | Command::List) {
            if let Err(e) = api.send_chat_action(chat, "typing").await {
                warn!(chat_id = chat, error = %e, "sendChatAction failed");
            }
        }
        let ctx = TelegramChatContext {
            api: Arc::clone(api),
            chat,
        };
        if let Err(e) = handler.handle(&ctx, command).await {
            warn!(chat_id = chat, error = %e, "Command handling failed");
        }
        return;
    }

    let Some(query) = update.callback_query else {
        return;
    };
    match query.data.as_deref() {
        Some(CONFIRM_UNSUBSCRIBE_ALL) => {
            let Some(message) = query.message else {
                answer_quietly(api, &query.id, None).await;
                return;
            };
            match handler.confirm_unsubscribe_all(message.chat.id).await {
                Ok(text) => {
                    if let Err(e) = api
                        .edit_message_text(message.chat.id, message.message_id, text)
                        .await
                    {
                        warn!(chat_id = message.chat.id, error = %e, "editMessageText failed");
                    }
                    answer_quietly(api, &query.id, Some(text)).await;
                }
                Err(e) => {
                    warn!(chat_id = message.chat.id, error = %e, "Unsubscribe-all failed");
                    answer_quietly(api, &query.id, Some("Something went wrong, try again."))
                        .await;
                }
            }
        }
        Some(CANCEL_UNSUBSCRIBE_ALL) => {
            if let Some(message) = query.message {
                if let Err(e) = api
                    .edit_message_text(message.chat.id, message.message_id, "Cancelled.")
                    .await
                {
                    warn!(chat_id = message.chat.id, error = %e, "editMessageText failed");
                }
            }
            answer_quietly(api, &query.id, None).await;
        }
        other => {
            info!(payload = ?other, "Unknown button event");
            answer_quietly(api, &query.id, None).await;
        }
    }
}

async fn answer_quietly(api: &TelegramApi, callback_id: &str, text: Option<&str>) {
    if let Err(e) = api.answer_callback_query(callback_id, text).await {
        warn!(error = %e, "answerCallbackQuery failed");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init()?;

    let config = RelayConfig::from_env().context("Failed to load configuration")?;
    config.validate()?;

    info!("Starting follow-relay v{}", env!("CARGO_PKG_VERSION"));
    info!(data_dir = %config.store.data_dir.display(), "Opening subscription store");
    let store = Arc::new(
        RocksDbStore::open(RocksDbConfig::new(&config.store.data_dir))
            .context("Failed to open subscription store")?,
    );

    let registry = Arc::new(
        JsonRpcRegistry::new(
            config.chain.rpc_urls.clone(),
            config.chain.account_metadata,
            HOME_CHAIN_ID,
        )
        .context("Failed to build chain-read client")?,
    );
    let names = Arc::new(
        EnsWorkerClient::new(config.names.worker_url.clone())
            .context("Failed to build name-resolution client")?,
    );
    let api = Arc::new(
        TelegramApi::new(&config.telegram.bot_token)
            .context("Failed to build Telegram client")?,
    );

    let dispatcher = Dispatcher::new(
        Arc::clone(&api),
        DispatchConfig {
            pace: config.pipeline.pace,
            ..Default::default()
        },
    );
    let pipeline = Arc::new(EventPipeline::new(
        SubscriptionIndex::new(Arc::clone(&store)),
        Arc::clone(&registry),
        Arc::clone(&names),
        dispatcher,
        PipelineConfig {
            require_primary_list: config.pipeline.require_primary_list,
            retry: config.pipeline.retry.clone(),
        },
    ));
    let handler = Arc::new(CommandHandler::new(
        SubscriptionIndex::new(Arc::clone(&store)),
        Arc::clone(&names),
        config.pipeline.pace,
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let feed_pipeline = Arc::clone(&pipeline);
    let feed_shutdown = shutdown_rx.clone();
    let feed_path = config.feed.path.clone();
    tokio::spawn(async move {
        match feed_path {
            Some(path) => match tokio::fs::File::open(&path).await {
                Ok(file) => {
                    info!(path = %path.display(), "Consuming feed from file");
                    feed::consume_feed(
                        tokio::io::BufReader::new(file),
                        feed_pipeline,
                        feed_shutdown,
                    )
                    .await;
                }
                Err(e) => error!(path = %path.display(), error = %e, "Cannot open feed file"),
            },
            None => {
                info!("Consuming feed from stdin");
                feed::consume_feed(
                    tokio::io::BufReader::new(tokio::io::stdin()),
                    feed_pipeline,
                    feed_shutdown,
                )
                .await;
            }
        }
    });

    tokio::spawn(run_command_loop(
        Arc::clone(&api),
        Arc::clone(&handler),
        config.telegram.poll_timeout_secs,
        shutdown_rx.clone(),
    ));
    tokio::spawn(heartbeat::run_heartbeat(
        config.heartbeat.clone(),
        shutdown_rx,
    ));

    info!("Relay is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    info!("Initiating graceful shutdown...");
    if let Err(e) = shutdown_tx.send(true) {
        error!(error = %e, "Failed to send shutdown signal");
    }
    // Give the loops time to observe the signal and in-flight rows time
    // to finish.
    tokio::time::sleep(Duration::from_secs(2)).await;
    info!("Shutdown complete");
    Ok(())
}

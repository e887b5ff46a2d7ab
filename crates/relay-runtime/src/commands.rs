//! Chat command surface.
//!
//! Commands arrive as plain text (`/subscribe vitalik.eth 0xd8dA…`);
//! handlers are written against the narrow [`ChatContext`] trait so they
//! can be driven by tests without a live chat transport.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, warn};

use relay_index::{SubscriptionIndex, SubscriptionStore};
use relay_pipeline::NameDirectory;
use relay_types::{format_address, parse_address, Address, ChatId};

/// Callback payloads for the unsubscribe-all confirmation keyboard.
pub const CONFIRM_UNSUBSCRIBE_ALL: &str = "confirm_unsubscribe_all";
pub const CANCEL_UNSUBSCRIBE_ALL: &str = "cancel_unsubscribe_all";

const HELP_TEXT: &str = "\
Welcome to the follow relay! Use this bot to stay up to date with \
who is following who. Commands:

/subscribe <address_or_name> - Subscribe to updates for an address or name.
/sub <address_or_name> - Alias for /subscribe.
/unsubscribe <address_or_name> - Unsubscribe from updates for an address or name.
/unsub <address_or_name> - Alias for /unsubscribe.
/unsub all - Unsubscribe from all accounts.
/list - List all subscriptions for this chat.
/help - Show this help message.";

const START_TEXT: &str = "Welcome! This bot is ready to send messages. \
Please use /sub or /subscribe to start receiving updates. \
Type /help for more information.";

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    /// One subscription attempt per term.
    Subscribe(Vec<String>),
    Unsubscribe(String),
    UnsubscribeAll,
    List,
}

/// Parse a message text into a command. Returns `None` for non-commands
/// and unknown commands alike.
pub fn parse_command(text: &str) -> Option<Command> {
    let mut tokens = text.split_whitespace();
    let first = tokens.next()?;
    let name = first.strip_prefix('/')?;
    // Group chats address commands as `/list@botname`.
    let name = name.split('@').next().unwrap_or(name);

    match name {
        "start" => Some(Command::Start),
        "help" | "h" => Some(Command::Help),
        "sub" | "subscribe" => Some(Command::Subscribe(
            tokens.map(str::to_string).collect(),
        )),
        "unsub" | "unsubscribe" => {
            let term = tokens.next().unwrap_or_default();
            if term == "all" {
                Some(Command::UnsubscribeAll)
            } else {
                Some(Command::Unsubscribe(term.to_string()))
            }
        }
        "list" => Some(Command::List),
        _ => None,
    }
}

/// The slice of a chat session a command handler needs.
#[async_trait]
pub trait ChatContext: Send + Sync {
    fn chat_id(&self) -> ChatId;

    async fn reply(&self, text: &str) -> Result<()>;

    /// Reply with a Yes/No inline keyboard carrying the given callback
    /// payloads.
    async fn reply_with_confirmation(
        &self,
        text: &str,
        yes_data: &str,
        no_data: &str,
    ) -> Result<()>;
}

/// Executes parsed commands against the index and name directory.
pub struct CommandHandler<S: SubscriptionStore, N: NameDirectory> {
    index: SubscriptionIndex<S>,
    names: Arc<N>,
    /// Delay between replies when one command produces several.
    pace: Duration,
}

impl<S: SubscriptionStore, N: NameDirectory> CommandHandler<S, N> {
    pub fn new(index: SubscriptionIndex<S>, names: Arc<N>, pace: Duration) -> Self {
        Self { index, names, pace }
    }

    pub async fn handle<C: ChatContext>(&self, ctx: &C, command: Command) -> Result<()> {
        match command {
            Command::Start => ctx.reply(START_TEXT).await,
            Command::Help => ctx.reply(HELP_TEXT).await,
            Command::Subscribe(terms) => self.subscribe(ctx, &terms).await,
            Command::Unsubscribe(term) => self.unsubscribe(ctx, &term).await,
            Command::UnsubscribeAll => {
                ctx.reply_with_confirmation(
                    "Are you sure you want to unsubscribe from ALL accounts?",
                    CONFIRM_UNSUBSCRIBE_ALL,
                    CANCEL_UNSUBSCRIBE_ALL,
                )
                .await
            }
            Command::List => self.list(ctx).await,
        }
    }

    /// Execute a confirmed unsubscribe-all, returning the text the caller
    /// should surface to the chat.
    pub async fn confirm_unsubscribe_all(&self, chat: ChatId) -> Result<&'static str> {
        if self.index.list_watched(chat).await?.is_empty() {
            return Ok("This chat has no subscriptions to unsubscribe from.");
        }
        self.index.unsubscribe_all(chat).await?;
        info!(chat_id = chat, "Unsubscribed from all addresses");
        Ok("This chat is now unsubscribed from all addresses.")
    }

    async fn subscribe<C: ChatContext>(&self, ctx: &C, terms: &[String]) -> Result<()> {
        if terms.is_empty() {
            return ctx
                .reply("Usage: /subscribe <address_or_name> [more terms...]")
                .await;
        }
        for (i, term) in terms.iter().enumerate() {
            if i > 0 && !self.pace.is_zero() {
                tokio::time::sleep(self.pace).await;
            }
            self.subscribe_one(ctx, term).await?;
        }
        Ok(())
    }

    async fn subscribe_one<C: ChatContext>(&self, ctx: &C, term: &str) -> Result<()> {
        let Some(address) = self.resolve_term(term).await else {
            return ctx
                .reply("Invalid address or name. Please provide a valid address or a resolvable name.")
                .await;
        };

        let outcome = self.index.subscribe(ctx.chat_id(), &address).await?;
        if outcome.already_subscribed {
            return ctx
                .reply("This chat is already subscribed to updates for this address.")
                .await;
        }
        info!(chat_id = ctx.chat_id(), address = %format_address(&address), "Subscribed");
        ctx.reply(&format!(
            "This chat is now subscribed to updates for: {}",
            format_address(&address)
        ))
        .await
    }

    async fn unsubscribe<C: ChatContext>(&self, ctx: &C, term: &str) -> Result<()> {
        if term.is_empty() {
            return ctx.reply("Usage: /unsubscribe <address_or_name>").await;
        }
        let Some(address) = self.resolve_term(term).await else {
            return ctx
                .reply("Invalid address or name. Please provide a valid address or a resolvable name.")
                .await;
        };

        self.index.unsubscribe(ctx.chat_id(), &address).await?;
        info!(chat_id = ctx.chat_id(), address = %format_address(&address), "Unsubscribed");
        ctx.reply(&format!(
            "This chat is now unsubscribed from updates for: {}.",
            format_address(&address)
        ))
        .await
    }

    async fn list<C: ChatContext>(&self, ctx: &C) -> Result<()> {
        let watched = self.index.list_watched(ctx.chat_id()).await?;
        if watched.is_empty() {
            return ctx.reply("This chat has no subscriptions.").await;
        }

        let names = match self.names.names_for_addresses(&watched).await {
            Ok(names) => names,
            Err(e) => {
                warn!(chat_id = ctx.chat_id(), error = %e, "Batch name lookup failed");
                watched.iter().map(format_address).collect()
            }
        };
        let mut response =
            String::from("This chat is subscribed to the following addresses:\n");
        for name in names {
            response.push_str("- ");
            response.push_str(&name);
            response.push('\n');
        }
        ctx.reply(&response).await
    }

    async fn resolve_term(&self, term: &str) -> Option<Address> {
        if let Ok(address) = parse_address(term) {
            return Some(address);
        }
        match self.names.address_for_name(term).await {
            Ok(address) => address,
            Err(e) => {
                warn!(term, error = %e, "Name resolution failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use relay_pipeline::DirectoryError;
    use relay_index::StoreError;
    use std::collections::HashMap;

    struct MemoryStore {
        data: Mutex<HashMap<String, serde_json::Value>>,
    }

    #[async_trait]
    impl SubscriptionStore for MemoryStore {
        async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError> {
            Ok(self.data.lock().get(key).cloned())
        }

        async fn put(&self, key: &str, value: serde_json::Value) -> Result<(), StoreError> {
            self.data.lock().insert(key.to_string(), value);
            Ok(())
        }
    }

    struct MockDirectory {
        forward: HashMap<String, Address>,
    }

    #[async_trait]
    impl NameDirectory for MockDirectory {
        async fn address_for_name(&self, name: &str) -> Result<Option<Address>, DirectoryError> {
            Ok(self.forward.get(name).copied())
        }

        async fn name_for_address(
            &self,
            _address: Address,
        ) -> Result<Option<String>, DirectoryError> {
            Ok(None)
        }

        async fn names_for_addresses(
            &self,
            addresses: &[Address],
        ) -> Result<Vec<String>, DirectoryError> {
            Ok(addresses.iter().map(format_address).collect())
        }
    }

    #[derive(Default)]
    struct MockContext {
        replies: Mutex<Vec<String>>,
        confirmations: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ChatContext for MockContext {
        fn chat_id(&self) -> ChatId {
            42
        }

        async fn reply(&self, text: &str) -> Result<()> {
            self.replies.lock().push(text.to_string());
            Ok(())
        }

        async fn reply_with_confirmation(
            &self,
            text: &str,
            _yes_data: &str,
            _no_data: &str,
        ) -> Result<()> {
            self.confirmations.lock().push(text.to_string());
            Ok(())
        }
    }

    const ADDR: &str = "0x41aa48ef3c0446b46a5b1cc6337ff3d3716e2a33";

    fn handler(forward: HashMap<String, Address>) -> CommandHandler<MemoryStore, MockDirectory> {
        let store = Arc::new(MemoryStore {
            data: Mutex::new(HashMap::new()),
        });
        CommandHandler::new(
            SubscriptionIndex::new(store),
            Arc::new(MockDirectory { forward }),
            Duration::ZERO,
        )
    }

    #[test]
    fn test_parse_command_variants() {
        assert_eq!(parse_command("/start"), Some(Command::Start));
        assert_eq!(parse_command("/h"), Some(Command::Help));
        assert_eq!(
            parse_command("/sub a.eth 0xabc"),
            Some(Command::Subscribe(vec!["a.eth".into(), "0xabc".into()]))
        );
        assert_eq!(
            parse_command("/subscribe@followbot a.eth"),
            Some(Command::Subscribe(vec!["a.eth".into()]))
        );
        assert_eq!(
            parse_command("/unsubscribe a.eth"),
            Some(Command::Unsubscribe("a.eth".into()))
        );
        assert_eq!(parse_command("/unsub all"), Some(Command::UnsubscribeAll));
        assert_eq!(parse_command("/list"), Some(Command::List));
        assert_eq!(parse_command("hello"), None);
        assert_eq!(parse_command("/frobnicate"), None);
        assert_eq!(parse_command(""), None);
    }

    #[tokio::test]
    async fn test_subscribe_by_address() {
        let handler = handler(HashMap::new());
        let ctx = MockContext::default();

        handler
            .handle(&ctx, Command::Subscribe(vec![ADDR.to_string()]))
            .await
            .unwrap();

        let replies = ctx.replies.lock();
        assert_eq!(
            replies[0],
            format!("This chat is now subscribed to updates for: {ADDR}")
        );
        assert_eq!(
            handler.index.list_watched(42).await.unwrap(),
            vec![parse_address(ADDR).unwrap()]
        );
    }

    #[tokio::test]
    async fn test_subscribe_by_name_resolves_through_directory() {
        let mut forward = HashMap::new();
        forward.insert("alice.eth".to_string(), parse_address(ADDR).unwrap());
        let handler = handler(forward);
        let ctx = MockContext::default();

        handler
            .handle(&ctx, Command::Subscribe(vec!["alice.eth".to_string()]))
            .await
            .unwrap();

        assert!(ctx.replies.lock()[0].contains(ADDR));
    }

    #[tokio::test]
    async fn test_subscribe_unresolvable_term() {
        let handler = handler(HashMap::new());
        let ctx = MockContext::default();

        handler
            .handle(&ctx, Command::Subscribe(vec!["nobody.eth".to_string()]))
            .await
            .unwrap();

        assert!(ctx.replies.lock()[0].starts_with("Invalid address or name"));
    }

    #[tokio::test]
    async fn test_subscribe_twice_reports_already() {
        let handler = handler(HashMap::new());
        let ctx = MockContext::default();

        let command = Command::Subscribe(vec![ADDR.to_string()]);
        handler.handle(&ctx, command.clone()).await.unwrap();
        handler.handle(&ctx, command).await.unwrap();

        assert_eq!(
            ctx.replies.lock()[1],
            "This chat is already subscribed to updates for this address."
        );
    }

    #[tokio::test]
    async fn test_unsubscribe_replies_and_removes() {
        let handler = handler(HashMap::new());
        let ctx = MockContext::default();

        handler
            .handle(&ctx, Command::Subscribe(vec![ADDR.to_string()]))
            .await
            .unwrap();
        handler
            .handle(&ctx, Command::Unsubscribe(ADDR.to_string()))
            .await
            .unwrap();

        assert!(ctx.replies.lock()[1].starts_with("This chat is now unsubscribed"));
        assert!(handler.index.list_watched(42).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unsubscribe_all_asks_for_confirmation() {
        let handler = handler(HashMap::new());
        let ctx = MockContext::default();

        handler.handle(&ctx, Command::UnsubscribeAll).await.unwrap();

        assert!(ctx.replies.lock().is_empty());
        assert_eq!(ctx.confirmations.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_confirm_unsubscribe_all_clears_subscriptions() {
        let handler = handler(HashMap::new());
        let ctx = MockContext::default();
        handler
            .handle(&ctx, Command::Subscribe(vec![ADDR.to_string()]))
            .await
            .unwrap();

        let text = handler.confirm_unsubscribe_all(42).await.unwrap();
        assert_eq!(text, "This chat is now unsubscribed from all addresses.");
        assert!(handler.index.list_watched(42).await.unwrap().is_empty());

        let text = handler.confirm_unsubscribe_all(42).await.unwrap();
        assert_eq!(text, "This chat has no subscriptions to unsubscribe from.");
    }

    #[tokio::test]
    async fn test_list_with_and_without_subscriptions() {
        let handler = handler(HashMap::new());
        let ctx = MockContext::default();

        handler.handle(&ctx, Command::List).await.unwrap();
        assert_eq!(ctx.replies.lock()[0], "This chat has no subscriptions.");

        handler
            .handle(&ctx, Command::Subscribe(vec![ADDR.to_string()]))
            .await
            .unwrap();
        handler.handle(&ctx, Command::List).await.unwrap();

        let replies = ctx.replies.lock();
        let listing = &replies[2];
        assert!(listing.starts_with("This chat is subscribed to the following addresses:"));
        assert!(listing.contains(&format!("- {ADDR}")));
    }

    #[tokio::test]
    async fn test_empty_subscribe_shows_usage() {
        let handler = handler(HashMap::new());
        let ctx = MockContext::default();

        handler.handle(&ctx, Command::Subscribe(vec![])).await.unwrap();
        assert!(ctx.replies.lock()[0].starts_with("Usage:"));
    }
}

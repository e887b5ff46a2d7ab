//! The subscription index service.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::IndexError;
use crate::ports::SubscriptionStore;
use relay_types::{format_address, parse_address, Address, ChatId};

/// Stored under the address key: the chats watching that address.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SubscriberSet {
    chats: Vec<ChatId>,
}

/// Stored under `subs:<chat_id>`: the addresses that chat watches.
#[derive(Debug, Default, Serialize, Deserialize)]
struct WatchSet {
    subs: Vec<String>,
}

/// Result of a subscribe call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscribeOutcome {
    /// True when either index direction already held the pair.
    pub already_subscribed: bool,
}

/// Bidirectional subscription index over an external key-value store.
pub struct SubscriptionIndex<S: SubscriptionStore> {
    store: Arc<S>,
}

impl<S: SubscriptionStore> SubscriptionIndex<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    fn address_key(address: &Address) -> String {
        format_address(address)
    }

    fn watch_key(chat: ChatId) -> String {
        format!("subs:{chat}")
    }

    async fn load<T: Default + for<'de> Deserialize<'de>>(
        &self,
        key: &str,
    ) -> Result<T, IndexError> {
        match self.store.get(key).await? {
            Some(value) => {
                serde_json::from_value(value).map_err(|e| IndexError::CorruptRecord {
                    key: key.to_string(),
                    reason: e.to_string(),
                })
            }
            None => Ok(T::default()),
        }
    }

    async fn save<T: Serialize>(&self, key: &str, record: &T) -> Result<(), IndexError> {
        // Serializing a struct of vectors cannot fail.
        let value = serde_json::to_value(record).unwrap_or_default();
        self.store.put(key, value).await?;
        Ok(())
    }

    /// Chats subscribed to `address`; empty when none.
    pub async fn list_subscribers(&self, address: &Address) -> Result<Vec<ChatId>, IndexError> {
        let set: SubscriberSet = self.load(&Self::address_key(address)).await?;
        Ok(set.chats)
    }

    /// Addresses watched by `chat`; empty when none.
    ///
    /// Unparseable stored entries are skipped with a warning rather than
    /// failing the whole listing.
    pub async fn list_watched(&self, chat: ChatId) -> Result<Vec<Address>, IndexError> {
        let set: WatchSet = self.load(&Self::watch_key(chat)).await?;
        Ok(set
            .subs
            .iter()
            .filter_map(|raw| match parse_address(raw) {
                Ok(address) => Some(address),
                Err(e) => {
                    warn!(chat_id = chat, entry = %raw, error = %e, "Skipping unparseable watch entry");
                    None
                }
            })
            .collect())
    }

    /// Register `chat` as a watcher of `address`, in both directions.
    ///
    /// Idempotent. Both directions are checked and repaired independently,
    /// so a partial prior failure heals on the next call; the outcome
    /// reports `already_subscribed` when either direction held the pair.
    pub async fn subscribe(
        &self,
        chat: ChatId,
        address: &Address,
    ) -> Result<SubscribeOutcome, IndexError> {
        let address_key = Self::address_key(address);
        let watch_key = Self::watch_key(chat);
        let canonical = format_address(address);

        let mut subscribers: SubscriberSet = self.load(&address_key).await?;
        let mut watched: WatchSet = self.load(&watch_key).await?;

        let in_subscribers = subscribers.chats.contains(&chat);
        let in_watched = watched.subs.iter().any(|s| *s == canonical);

        if !in_subscribers {
            subscribers.chats.push(chat);
            self.save(&address_key, &subscribers).await?;
        }
        if !in_watched {
            watched.subs.push(canonical);
            self.save(&watch_key, &watched).await?;
        }

        Ok(SubscribeOutcome {
            already_subscribed: in_subscribers || in_watched,
        })
    }

    /// Remove `chat` as a watcher of `address` from both directions.
    ///
    /// A pair that was never subscribed is a no-op, not an error.
    pub async fn unsubscribe(&self, chat: ChatId, address: &Address) -> Result<(), IndexError> {
        let address_key = Self::address_key(address);
        let watch_key = Self::watch_key(chat);
        let canonical = format_address(address);

        let mut subscribers: SubscriberSet = self.load(&address_key).await?;
        if let Some(pos) = subscribers.chats.iter().position(|c| *c == chat) {
            subscribers.chats.remove(pos);
            self.save(&address_key, &subscribers).await?;
        }

        let mut watched: WatchSet = self.load(&watch_key).await?;
        if let Some(pos) = watched.subs.iter().position(|s| *s == canonical) {
            watched.subs.remove(pos);
            self.save(&watch_key, &watched).await?;
        }

        Ok(())
    }

    /// Remove `chat` from every subscriber set it appears in, then clear
    /// its watch set to empty (not deleted).
    pub async fn unsubscribe_all(&self, chat: ChatId) -> Result<(), IndexError> {
        let watch_key = Self::watch_key(chat);
        let watched: WatchSet = self.load(&watch_key).await?;

        for raw in &watched.subs {
            let Ok(address) = parse_address(raw) else {
                warn!(chat_id = chat, entry = %raw, "Skipping unparseable watch entry");
                continue;
            };
            let address_key = Self::address_key(&address);
            let mut subscribers: SubscriberSet = self.load(&address_key).await?;
            if let Some(pos) = subscribers.chats.iter().position(|c| *c == chat) {
                subscribers.chats.remove(pos);
                self.save(&address_key, &subscribers).await?;
            }
        }

        self.save(&watch_key, &WatchSet::default()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::StoreError;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// In-memory store recording every get/put for assertions.
    #[derive(Default)]
    struct MemoryStore {
        data: Mutex<HashMap<String, serde_json::Value>>,
        fail_puts: Mutex<bool>,
        puts_issued: Mutex<Vec<String>>,
    }

    impl MemoryStore {
        fn set_fail_puts(&self, fail: bool) {
            *self.fail_puts.lock() = fail;
        }
    }

    #[async_trait]
    impl SubscriptionStore for MemoryStore {
        async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError> {
            Ok(self.data.lock().get(key).cloned())
        }

        async fn put(&self, key: &str, value: serde_json::Value) -> Result<(), StoreError> {
            self.puts_issued.lock().push(key.to_string());
            if *self.fail_puts.lock() {
                return Err(StoreError::Unavailable("connection refused".into()));
            }
            self.data.lock().insert(key.to_string(), value);
            Ok(())
        }
    }

    fn addr(byte: u8) -> Address {
        Address::from([byte; 20])
    }

    fn index() -> (SubscriptionIndex<MemoryStore>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::default());
        (SubscriptionIndex::new(Arc::clone(&store)), store)
    }

    #[tokio::test]
    async fn test_subscribe_then_list_both_directions() {
        let (index, _) = index();
        let outcome = index.subscribe(100, &addr(0xAA)).await.unwrap();
        assert!(!outcome.already_subscribed);

        assert_eq!(index.list_subscribers(&addr(0xAA)).await.unwrap(), vec![100]);
        assert_eq!(index.list_watched(100).await.unwrap(), vec![addr(0xAA)]);
    }

    #[tokio::test]
    async fn test_subscribe_twice_is_idempotent() {
        let (index, _) = index();
        index.subscribe(100, &addr(0xAA)).await.unwrap();
        let outcome = index.subscribe(100, &addr(0xAA)).await.unwrap();
        assert!(outcome.already_subscribed);

        assert_eq!(index.list_subscribers(&addr(0xAA)).await.unwrap(), vec![100]);
        assert_eq!(index.list_watched(100).await.unwrap(), vec![addr(0xAA)]);
    }

    #[tokio::test]
    async fn test_subscribe_repairs_one_sided_state() {
        let (index, store) = index();
        // Simulate a partial prior failure: forward direction written,
        // reverse direction missing.
        store.data.lock().insert(
            format_address(&addr(0xAA)),
            serde_json::json!({ "chats": [100] }),
        );

        let outcome = index.subscribe(100, &addr(0xAA)).await.unwrap();
        assert!(outcome.already_subscribed);
        assert_eq!(index.list_watched(100).await.unwrap(), vec![addr(0xAA)]);
    }

    #[tokio::test]
    async fn test_unsubscribe_absent_pair_is_noop() {
        let (index, store) = index();
        index.unsubscribe(100, &addr(0xAA)).await.unwrap();
        // No writes for a pair that was never present.
        assert!(store.puts_issued.lock().is_empty());
    }

    #[tokio::test]
    async fn test_unsubscribe_removes_both_directions() {
        let (index, _) = index();
        index.subscribe(100, &addr(0xAA)).await.unwrap();
        index.subscribe(200, &addr(0xAA)).await.unwrap();

        index.unsubscribe(100, &addr(0xAA)).await.unwrap();

        assert_eq!(index.list_subscribers(&addr(0xAA)).await.unwrap(), vec![200]);
        assert!(index.list_watched(100).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unsubscribe_all_empties_watch_set_and_prunes_addresses() {
        let (index, store) = index();
        index.subscribe(100, &addr(0xAA)).await.unwrap();
        index.subscribe(100, &addr(0xBB)).await.unwrap();
        index.subscribe(200, &addr(0xAA)).await.unwrap();

        index.unsubscribe_all(100).await.unwrap();

        assert!(index.list_watched(100).await.unwrap().is_empty());
        assert_eq!(index.list_subscribers(&addr(0xAA)).await.unwrap(), vec![200]);
        assert!(index.list_subscribers(&addr(0xBB)).await.unwrap().is_empty());
        // The watch set is cleared, not deleted.
        let stored = store.data.lock().get("subs:100").cloned().unwrap();
        assert_eq!(stored, serde_json::json!({ "subs": [] }));
    }

    #[tokio::test]
    async fn test_store_failure_surfaces_with_no_observable_write() {
        let (index, store) = index();
        store.set_fail_puts(true);

        let result = index.subscribe(100, &addr(0xAA)).await;
        assert!(matches!(result, Err(IndexError::StoreUnavailable(_))));

        // The failing put stopped the call before the reverse-direction
        // write was attempted, and nothing became observable.
        store.set_fail_puts(false);
        assert!(index.list_subscribers(&addr(0xAA)).await.unwrap().is_empty());
        assert!(index.list_watched(100).await.unwrap().is_empty());
        assert_eq!(store.puts_issued.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_record_is_reported() {
        let (index, store) = index();
        store
            .data
            .lock()
            .insert(format_address(&addr(0xAA)), serde_json::json!("garbage"));

        let result = index.list_subscribers(&addr(0xAA)).await;
        assert!(matches!(result, Err(IndexError::CorruptRecord { .. })));
    }
}

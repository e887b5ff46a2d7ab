//! Outbound port for the external key-value store.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from the external key-value store.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The store is unreachable or refused the operation.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Opaque get/put map keyed by string, storing JSON values.
///
/// Implementations own connection lifecycle and reconnection; callers see
/// only [`StoreError::Unavailable`] when an operation cannot complete.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Fetch the value under `key`, or `None` when absent.
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError>;

    /// Write `value` under `key`, replacing any existing value.
    async fn put(&self, key: &str, value: serde_json::Value) -> Result<(), StoreError>;
}

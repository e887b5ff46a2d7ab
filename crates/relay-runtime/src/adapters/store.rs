//! RocksDB-backed subscription store.
//!
//! Values are JSON documents in the default column family. The store is
//! single-key atomic; the index layer documents the resulting
//! read-modify-write limitation.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rocksdb::{Options, WriteOptions, DB};

use relay_index::{StoreError, SubscriptionStore};

/// RocksDB tuning for the subscription store.
#[derive(Debug, Clone)]
pub struct RocksDbConfig {
    pub path: PathBuf,
    /// Write buffer size in bytes.
    pub write_buffer_size: usize,
    /// fsync after each write.
    pub sync_writes: bool,
}

impl RocksDbConfig {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_buffer_size: 16 * 1024 * 1024,
            sync_writes: true,
        }
    }

    /// Small buffers, no fsync.
    pub fn for_testing(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_buffer_size: 1024 * 1024,
            sync_writes: false,
        }
    }
}

/// RocksDB implementation of the `SubscriptionStore` port.
pub struct RocksDbStore {
    db: DB,
    write_options_sync: bool,
}

impl RocksDbStore {
    /// Open or create the database.
    pub fn open(config: RocksDbConfig) -> Result<Self, StoreError> {
        let mut options = Options::default();
        options.create_if_missing(true);
        options.set_write_buffer_size(config.write_buffer_size);
        options.set_compression_type(rocksdb::DBCompressionType::Snappy);

        let db = DB::open(&options, &config.path)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(Self {
            db,
            write_options_sync: config.sync_writes,
        })
    }

    fn write_options(&self) -> WriteOptions {
        let mut options = WriteOptions::default();
        options.set_sync(self.write_options_sync);
        options
    }
}

#[async_trait]
impl SubscriptionStore for RocksDbStore {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError> {
        let bytes = self
            .db
            .get(key.as_bytes())
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        match bytes {
            Some(bytes) => {
                let value = serde_json::from_slice(&bytes).map_err(|e| {
                    StoreError::Unavailable(format!("stored value for {key} is not JSON: {e}"))
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, value: serde_json::Value) -> Result<(), StoreError> {
        let bytes =
            serde_json::to_vec(&value).map_err(|e| StoreError::Unavailable(e.to_string()))?;
        self.db
            .put_opt(key.as_bytes(), bytes, &self.write_options())
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn open_temp() -> (RocksDbStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = RocksDbStore::open(RocksDbConfig::for_testing(dir.path())).unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn test_put_then_get_round_trip() {
        let (store, _dir) = open_temp();
        let value = json!({ "chats": [100, -200] });
        store.put("0xabc", value.clone()).await.unwrap();
        assert_eq!(store.get("0xabc").await.unwrap(), Some(value));
    }

    #[tokio::test]
    async fn test_missing_key_is_none() {
        let (store, _dir) = open_temp();
        assert_eq!(store.get("subs:1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_overwrite_replaces_value() {
        let (store, _dir) = open_temp();
        store.put("k", json!({ "subs": ["0xaa"] })).await.unwrap();
        store.put("k", json!({ "subs": [] })).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(json!({ "subs": [] })));
    }

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let value = json!({ "chats": [7] });
        {
            let store = RocksDbStore::open(RocksDbConfig::for_testing(dir.path())).unwrap();
            store.put("0xdef", value.clone()).await.unwrap();
        }
        let store = RocksDbStore::open(RocksDbConfig::for_testing(dir.path())).unwrap();
        assert_eq!(store.get("0xdef").await.unwrap(), Some(value));
    }
}

//! HTTP client for the name-resolution worker.
//!
//! Endpoints: `/u/<name>` (name to address), `/a/<address>` (address to
//! name), `/bulk/u?queries[]=…` (batched address to name).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use relay_pipeline::{DirectoryError, NameDirectory};
use relay_types::{format_address, parse_address, Address};

/// Bulk endpoint chunk size.
const BULK_CHUNK: usize = 10;

#[derive(Deserialize)]
struct ForwardRecord {
    address: Option<String>,
}

#[derive(Deserialize)]
struct ReverseRecord {
    name: Option<String>,
}

#[derive(Deserialize)]
struct BulkResponse {
    response: Vec<BulkRecord>,
}

#[derive(Deserialize)]
struct BulkRecord {
    #[serde(rename = "type")]
    kind: Option<String>,
    address: Option<String>,
    name: Option<String>,
}

/// Name-resolution worker client implementing the `NameDirectory` port.
pub struct EnsWorkerClient {
    client: Client,
    base_url: String,
}

impl EnsWorkerClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, DirectoryError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .connect_timeout(Duration::from_secs(2))
            .build()
            .map_err(|e| DirectoryError::Lookup(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T, DirectoryError> {
        self.client
            .get(url)
            .send()
            .await
            .map_err(|e| DirectoryError::Lookup(e.to_string()))?
            .error_for_status()
            .map_err(|e| DirectoryError::Lookup(e.to_string()))?
            .json()
            .await
            .map_err(|e| DirectoryError::Lookup(e.to_string()))
    }
}

#[async_trait]
impl NameDirectory for EnsWorkerClient {
    async fn address_for_name(&self, name: &str) -> Result<Option<Address>, DirectoryError> {
        let url = format!("{}/u/{}", self.base_url, name);
        let record: ForwardRecord = self.get_json(&url).await?;
        match record.address {
            Some(raw) => parse_address(&raw)
                .map(Some)
                .map_err(|e| DirectoryError::Lookup(format!("worker returned {raw:?}: {e}"))),
            None => Ok(None),
        }
    }

    async fn name_for_address(&self, address: Address) -> Result<Option<String>, DirectoryError> {
        let url = format!("{}/a/{}", self.base_url, format_address(&address));
        let record: ReverseRecord = self.get_json(&url).await?;
        Ok(record.name)
    }

    async fn names_for_addresses(
        &self,
        addresses: &[Address],
    ) -> Result<Vec<String>, DirectoryError> {
        let mut resolved: Vec<String> = addresses.iter().map(format_address).collect();

        for chunk_start in (0..addresses.len()).step_by(BULK_CHUNK) {
            let chunk = &resolved[chunk_start..(chunk_start + BULK_CHUNK).min(resolved.len())];
            let query = chunk
                .iter()
                .map(|a| format!("queries[]={a}"))
                .collect::<Vec<_>>()
                .join("&");
            let url = format!("{}/bulk/u?{}", self.base_url, query);

            // A failed chunk leaves its entries as raw addresses.
            let bulk: BulkResponse = match self.get_json(&url).await {
                Ok(bulk) => bulk,
                Err(e) => {
                    warn!(error = %e, "Bulk name lookup chunk failed");
                    continue;
                }
            };

            for record in bulk.response {
                if record.kind.as_deref() == Some("error") {
                    continue;
                }
                let (Some(address), Some(name)) = (record.address, record.name) else {
                    continue;
                };
                let canonical = address.to_lowercase();
                if let Some(entry) = resolved.iter_mut().find(|e| **e == canonical) {
                    *entry = name;
                }
            }
        }

        Ok(resolved)
    }
}

//! Runtime configuration.
//!
//! All settings come from `RELAY_*` environment variables with sensible
//! defaults for local development. `validate()` enforces the handful of
//! settings that have no usable default in production.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};

use relay_pipeline::RetryPolicy;
use relay_types::{parse_address, Address};

/// Chains the relay reads list-records contracts on, keyed by chain id.
///
/// The home chain hosts the account-metadata contract.
pub const HOME_CHAIN_ID: u64 = 8453;

/// Top-level runtime configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub telegram: TelegramConfig,
    pub chain: ChainConfig,
    pub names: NamesConfig,
    pub store: StoreConfig,
    pub feed: FeedConfig,
    pub heartbeat: HeartbeatConfig,
    pub pipeline: PipelineSettings,
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// Bot API token. Required in production.
    pub bot_token: String,
    /// Long-poll timeout for `getUpdates`, seconds.
    pub poll_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            poll_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChainConfig {
    /// JSON-RPC endpoint per chain id.
    pub rpc_urls: HashMap<u64, String>,
    /// Account-metadata contract on the home chain.
    pub account_metadata: Option<Address>,
}

#[derive(Debug, Clone)]
pub struct NamesConfig {
    /// Base URL of the name-resolution worker.
    pub worker_url: String,
}

impl Default for NamesConfig {
    fn default() -> Self {
        Self {
            worker_url: "https://ens.evm.workers.dev".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// RocksDB data directory.
    pub data_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/subscriptions"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FeedConfig {
    /// Path to the newline-delimited JSON feed; `None` reads stdin.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// Liveness ping target; `None` disables the heartbeat task.
    pub url: Option<String>,
    pub interval: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            url: None,
            interval: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Drop rows whose operator has no primary list.
    pub require_primary_list: bool,
    /// Delay between successive notification deliveries.
    pub pace: Duration,
    pub retry: RetryPolicy,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            require_primary_list: false,
            pace: Duration::from_millis(300),
            retry: RetryPolicy::default(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            telegram: TelegramConfig::default(),
            chain: ChainConfig::default(),
            names: NamesConfig::default(),
            store: StoreConfig::default(),
            feed: FeedConfig::default(),
            heartbeat: HeartbeatConfig::default(),
            pipeline: PipelineSettings::default(),
        }
    }
}

impl RelayConfig {
    /// Assemble configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_vars(&vars)
    }

    /// Assemble configuration from an explicit variable map. Unknown
    /// variables are ignored; malformed values are errors rather than
    /// silent defaults.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(token) = vars.get("RELAY_BOT_TOKEN") {
            config.telegram.bot_token = token.clone();
        }
        if let Some(raw) = vars.get("RELAY_POLL_TIMEOUT_SECS") {
            config.telegram.poll_timeout_secs = parse_var("RELAY_POLL_TIMEOUT_SECS", raw)?;
        }

        for (name, chain_id) in [
            ("RELAY_ETH_RPC_URL", 1u64),
            ("RELAY_OP_RPC_URL", 10),
            ("RELAY_BASE_RPC_URL", HOME_CHAIN_ID),
        ] {
            if let Some(url) = vars.get(name) {
                config.chain.rpc_urls.insert(chain_id, url.clone());
            }
        }
        if let Some(raw) = vars.get("RELAY_ACCOUNT_METADATA") {
            let address = parse_address(raw)
                .map_err(|e| anyhow::anyhow!("RELAY_ACCOUNT_METADATA: {e}"))?;
            config.chain.account_metadata = Some(address);
        }

        if let Some(url) = vars.get("RELAY_ENS_WORKER_URL") {
            config.names.worker_url = url.clone();
        }
        if let Some(dir) = vars.get("RELAY_DATA_DIR") {
            config.store.data_dir = PathBuf::from(dir);
        }
        if let Some(path) = vars.get("RELAY_FEED_PATH") {
            config.feed.path = Some(PathBuf::from(path));
        }

        if let Some(url) = vars.get("RELAY_HEARTBEAT_URL") {
            // The deployment template ships the literal string "unset".
            if !url.is_empty() && url != "unset" {
                config.heartbeat.url = Some(url.clone());
            }
        }
        if let Some(raw) = vars.get("RELAY_HEARTBEAT_INTERVAL_SECS") {
            config.heartbeat.interval =
                Duration::from_secs(parse_var("RELAY_HEARTBEAT_INTERVAL_SECS", raw)?);
        }

        if let Some(raw) = vars.get("RELAY_REQUIRE_PRIMARY_LIST") {
            config.pipeline.require_primary_list =
                matches!(raw.as_str(), "1" | "true" | "yes");
        }
        if let Some(raw) = vars.get("RELAY_PACE_MS") {
            config.pipeline.pace = Duration::from_millis(parse_var("RELAY_PACE_MS", raw)?);
        }

        Ok(config)
    }

    /// Enforce settings that have no usable default.
    pub fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.is_empty() {
            bail!("RELAY_BOT_TOKEN is required");
        }
        if self.chain.rpc_urls.is_empty() {
            bail!("at least one RPC URL is required (RELAY_BASE_RPC_URL, RELAY_OP_RPC_URL, RELAY_ETH_RPC_URL)");
        }
        if !self.chain.rpc_urls.contains_key(&HOME_CHAIN_ID) && self.chain.account_metadata.is_some()
        {
            bail!("RELAY_ACCOUNT_METADATA requires RELAY_BASE_RPC_URL (home chain reads)");
        }
        Ok(())
    }
}

fn parse_var(name: &str, raw: &str) -> Result<u64> {
    raw.parse()
        .map_err(|e| anyhow::anyhow!("{name}: invalid value {raw:?}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_without_variables() {
        let config = RelayConfig::from_vars(&HashMap::new()).unwrap();
        assert!(config.telegram.bot_token.is_empty());
        assert!(config.heartbeat.url.is_none());
        assert!(!config.pipeline.require_primary_list);
        assert_eq!(config.pipeline.pace, Duration::from_millis(300));
    }

    #[test]
    fn test_rpc_urls_map_to_chain_ids() {
        let config = RelayConfig::from_vars(&vars(&[
            ("RELAY_BASE_RPC_URL", "https://base.example"),
            ("RELAY_ETH_RPC_URL", "https://eth.example"),
        ]))
        .unwrap();
        assert_eq!(
            config.chain.rpc_urls.get(&8453).map(String::as_str),
            Some("https://base.example")
        );
        assert_eq!(
            config.chain.rpc_urls.get(&1).map(String::as_str),
            Some("https://eth.example")
        );
        assert!(!config.chain.rpc_urls.contains_key(&10));
    }

    #[test]
    fn test_unset_heartbeat_sentinel_disables_heartbeat() {
        let config =
            RelayConfig::from_vars(&vars(&[("RELAY_HEARTBEAT_URL", "unset")])).unwrap();
        assert!(config.heartbeat.url.is_none());
    }

    #[test]
    fn test_malformed_numeric_is_an_error() {
        let result = RelayConfig::from_vars(&vars(&[("RELAY_PACE_MS", "soon")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_requires_token_and_rpc() {
        let mut config = RelayConfig::from_vars(&vars(&[
            ("RELAY_BOT_TOKEN", "123:abc"),
            ("RELAY_BASE_RPC_URL", "https://base.example"),
        ]))
        .unwrap();
        assert!(config.validate().is_ok());

        config.telegram.bot_token.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_account_metadata_parses_address() {
        let config = RelayConfig::from_vars(&vars(&[(
            "RELAY_ACCOUNT_METADATA",
            "0x5289fE5daBC021D02FDDf23d4a4DF96F4E0F17EF",
        )]))
        .unwrap();
        assert!(config.chain.account_metadata.is_some());

        let result =
            RelayConfig::from_vars(&vars(&[("RELAY_ACCOUNT_METADATA", "nope")]));
        assert!(result.is_err());
    }
}

//! JSON-RPC chain reads implementing the `ListRegistry` port.
//!
//! Two read-only contract calls:
//! - `getListUser(uint256)` on a list-records contract, any supported chain;
//! - `getValue(address,string)` with key `primary-list` on the
//!   account-metadata contract, home chain only.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

use relay_pipeline::{ListRegistry, RegistryError};
use relay_types::{format_address, Address, U256};

const GET_LIST_USER_SIG: &str = "getListUser(uint256)";
const GET_VALUE_SIG: &str = "getValue(address,string)";
const PRIMARY_LIST_KEY: &str = "primary-list";

#[derive(Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'static str,
    params: (CallParams<'a>, &'static str),
}

#[derive(Serialize)]
struct CallParams<'a> {
    to: String,
    data: &'a str,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    result: Option<String>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// First four bytes of the Keccak-256 hash of the function signature.
fn selector(signature: &str) -> [u8; 4] {
    let digest = Keccak256::digest(signature.as_bytes());
    [digest[0], digest[1], digest[2], digest[3]]
}

/// `getListUser(uint256)` call data: selector plus the 32-byte slot.
fn get_list_user_call_data(slot: U256) -> String {
    let mut data = selector(GET_LIST_USER_SIG).to_vec();
    let mut word = [0u8; 32];
    slot.to_big_endian(&mut word);
    data.extend_from_slice(&word);
    format!("0x{}", hex::encode(data))
}

/// `getValue(address,string)` call data: selector, padded address, string
/// offset, then the length-prefixed key padded to a word boundary.
fn get_value_call_data(user: Address, key: &str) -> String {
    let mut data = selector(GET_VALUE_SIG).to_vec();

    let mut word = [0u8; 32];
    word[12..].copy_from_slice(user.as_bytes());
    data.extend_from_slice(&word);

    let mut offset = [0u8; 32];
    offset[31] = 64;
    data.extend_from_slice(&offset);

    let mut length = [0u8; 32];
    length[24..].copy_from_slice(&(key.len() as u64).to_be_bytes());
    data.extend_from_slice(&length);

    let padded_len = key.len().div_ceil(32) * 32;
    let mut padded = vec![0u8; padded_len];
    padded[..key.len()].copy_from_slice(key.as_bytes());
    data.extend_from_slice(&padded);

    format!("0x{}", hex::encode(data))
}

fn return_bytes(result: &str) -> Result<Vec<u8>, RegistryError> {
    let digits = result.strip_prefix("0x").unwrap_or(result);
    hex::decode(digits).map_err(|e| RegistryError::Call(format!("non-hex return data: {e}")))
}

/// Decode a returned `address` (one word, last 20 bytes).
fn decode_address_return(result: &str) -> Result<Address, RegistryError> {
    let bytes = return_bytes(result)?;
    if bytes.len() < 32 {
        return Err(RegistryError::Call(format!(
            "address return too short: {} bytes",
            bytes.len()
        )));
    }
    Ok(Address::from_slice(&bytes[12..32]))
}

/// Decode returned dynamic `bytes` holding a big-endian integer; empty
/// bytes mean the value is unset.
fn decode_bytes_return(result: &str) -> Result<Option<U256>, RegistryError> {
    let bytes = return_bytes(result)?;
    if bytes.len() < 64 {
        // No payload words at all; treat as unset.
        return Ok(None);
    }
    let length_word = U256::from_big_endian(&bytes[32..64]);
    if length_word.is_zero() {
        return Ok(None);
    }
    if length_word > U256::from(bytes.len()) {
        return Err(RegistryError::Call("bytes return truncated".to_string()));
    }
    let length = length_word.as_usize();
    let data = bytes
        .get(64..64 + length)
        .ok_or_else(|| RegistryError::Call("bytes return truncated".to_string()))?;
    if data.len() > 32 {
        return Err(RegistryError::Call(format!(
            "value too wide: {} bytes",
            data.len()
        )));
    }
    Ok(Some(U256::from_big_endian(data)))
}

/// JSON-RPC `eth_call` client over a per-chain endpoint table.
pub struct JsonRpcRegistry {
    client: Client,
    rpc_urls: HashMap<u64, String>,
    account_metadata: Option<Address>,
    home_chain_id: u64,
    request_id: AtomicU64,
}

impl JsonRpcRegistry {
    pub fn new(
        rpc_urls: HashMap<u64, String>,
        account_metadata: Option<Address>,
        home_chain_id: u64,
    ) -> Result<Self, RegistryError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(3))
            .build()
            .map_err(|e| RegistryError::Call(e.to_string()))?;
        Ok(Self {
            client,
            rpc_urls,
            account_metadata,
            home_chain_id,
            request_id: AtomicU64::new(1),
        })
    }

    fn endpoint(&self, chain_id: u64) -> Result<&str, RegistryError> {
        self.rpc_urls
            .get(&chain_id)
            .map(String::as_str)
            .ok_or_else(|| RegistryError::Call(format!("no RPC endpoint for chain {chain_id}")))
    }

    async fn eth_call(
        &self,
        chain_id: u64,
        contract: Address,
        data: &str,
    ) -> Result<String, RegistryError> {
        let url = self.endpoint(chain_id)?;
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: self.request_id.fetch_add(1, Ordering::Relaxed),
            method: "eth_call",
            params: (
                CallParams {
                    to: format_address(&contract),
                    data,
                },
                "latest",
            ),
        };

        let response: JsonRpcResponse = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RegistryError::Call(e.to_string()))?
            .json()
            .await
            .map_err(|e| RegistryError::Call(format!("malformed RPC response: {e}")))?;

        if let Some(error) = response.error {
            return Err(RegistryError::Call(format!(
                "RPC error {}: {}",
                error.code, error.message
            )));
        }
        response
            .result
            .ok_or_else(|| RegistryError::Call("RPC response missing result".to_string()))
    }
}

#[async_trait]
impl ListRegistry for JsonRpcRegistry {
    async fn list_user(
        &self,
        slot: U256,
        chain_id: u64,
        contract: Address,
    ) -> Result<Address, RegistryError> {
        let data = get_list_user_call_data(slot);
        let result = self.eth_call(chain_id, contract, &data).await?;
        decode_address_return(&result)
    }

    async fn primary_list(&self, user: Address) -> Result<Option<U256>, RegistryError> {
        let Some(contract) = self.account_metadata else {
            return Err(RegistryError::Call(
                "account-metadata contract not configured".to_string(),
            ));
        };
        let data = get_value_call_data(user, PRIMARY_LIST_KEY);
        let result = self.eth_call(self.home_chain_id, contract, &data).await?;
        decode_bytes_return(&result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_list_user_call_data_layout() {
        let data = get_list_user_call_data(U256::from(7u64));
        // 4-byte selector + one 32-byte word.
        assert_eq!(data.len(), 2 + 8 + 64);
        assert!(data.ends_with(
            "0000000000000000000000000000000000000000000000000000000000000007"
        ));
    }

    #[test]
    fn test_get_value_call_data_layout() {
        let user = Address::from([0xAB; 20]);
        let data = get_value_call_data(user, PRIMARY_LIST_KEY);
        let bytes = hex::decode(&data[2..]).unwrap();
        // selector + address word + offset word + length word + padded key.
        assert_eq!(bytes.len(), 4 + 32 + 32 + 32 + 32);
        assert_eq!(&bytes[16..36], &[0xAB; 20]);
        assert_eq!(bytes[67], 64);
        assert_eq!(bytes[99], PRIMARY_LIST_KEY.len() as u8);
        assert_eq!(&bytes[100..112], PRIMARY_LIST_KEY.as_bytes());
        assert!(bytes[112..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_decode_address_return_takes_last_twenty_bytes() {
        let result = format!("0x{}{}", "00".repeat(12), "cd".repeat(20));
        let address = decode_address_return(&result).unwrap();
        assert_eq!(address, Address::from([0xCD; 20]));
    }

    #[test]
    fn test_decode_address_return_rejects_short_data() {
        assert!(decode_address_return("0x1234").is_err());
    }

    #[test]
    fn test_decode_bytes_return_empty_means_unset() {
        // offset 32, length 0.
        let result = format!(
            "0x{:064x}{:064x}",
            32, 0
        );
        assert_eq!(decode_bytes_return(&result).unwrap(), None);
        // viem-style bare empty return.
        assert_eq!(decode_bytes_return("0x").unwrap(), None);
    }

    #[test]
    fn test_decode_bytes_return_value() {
        let result = format!("0x{:064x}{:064x}{:064x}", 32, 32, 1234);
        assert_eq!(
            decode_bytes_return(&result).unwrap(),
            Some(U256::from(1234u64))
        );
    }
}

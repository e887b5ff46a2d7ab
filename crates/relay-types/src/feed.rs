//! Change-feed row structure.
//!
//! The feed transport delivers discrete row events, already deserialized
//! from JSON. The row is a closed structure rather than a dynamic value:
//! the pipeline only ever reads these five fields.

use crate::{Address, U256};
use serde::{Deserialize, Deserializer};

/// Event kind acted on by the pipeline; every other row is ignored.
pub const LIST_OP_EVENT: &str = "ListOp";

/// One row from the change feed.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedRow {
    /// Emitting event name; only [`LIST_OP_EVENT`] rows are processed.
    pub event_name: String,
    /// Event-specific arguments.
    pub event_args: EventArgs,
    /// Chain the event was observed on.
    #[serde(deserialize_with = "de_u64_lenient")]
    pub chain_id: u64,
    /// List-records contract that emitted the event.
    #[serde(deserialize_with = "de_address")]
    pub contract_address: Address,
}

/// Arguments of a `ListOp` row.
#[derive(Debug, Clone, Deserialize)]
pub struct EventArgs {
    /// Role slot index into the list-records contract.
    #[serde(deserialize_with = "de_u256_lenient")]
    pub slot: U256,
    /// Hex-encoded list operation blob.
    pub op: String,
}

/// Feed producers disagree on numeric encoding: some emit JSON numbers,
/// some decimal strings, some `0x`-hex strings. Accept all three.
#[derive(Deserialize)]
#[serde(untagged)]
enum LenientNumber {
    Num(u64),
    Str(String),
}

fn de_u256_lenient<'de, D>(deserializer: D) -> Result<U256, D::Error>
where
    D: Deserializer<'de>,
{
    match LenientNumber::deserialize(deserializer)? {
        LenientNumber::Num(n) => Ok(U256::from(n)),
        LenientNumber::Str(s) => {
            if let Some(hex_digits) = s.strip_prefix("0x") {
                U256::from_str_radix(hex_digits, 16).map_err(serde::de::Error::custom)
            } else {
                U256::from_dec_str(&s).map_err(serde::de::Error::custom)
            }
        }
    }
}

fn de_u64_lenient<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match LenientNumber::deserialize(deserializer)? {
        LenientNumber::Num(n) => Ok(n),
        LenientNumber::Str(s) => {
            if let Some(hex_digits) = s.strip_prefix("0x") {
                u64::from_str_radix(hex_digits, 16).map_err(serde::de::Error::custom)
            } else {
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    }
}

fn de_address<'de, D>(deserializer: D) -> Result<Address, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    crate::parse_address(&s).map_err(serde::de::Error::custom)
}

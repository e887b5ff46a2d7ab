//! List storage location decoding.
//!
//! # Wire Format
//!
//! ```text
//! 0x
//! [version:               1 byte ] hex offset 0-1
//! [type:                  1 byte ] hex offset 2-3
//! [chain_id:             32 bytes] hex offset 4-67, big-endian
//! [list_records_contract: 20 bytes] hex offset 68-107
//! [slot:                 32 bytes] hex offset 108-171, big-endian
//! ```
//!
//! Shorter input decodes to the all-zero sentinel rather than failing;
//! callers check [`ListStorageLocation::is_empty`] before use.

use relay_types::{Address, U256};

/// Hex characters consumed after the `0x` prefix.
const LOCATION_HEX_LEN: usize = 172;

/// A decoded list storage location.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListStorageLocation {
    /// Format version byte.
    pub version: u8,
    /// Location type byte.
    pub kind: u8,
    /// Chain hosting the list-records contract.
    pub chain_id: U256,
    /// The list-records contract address.
    pub list_records_contract: Address,
    /// Storage slot of the list within the contract.
    pub slot: U256,
}

impl ListStorageLocation {
    /// The sentinel returned for undersized or undecodable input.
    pub const EMPTY: Self = Self {
        version: 0,
        kind: 0,
        chain_id: U256::zero(),
        list_records_contract: Address::zero(),
        slot: U256::zero(),
    };

    /// Whether this is the sentinel zero-value record.
    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }
}

/// Decode a hex-encoded list storage location.
///
/// Total: input shorter than the 86-byte record, or containing non-hex
/// characters, yields [`ListStorageLocation::EMPTY`].
pub fn decode_list_storage_location(lsl: &str) -> ListStorageLocation {
    let digits = lsl.strip_prefix("0x").unwrap_or(lsl);
    if digits.len() < LOCATION_HEX_LEN {
        return ListStorageLocation::EMPTY;
    }
    let bytes = match hex::decode(&digits[..LOCATION_HEX_LEN]) {
        Ok(bytes) => bytes,
        Err(_) => return ListStorageLocation::EMPTY,
    };

    let mut contract = [0u8; 20];
    contract.copy_from_slice(&bytes[34..54]);

    ListStorageLocation {
        version: bytes[0],
        kind: bytes[1],
        chain_id: U256::from_big_endian(&bytes[2..34]),
        list_records_contract: Address::from(contract),
        slot: U256::from_big_endian(&bytes[54..86]),
    }
}

//! Address parsing and formatting helpers.
//!
//! Addresses travel as `0x`-prefixed hex strings on every external
//! interface (store keys, feed rows, name directory); internally they are
//! fixed 20-byte values.

use crate::Address;
use thiserror::Error;

/// Errors from parsing an address string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressParseError {
    /// Wrong number of hex characters (expected 40 after the prefix).
    #[error("Invalid address length: expected 40 hex chars, got {0}")]
    InvalidLength(usize),

    /// Non-hexadecimal characters in the input.
    #[error("Invalid hex in address: {0}")]
    InvalidHex(String),
}

/// Parse a `0x`-prefixed (or bare) 40-hex-char string into an [`Address`].
///
/// Accepts mixed-case input; the canonical form produced by
/// [`format_address`] is lowercase.
pub fn parse_address(s: &str) -> Result<Address, AddressParseError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    if digits.len() != 40 {
        return Err(AddressParseError::InvalidLength(digits.len()));
    }
    let bytes =
        hex::decode(digits).map_err(|e| AddressParseError::InvalidHex(e.to_string()))?;
    let mut raw = [0u8; 20];
    raw.copy_from_slice(&bytes);
    Ok(Address::from(raw))
}

/// Canonical lowercase `0x…` rendering, used as the store key for an address.
pub fn format_address(address: &Address) -> String {
    format!("{address:#x}")
}

/// Whether the string is a well-formed `0x`-prefixed address.
///
/// Name-or-address inputs from the command surface use this to decide
/// whether a directory lookup is needed.
pub fn is_address(s: &str) -> bool {
    match s.strip_prefix("0x") {
        Some(digits) => digits.len() == 40 && digits.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR: &str = "0x00000000fc9c5f54fa2f58f49f6dcff1a487dcb2";

    #[test]
    fn test_parse_and_format_roundtrip() {
        let parsed = parse_address(ADDR).unwrap();
        assert_eq!(format_address(&parsed), ADDR);
    }

    #[test]
    fn test_parse_accepts_mixed_case_and_bare() {
        let mixed = "0x00000000Fc9c5F54fA2f58f49F6dCFf1a487Dcb2";
        assert_eq!(parse_address(mixed).unwrap(), parse_address(ADDR).unwrap());
        let bare = &ADDR[2..];
        assert_eq!(parse_address(bare).unwrap(), parse_address(ADDR).unwrap());
    }

    #[test]
    fn test_parse_rejects_bad_length() {
        assert!(matches!(
            parse_address("0x1234"),
            Err(AddressParseError::InvalidLength(4))
        ));
    }

    #[test]
    fn test_parse_rejects_non_hex() {
        let bad = "0xzz000000fc9c5f54fa2f58f49f6dcff1a487dcb2";
        assert!(matches!(
            parse_address(bad),
            Err(AddressParseError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_is_address() {
        assert!(is_address(ADDR));
        assert!(!is_address("vitalik.eth"));
        assert!(!is_address("0x1234"));
        assert!(!is_address(&ADDR[2..]));
    }
}

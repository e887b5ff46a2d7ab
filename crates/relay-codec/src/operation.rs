//! List operation decoding.
//!
//! # Wire Format
//!
//! ```text
//! 0x
//! [version:        1 byte ] hex offset 0-1
//! [opcode:         1 byte ] hex offset 2-3
//! [record_version: 1 byte ] hex offset 4-5
//! [record_type:    1 byte ] hex offset 6-7
//! [record_address: 20 bytes] hex offset 8-47
//! [tag payload:    variable] hex offset 48+, UTF-8, tag/untag only
//! ```

use crate::DecodeError;
use relay_types::Address;

/// Hex characters in the fixed header after the `0x` prefix.
const HEADER_HEX_LEN: usize = 48;

/// The operation kind selected by the opcode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    /// `01` - subject added to the list.
    Follow,
    /// `02` - subject removed from the list.
    Unfollow,
    /// `03` - tag attached to the subject's record.
    Tag,
    /// `04` - tag removed from the subject's record.
    Untag,
    /// Any other opcode. Decodes successfully, describes as nothing.
    Unknown,
}

impl OpKind {
    fn from_opcode(opcode: u8) -> Self {
        match opcode {
            0x01 => Self::Follow,
            0x02 => Self::Unfollow,
            0x03 => Self::Tag,
            0x04 => Self::Untag,
            _ => Self::Unknown,
        }
    }

    /// Human-readable action verb for the notification message.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Follow => "followed",
            Self::Unfollow => "unfollowed",
            Self::Tag => "tagged",
            Self::Untag => "untagged",
            Self::Unknown => "",
        }
    }

    /// Whether the tail of the blob carries a tag payload.
    pub fn carries_tag(&self) -> bool {
        matches!(self, Self::Tag | Self::Untag)
    }
}

/// A decoded list operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    /// Format version byte. Informational only.
    pub version: u8,
    /// Decoded operation kind.
    pub opcode: OpKind,
    /// The raw opcode byte, kept for logging unknown operations.
    pub raw_opcode: u8,
    /// Record format version byte. Reserved.
    pub record_version: u8,
    /// Record type byte. Reserved.
    pub record_type: u8,
    /// The subject of the operation (the "target").
    pub record_address: Address,
    /// Tag text for tag/untag operations; empty otherwise.
    pub tag: String,
}

impl Operation {
    /// Notification suffix for tagged operations: ` as 'tag'`, or empty.
    pub fn tag_suffix(&self) -> String {
        if self.tag.is_empty() {
            String::new()
        } else {
            format!(" as '{}'", self.tag)
        }
    }
}

/// Decode a hex-encoded list operation.
///
/// Total for any input covering the 24-byte fixed header: unrecognized
/// opcodes yield [`OpKind::Unknown`], and a malformed tag payload yields an
/// empty tag rather than an error. Shorter input is
/// [`DecodeError::InputTooShort`].
pub fn decode_operation(op: &str) -> Result<Operation, DecodeError> {
    let digits = op.strip_prefix("0x").unwrap_or(op);
    if digits.len() < HEADER_HEX_LEN {
        return Err(DecodeError::InputTooShort {
            expected: HEADER_HEX_LEN,
            actual: digits.len(),
        });
    }

    let header = hex::decode(&digits[..HEADER_HEX_LEN])
        .map_err(|e| DecodeError::InvalidHex(e.to_string()))?;

    let mut raw_address = [0u8; 20];
    raw_address.copy_from_slice(&header[4..24]);

    let opcode = OpKind::from_opcode(header[1]);
    let tag = if opcode.carries_tag() {
        // Lenient like the reference: an undecodable payload becomes an
        // empty tag, it does not fail the row.
        hex::decode(&digits[HEADER_HEX_LEN..])
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default()
    } else {
        String::new()
    };

    Ok(Operation {
        version: header[0],
        opcode,
        raw_opcode: header[1],
        record_version: header[2],
        record_type: header[3],
        record_address: Address::from(raw_address),
        tag,
    })
}

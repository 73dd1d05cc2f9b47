//! Protobuf wire types and field keys
//!
//! Every field on the wire starts with a varint key
//! `(field_number << 3) | wire_type`.

use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::varint;
use crate::MAX_FIELD_NUMBER;

/// Encoding of the payload that follows a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WireType {
    /// LEB128 varint
    Varint = 0,
    /// Eight little-endian bytes
    Fixed64 = 1,
    /// Varint length followed by that many bytes
    LengthDelimited = 2,
    /// Opens a group; closed by a matching [`WireType::EndGroup`]
    StartGroup = 3,
    /// Closes the innermost open group
    EndGroup = 4,
    /// Four little-endian bytes
    Fixed32 = 5,
}

impl WireType {
    /// Convert the low three bits of a key
    #[inline]
    pub const fn from_bits(bits: u8) -> Result<Self> {
        match bits {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::Fixed64),
            2 => Ok(WireType::LengthDelimited),
            3 => Ok(WireType::StartGroup),
            4 => Ok(WireType::EndGroup),
            5 => Ok(WireType::Fixed32),
            _ => Err(Error::Malformed),
        }
    }
}

/// Split a decoded key into (field_number, wire_type)
#[inline]
pub fn split_key(key: u64) -> Result<(u32, WireType)> {
    let wire_type = WireType::from_bits((key & 0x07) as u8)?;
    let number = key >> 3;
    if number == 0 || number > MAX_FIELD_NUMBER as u64 {
        return Err(Error::Malformed);
    }
    Ok((number as u32, wire_type))
}

/// Raw key value for a field number and wire type
#[inline]
pub const fn make_key(number: u32, wire_type: WireType) -> u64 {
    ((number as u64) << 3) | wire_type as u64
}

/// Append an encoded key to `buf`
#[inline]
pub fn encode_key(number: u32, wire_type: WireType, buf: &mut Vec<u8>) -> usize {
    varint::encode_u64(make_key(number, wire_type), buf)
}

/// Encoded length of a key for this field number
#[inline]
pub const fn key_len(number: u32) -> usize {
    varint::encoded_len((number as u64) << 3)
}

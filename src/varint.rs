//! Variable-length integer encoding (LEB128) and zigzag mapping
//!
//! Protobuf keys, lengths and varint scalars all use base-128 little-endian
//! groups with a continuation bit. Signed `sint32`/`sint64` fields additionally
//! apply zigzag mapping so that small negative numbers stay short.

use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::MAX_VARINT_LEN;

/// Encode a u64 as varint, appending to `buf`
///
/// Returns the number of bytes written.
#[inline]
pub fn encode_u64(value: u64, buf: &mut Vec<u8>) -> usize {
    let mut value = value;
    let mut written = 0;

    loop {
        written += 1;
        if value < 0x80 {
            buf.push(value as u8);
            return written;
        }

        buf.push((value as u8) | 0x80);
        value >>= 7;
    }
}

/// Number of bytes `value` occupies when varint encoded
#[inline]
pub const fn encoded_len(value: u64) -> usize {
    // Each group carries 7 bits; zero still takes one byte.
    let bits = 64 - (value | 1).leading_zeros() as usize;
    (bits + 6) / 7
}

/// Decode a u64 varint from the front of `buf`
///
/// `buf` must end at the current parse limit. Returns (value, bytes_consumed).
/// Running out of bytes before the terminating group is `Truncated`; a tenth
/// byte that still carries the continuation bit is `Malformed`.
#[inline]
pub fn decode_u64(buf: &[u8]) -> Result<(u64, usize)> {
    // Single-byte values dominate real traffic.
    match buf.first() {
        Some(&byte) if byte < 0x80 => return Ok((byte as u64, 1)),
        Some(_) => {}
        None => return Err(Error::Truncated),
    }

    let mut result = 0u64;
    let mut shift = 0;

    for (pos, &byte) in buf.iter().take(MAX_VARINT_LEN).enumerate() {
        result |= ((byte & 0x7F) as u64) << shift;

        if byte & 0x80 == 0 {
            return Ok((result, pos + 1));
        }

        shift += 7;
    }

    if buf.len() >= MAX_VARINT_LEN {
        Err(Error::Malformed)
    } else {
        Err(Error::Truncated)
    }
}

/// Map a signed 32-bit value onto unsigned zigzag form
#[inline]
pub const fn zigzag_encode32(n: i32) -> u32 {
    ((n << 1) ^ (n >> 31)) as u32
}

/// Inverse of [`zigzag_encode32`]
#[inline]
pub const fn zigzag_decode32(n: u32) -> i32 {
    ((n >> 1) as i32) ^ -((n & 1) as i32)
}

/// Map a signed 64-bit value onto unsigned zigzag form
#[inline]
pub const fn zigzag_encode64(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

/// Inverse of [`zigzag_encode64`]
#[inline]
pub const fn zigzag_decode64(n: u64) -> i64 {
    ((n >> 1) as i64) ^ -((n & 1) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_u64_roundtrip() {
        let test_values = [0, 1, 127, 128, 150, 16383, 16384, u32::MAX as u64, u64::MAX];

        for &val in &test_values {
            let mut buf = Vec::new();
            let encoded_len = encode_u64(val, &mut buf);
            let (decoded_val, decoded_len) = decode_u64(&buf).unwrap();

            assert_eq!(val, decoded_val);
            assert_eq!(encoded_len, decoded_len);
            assert_eq!(encoded_len, super::encoded_len(val));
        }
    }

    #[test]
    fn test_known_encoding() {
        assert_eq!(decode_u64(&[0x96, 0x01]).unwrap(), (150, 2));

        let mut buf = Vec::new();
        encode_u64(150, &mut buf);
        assert_eq!(buf, vec![0x96, 0x01]);
    }

    #[test]
    fn test_truncated() {
        assert_eq!(decode_u64(&[]), Err(Error::Truncated));
        assert_eq!(decode_u64(&[0xFF]), Err(Error::Truncated));
        assert_eq!(decode_u64(&[0x80, 0x80, 0x80]), Err(Error::Truncated));
    }

    #[test]
    fn test_overlong_is_malformed() {
        let buf = [0xFFu8; 11];
        assert_eq!(decode_u64(&buf), Err(Error::Malformed));

        // Ten bytes with the last terminating is the longest legal form.
        let mut ok = [0xFFu8; 10];
        ok[9] = 0x01;
        assert_eq!(decode_u64(&ok).unwrap(), (u64::MAX, 10));
    }

    #[test]
    fn test_zigzag() {
        assert_eq!(zigzag_encode32(0), 0);
        assert_eq!(zigzag_encode32(-1), 1);
        assert_eq!(zigzag_encode32(1), 2);
        assert_eq!(zigzag_encode32(i32::MIN), u32::MAX);
        assert_eq!(zigzag_decode32(u32::MAX), i32::MIN);
        assert_eq!(zigzag_encode64(-2), 3);
        assert_eq!(zigzag_decode64(3), -2);
        assert_eq!(zigzag_decode64(zigzag_encode64(i64::MAX)), i64::MAX);
    }
}

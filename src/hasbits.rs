//! Set-bit storage tracking which fields of a message are explicitly present
//!
//! Each field owns one bit addressed by a byte offset and a mask, both
//! computed once by the schema.

use smallvec::SmallVec;

/// Location of one field's set bit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetBit {
    /// Byte offset into the set-bit block
    pub offset: u32,
    /// Single-bit mask within that byte
    pub mask: u8,
}

impl SetBit {
    /// Set bit for the field stored at `index`
    #[inline]
    pub const fn for_index(index: usize) -> Self {
        Self {
            offset: (index / 8) as u32,
            mask: 1 << (index % 8),
        }
    }
}

/// Number of bytes needed to hold `fields` set bits
#[inline]
pub const fn bytes_for(fields: usize) -> usize {
    (fields + 7) / 8
}

/// Block of set bits for one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HasBits {
    bytes: SmallVec<[u8; 8]>,
}

impl HasBits {
    /// Create a cleared block of `len` bytes
    #[inline]
    pub fn new(len: usize) -> Self {
        Self {
            bytes: SmallVec::from_elem(0, len),
        }
    }

    /// Mark a field as present
    #[inline]
    pub fn set(&mut self, bit: SetBit) {
        if let Some(byte) = self.bytes.get_mut(bit.offset as usize) {
            *byte |= bit.mask;
        }
    }

    /// Mark a field as absent
    #[inline]
    pub fn clear(&mut self, bit: SetBit) {
        if let Some(byte) = self.bytes.get_mut(bit.offset as usize) {
            *byte &= !bit.mask;
        }
    }

    /// Check if a field is present
    #[inline]
    pub fn is_set(&self, bit: SetBit) -> bool {
        self.bytes
            .get(bit.offset as usize)
            .is_some_and(|byte| byte & bit.mask != 0)
    }

    /// Clear every bit
    #[inline]
    pub fn clear_all(&mut self) {
        self.bytes.fill(0);
    }

    /// Count number of set bits
    #[inline]
    pub fn count_set(&self) -> usize {
        self.bytes.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// Check if no field is present
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.iter().all(|&b| b == 0)
    }

    /// Size of the block in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }
}

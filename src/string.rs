//! Refcounted string/bytes buffers

use alloc::vec::Vec;

use crate::refcount::{Recycle, Shared};

/// Shared handle to a string buffer
pub type StrRef = Shared<StrBuf>;

/// Owned byte buffer backing `string` and `bytes` fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StrBuf {
    bytes: Vec<u8>,
}

impl StrBuf {
    /// Empty buffer
    #[inline]
    pub const fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Buffer holding a copy of `bytes`
    #[inline]
    pub fn from_slice(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.to_vec(),
        }
    }

    /// Replace the contents with a copy of `src[start..start + len]`
    ///
    /// Reuses the existing allocation when it is large enough. Out-of-range
    /// bounds are clamped to `src`.
    pub fn assign_substr(&mut self, src: &[u8], start: usize, len: usize) {
        let start = start.min(src.len());
        let end = start.saturating_add(len).min(src.len());
        self.bytes.clear();
        self.bytes.extend_from_slice(&src[start..end]);
    }

    /// Replace the contents with a copy of `src`
    #[inline]
    pub fn assign(&mut self, src: &[u8]) {
        self.assign_substr(src, 0, src.len());
    }

    /// Contents as a byte slice
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Contents as UTF-8, if valid
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        core::str::from_utf8(&self.bytes).ok()
    }

    /// Length in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if the buffer is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Allocated capacity in bytes
    #[inline]
    pub fn capacity(&self) -> usize {
        self.bytes.capacity()
    }
}

impl Recycle for StrBuf {
    fn reset(&mut self) {
        self.bytes.clear();
    }
}

//! Allocation context for a parse
//!
//! Every message, array and string buffer the decoder creates or recycles is
//! attributed to an [`Arena`]. In [`Ownership::Refcounted`] mode objects live
//! and die by their own counts and uniquely held objects are recycled. In
//! [`Ownership::Arena`] mode nothing is recycled; displaced objects are kept
//! alive by the arena and released together on [`Arena::reset`] or drop.

use alloc::vec::Vec;

use crate::array::{Array, ArrayRef};
use crate::message::{Message, MessageRef};
use crate::refcount::{self, Recycle, Shared};
use crate::string::{StrBuf, StrRef};

/// Lifetime policy for objects allocated during a parse
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Ownership {
    /// Individually refcounted objects with recycling
    #[default]
    Refcounted,
    /// Bulk lifetime tied to the arena; no recycling
    Arena,
}

/// Allocation counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArenaStats {
    /// Messages freshly allocated
    pub messages: usize,
    /// Arrays freshly allocated
    pub arrays: usize,
    /// String buffers freshly allocated
    pub strings: usize,
    /// Objects reused in place instead of allocated
    pub recycled: usize,
    /// Bytes copied into string buffers
    pub bytes_copied: usize,
}

impl ArenaStats {
    /// Total fresh allocations of any kind
    pub fn allocations(&self) -> usize {
        self.messages + self.arrays + self.strings
    }
}

/// Allocation context passed to the decoder
#[derive(Debug, Default)]
pub struct Arena {
    ownership: Ownership,
    stats: ArenaStats,
    messages: Vec<MessageRef>,
    arrays: Vec<ArrayRef>,
    strings: Vec<StrRef>,
}

impl Arena {
    /// Refcounted arena (recycling enabled)
    pub fn new() -> Self {
        Self::default()
    }

    /// Arena with the given ownership policy
    pub fn with_ownership(ownership: Ownership) -> Self {
        Self {
            ownership,
            ..Self::default()
        }
    }

    /// Ownership policy
    #[inline]
    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    /// Allocation counters since creation or the last reset
    #[inline]
    pub fn stats(&self) -> ArenaStats {
        self.stats
    }

    /// Number of displaced objects currently kept alive by the arena
    #[inline]
    pub fn retained(&self) -> usize {
        self.messages.len() + self.arrays.len() + self.strings.len()
    }

    /// Release every retained object and zero the counters
    pub fn reset(&mut self) {
        self.messages.clear();
        self.arrays.clear();
        self.strings.clear();
        self.stats = ArenaStats::default();
    }

    /// Reuse or replace the object in `slot` according to the ownership policy
    pub(crate) fn recycle<'s, T, F>(
        &mut self,
        slot: &'s mut Option<Shared<T>>,
        fresh: F,
    ) -> &'s mut T
    where
        T: ArenaObject,
        F: FnOnce() -> T,
    {
        match self.ownership {
            Ownership::Refcounted => {
                let (obj, reused) = refcount::recycle(slot, fresh);
                if reused {
                    self.stats.recycled += 1;
                } else {
                    T::count(&mut self.stats);
                }
                obj
            }
            Ownership::Arena => {
                if let Some(old) = slot.take() {
                    T::retain_in(self, old);
                }
                T::count(&mut self.stats);
                Shared::make_mut(slot.insert(Shared::new(fresh())))
            }
        }
    }

    /// Install `obj` in `slot`; the displaced occupant follows the ownership policy
    pub(crate) fn install<T: ArenaObject>(&mut self, slot: &mut Option<Shared<T>>, obj: Shared<T>) {
        if let Some(old) = slot.replace(obj) {
            if self.ownership == Ownership::Arena {
                T::retain_in(self, old);
            }
        }
    }

    /// Count an object allocated outside [`Arena::recycle`]
    #[inline]
    pub(crate) fn note_alloc<T: ArenaObject>(&mut self) {
        T::count(&mut self.stats);
    }

    #[inline]
    pub(crate) fn note_copy(&mut self, len: usize) {
        self.stats.bytes_copied += len;
    }
}

/// Objects the arena knows how to count and retain
pub(crate) trait ArenaObject: Recycle + Clone {
    fn count(stats: &mut ArenaStats);
    fn retain_in(arena: &mut Arena, obj: Shared<Self>);
}

impl ArenaObject for Message {
    fn count(stats: &mut ArenaStats) {
        stats.messages += 1;
    }

    fn retain_in(arena: &mut Arena, obj: Shared<Self>) {
        arena.messages.push(obj);
    }
}

impl ArenaObject for Array {
    fn count(stats: &mut ArenaStats) {
        stats.arrays += 1;
    }

    fn retain_in(arena: &mut Arena, obj: Shared<Self>) {
        arena.arrays.push(obj);
    }
}

impl ArenaObject for StrBuf {
    fn count(stats: &mut ArenaStats) {
        stats.strings += 1;
    }

    fn retain_in(arena: &mut Arena, obj: Shared<Self>) {
        arena.strings.push(obj);
    }
}

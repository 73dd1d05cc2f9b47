//! Refcounted growable arrays backing repeated fields
//!
//! Capacity only ever grows, in power-of-two steps. Shrinking just lowers the
//! logical length, so an array reset by recycling keeps both its buffer and
//! any element objects (strings, submessages) parked past the length, ready
//! to be recycled again by the next append.

use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::refcount::{Recycle, Shared};
use crate::value::{read_slot, Slot, Value, ValueCell, ValueType};

/// Shared handle to an array
pub type ArrayRef = Shared<Array>;

/// Growable sequence of one element kind
#[derive(Debug, Clone)]
pub struct Array {
    elem: ValueType,
    len: usize,
    // Always exactly `capacity` zero-initialized or previously used slots.
    data: Vec<Slot>,
}

impl Array {
    /// Empty array of `elem` values
    pub fn new(elem: ValueType) -> Self {
        Self {
            elem,
            len: 0,
            data: Vec::new(),
        }
    }

    /// Element kind
    #[inline]
    pub fn elem_type(&self) -> ValueType {
        self.elem
    }

    /// Number of live elements
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if there are no live elements
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of allocated element slots
    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Set the logical length to `len`
    ///
    /// Growing past capacity reallocates to the next power of two at or
    /// above `len` and zero-fills the newly exposed slots.
    pub fn resize(&mut self, len: usize) {
        if len > self.data.len() {
            let new_cap = len.next_power_of_two();
            self.data.resize(new_cap, Slot::zeroed(self.elem));
        }
        self.len = len;
    }

    /// Element at `index`, or `None` past the length or for an empty slot
    pub fn get(&self, index: usize) -> Option<Value> {
        if index >= self.len {
            return None;
        }
        self.data.get(index).and_then(read_slot)
    }

    /// Overwrite the element at `index`
    pub fn set(&mut self, index: usize, value: Value) -> Result<()> {
        if value.value_type() != self.elem {
            return Err(Error::TypeMismatch);
        }
        match self.cell(index) {
            Some(mut cell) => cell.write(value).map(drop),
            None => Err(Error::TypeMismatch),
        }
    }

    /// Append one element at the tail
    pub fn push(&mut self, value: Value) -> Result<()> {
        if value.value_type() != self.elem {
            return Err(Error::TypeMismatch);
        }
        let index = self.len;
        self.resize(index + 1);
        self.set(index, value)
    }

    /// Iterate live elements in index order
    pub fn iter(&self) -> impl Iterator<Item = Value> + '_ {
        self.data[..self.len].iter().filter_map(read_slot)
    }

    /// Typed view over a live element slot
    pub fn cell(&mut self, index: usize) -> Option<ValueCell<'_>> {
        if index >= self.len {
            return None;
        }
        self.data.get_mut(index).map(ValueCell::new)
    }

    /// Raw slot access for in-place recycling of element objects
    pub(crate) fn slot_mut(&mut self, index: usize) -> Option<&mut Slot> {
        if index >= self.len {
            return None;
        }
        self.data.get_mut(index)
    }
}

impl Recycle for Array {
    fn reset(&mut self) {
        self.len = 0;
    }
}

impl PartialEq for Array {
    fn eq(&self, other: &Self) -> bool {
        self.elem == other.elem
            && self.len == other.len
            && self.data[..self.len] == other.data[..other.len]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_resize_power_of_two_growth() {
        let mut arr = Array::new(ValueType::UInt32);
        assert_eq!(arr.capacity(), 0);

        arr.resize(1);
        assert_eq!(arr.capacity(), 1);
        arr.resize(3);
        assert_eq!(arr.capacity(), 4);
        arr.resize(5);
        assert_eq!(arr.capacity(), 8);

        // Shrinking keeps capacity
        arr.resize(2);
        assert_eq!(arr.len(), 2);
        assert_eq!(arr.capacity(), 8);
    }

    #[test]
    fn test_growth_zero_fills() {
        let mut arr = Array::new(ValueType::Int64);
        arr.push(Value::Int64(9)).unwrap();
        arr.resize(6);
        assert_eq!(arr.get(0), Some(Value::Int64(9)));
        assert_eq!(arr.get(5), Some(Value::Int64(0)));
        assert_eq!(arr.get(6), None);
    }

    #[test]
    fn test_push_preserves_order() {
        let mut arr = Array::new(ValueType::Int32);
        for i in 0..100 {
            arr.push(Value::Int32(i)).unwrap();
        }
        let collected: Vec<Value> = arr.iter().collect();
        let expected: Vec<Value> = (0..100).map(Value::Int32).collect();
        assert_eq!(collected, expected);
        assert_eq!(arr.capacity(), 128);
    }

    #[test]
    fn test_type_mismatch() {
        let mut arr = Array::new(ValueType::Bool);
        assert_eq!(arr.push(Value::UInt32(1)), Err(Error::TypeMismatch));
        assert!(arr.is_empty());
        assert_eq!(arr.set(0, Value::Bool(true)), Err(Error::TypeMismatch));
    }

    #[test]
    fn test_reset_keeps_parked_elements() {
        let mut arr = Array::new(ValueType::String);
        arr.push(Value::string(b"a")).unwrap();
        arr.push(Value::string(b"b")).unwrap();

        arr.reset();
        assert!(arr.is_empty());
        assert_eq!(arr.capacity(), 2);
        assert_eq!(arr.iter().count(), 0);

        arr.resize(1);
        // The parked buffer is still there for reuse.
        assert_eq!(arr.get(0).and_then(|v| v.as_bytes().map(|b| b.to_vec())), Some(vec![b'a']));
    }

    #[test]
    fn test_equality_ignores_parked_tail() {
        let mut a = Array::new(ValueType::UInt64);
        let mut b = Array::new(ValueType::UInt64);
        for v in [1u64, 2, 3] {
            a.push(Value::UInt64(v)).unwrap();
        }
        b.push(Value::UInt64(1)).unwrap();
        b.push(Value::UInt64(2)).unwrap();
        assert_ne!(a, b);

        a.resize(2);
        assert_eq!(a, b);
    }
}

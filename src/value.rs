//! Tagged values and typed views over field storage
//!
//! A [`Value`] holds any scalar or a counted reference to a string buffer,
//! message or array. Field storage inside messages and arrays is a [`Slot`]
//! whose variant is fixed by the schema when the storage is created; a
//! [`ValueCell`] is the typed read/write view used to move values in and out
//! of a slot.

use crate::array::ArrayRef;
use crate::error::{Error, Result};
use crate::message::MessageRef;
use crate::refcount::Shared;
use crate::string::{StrBuf, StrRef};

/// In-memory representation kind of a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    /// `bool`
    Bool,
    /// `int32`, `sint32`, `sfixed32`
    Int32,
    /// `int64`, `sint64`, `sfixed64`
    Int64,
    /// `uint32`, `fixed32`
    UInt32,
    /// `uint64`, `fixed64`
    UInt64,
    /// `float`
    Float,
    /// `double`
    Double,
    /// `string`, `bytes`
    String,
    /// Submessage or group
    Message,
    /// Repeated field storage
    Array,
}

impl ValueType {
    /// Whether values of this kind hold a reference count on another object
    #[inline]
    pub const fn is_owning(&self) -> bool {
        matches!(self, ValueType::String | ValueType::Message | ValueType::Array)
    }
}

/// A scalar or a counted reference to a child object
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Boolean
    Bool(bool),
    /// Signed 32-bit integer (zigzag fields hold the decoded value)
    Int32(i32),
    /// Signed 64-bit integer (zigzag fields hold the decoded value)
    Int64(i64),
    /// Unsigned 32-bit integer
    UInt32(u32),
    /// Unsigned 64-bit integer
    UInt64(u64),
    /// 32-bit float
    Float(f32),
    /// 64-bit float
    Double(f64),
    /// String or bytes buffer
    String(StrRef),
    /// Submessage
    Message(MessageRef),
    /// Repeated field contents
    Array(ArrayRef),
}

impl Value {
    /// Allocate a string value holding a copy of `bytes`
    pub fn string(bytes: &[u8]) -> Self {
        Value::String(Shared::new(StrBuf::from_slice(bytes)))
    }

    /// Kind of this value
    pub const fn value_type(&self) -> ValueType {
        match self {
            Value::Bool(_) => ValueType::Bool,
            Value::Int32(_) => ValueType::Int32,
            Value::Int64(_) => ValueType::Int64,
            Value::UInt32(_) => ValueType::UInt32,
            Value::UInt64(_) => ValueType::UInt64,
            Value::Float(_) => ValueType::Float,
            Value::Double(_) => ValueType::Double,
            Value::String(_) => ValueType::String,
            Value::Message(_) => ValueType::Message,
            Value::Array(_) => ValueType::Array,
        }
    }

    /// Bytes of a string value
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::String(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    /// Submessage reference of a message value
    pub fn as_message(&self) -> Option<&MessageRef> {
        match self {
            Value::Message(m) => Some(m),
            _ => None,
        }
    }

    /// Array reference of an array value
    pub fn as_array(&self) -> Option<&ArrayRef> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Integer value widened to i64, for any integer or bool kind
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Bool(v) => Some(v as i64),
            Value::Int32(v) => Some(v as i64),
            Value::Int64(v) => Some(v),
            Value::UInt32(v) => Some(v as i64),
            Value::UInt64(v) => Some(v as i64),
            _ => None,
        }
    }
}

/// Storage for one field or array element
///
/// Pointer kinds start out empty; an empty slot reads as "no object".
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Slot {
    Bool(bool),
    Int32(i32),
    Int64(i64),
    UInt32(u32),
    UInt64(u64),
    Float(f32),
    Double(f64),
    String(Option<StrRef>),
    Message(Option<MessageRef>),
    Array(Option<ArrayRef>),
}

impl Slot {
    /// Zeroed storage for a value kind
    pub(crate) const fn zeroed(ty: ValueType) -> Self {
        match ty {
            ValueType::Bool => Slot::Bool(false),
            ValueType::Int32 => Slot::Int32(0),
            ValueType::Int64 => Slot::Int64(0),
            ValueType::UInt32 => Slot::UInt32(0),
            ValueType::UInt64 => Slot::UInt64(0),
            ValueType::Float => Slot::Float(0.0),
            ValueType::Double => Slot::Double(0.0),
            ValueType::String => Slot::String(None),
            ValueType::Message => Slot::Message(None),
            ValueType::Array => Slot::Array(None),
        }
    }

    pub(crate) const fn value_type(&self) -> ValueType {
        match self {
            Slot::Bool(_) => ValueType::Bool,
            Slot::Int32(_) => ValueType::Int32,
            Slot::Int64(_) => ValueType::Int64,
            Slot::UInt32(_) => ValueType::UInt32,
            Slot::UInt64(_) => ValueType::UInt64,
            Slot::Float(_) => ValueType::Float,
            Slot::Double(_) => ValueType::Double,
            Slot::String(_) => ValueType::String,
            Slot::Message(_) => ValueType::Message,
            Slot::Array(_) => ValueType::Array,
        }
    }

    /// Release a pointer occupant that other owners still reference
    pub(crate) fn drop_if_shared(&mut self) {
        match self {
            Slot::String(obj) => drop_shared(obj),
            Slot::Message(obj) => drop_shared(obj),
            Slot::Array(obj) => drop_shared(obj),
            _ => {}
        }
    }

    /// Whether a pointer-kind slot currently holds no object
    #[cfg(test)]
    pub(crate) fn is_vacant(&self) -> bool {
        matches!(self, Slot::String(None) | Slot::Message(None) | Slot::Array(None))
    }
}

fn drop_shared<T>(obj: &mut Option<Shared<T>>) {
    if obj.as_ref().is_some_and(|o| !Shared::is_unique(o)) {
        *obj = None;
    }
}

/// Typed read/write view over a slot
pub struct ValueCell<'a> {
    slot: &'a mut Slot,
}

impl<'a> ValueCell<'a> {
    #[inline]
    pub(crate) fn new(slot: &'a mut Slot) -> Self {
        Self { slot }
    }

    /// Kind of value this cell stores
    #[inline]
    pub fn value_type(&self) -> ValueType {
        self.slot.value_type()
    }

    /// Current contents; `None` for an empty pointer slot
    ///
    /// Reading a pointer kind takes a new count on the referenced object.
    #[inline]
    pub fn read(&self) -> Option<Value> {
        read_slot(self.slot)
    }

    /// Store `value`, releasing any previous occupant
    ///
    /// Returns the previous occupant so the caller controls when its count
    /// is dropped.
    pub fn write(&mut self, value: Value) -> Result<Option<Value>> {
        let previous = match (&mut *self.slot, value) {
            (Slot::Bool(s), Value::Bool(v)) => Some(Value::Bool(core::mem::replace(s, v))),
            (Slot::Int32(s), Value::Int32(v)) => Some(Value::Int32(core::mem::replace(s, v))),
            (Slot::Int64(s), Value::Int64(v)) => Some(Value::Int64(core::mem::replace(s, v))),
            (Slot::UInt32(s), Value::UInt32(v)) => Some(Value::UInt32(core::mem::replace(s, v))),
            (Slot::UInt64(s), Value::UInt64(v)) => Some(Value::UInt64(core::mem::replace(s, v))),
            (Slot::Float(s), Value::Float(v)) => Some(Value::Float(core::mem::replace(s, v))),
            (Slot::Double(s), Value::Double(v)) => Some(Value::Double(core::mem::replace(s, v))),
            (Slot::String(s), Value::String(v)) => s.replace(v).map(Value::String),
            (Slot::Message(s), Value::Message(v)) => s.replace(v).map(Value::Message),
            (Slot::Array(s), Value::Array(v)) => s.replace(v).map(Value::Array),
            _ => return Err(Error::TypeMismatch),
        };
        Ok(previous)
    }
}

/// Shared read path for cells and immutable slot access
#[inline]
pub(crate) fn read_slot(slot: &Slot) -> Option<Value> {
    match slot {
        Slot::Bool(v) => Some(Value::Bool(*v)),
        Slot::Int32(v) => Some(Value::Int32(*v)),
        Slot::Int64(v) => Some(Value::Int64(*v)),
        Slot::UInt32(v) => Some(Value::UInt32(*v)),
        Slot::UInt64(v) => Some(Value::UInt64(*v)),
        Slot::Float(v) => Some(Value::Float(*v)),
        Slot::Double(v) => Some(Value::Double(*v)),
        Slot::String(v) => v.clone().map(Value::String),
        Slot::Message(v) => v.clone().map(Value::Message),
        Slot::Array(v) => v.clone().map(Value::Array),
    }
}

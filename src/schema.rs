//! Message layouts: the static description of every field
//!
//! A [`Schema`] is built once, shared behind an `Arc`, and only read from
//! then on. Each [`MessageLayout`] fixes, per field, its storage slot index,
//! set bit, value kind, cardinality and the encoded length of its key. The
//! [`SchemaBuilder`] stands in for an external schema compiler.

use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::fast::FastTable;
use crate::hasbits::{self, SetBit};
use crate::message::Message;
use crate::refcount::Shared;
use crate::value::{Value, ValueType};
use crate::varint;
use crate::wire::{self, WireType};
use crate::MAX_FIELD_NUMBER;

/// Field numbers below this are looked up by direct indexing
const DENSE_LOOKUP_LIMIT: u32 = 128;

/// Marker for an unused entry in the dense lookup table
const NO_FIELD: u16 = u16::MAX;

/// Index of a message type within its schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub(crate) u32);

impl MessageId {
    /// Position of this message type in the schema
    #[inline]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Declared protobuf type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// `bool`
    Bool,
    /// `int32`
    Int32,
    /// `int64`
    Int64,
    /// `uint32`
    UInt32,
    /// `uint64`
    UInt64,
    /// `sint32` (zigzag)
    SInt32,
    /// `sint64` (zigzag)
    SInt64,
    /// `fixed32`
    Fixed32,
    /// `fixed64`
    Fixed64,
    /// `sfixed32`
    SFixed32,
    /// `sfixed64`
    SFixed64,
    /// `float`
    Float,
    /// `double`
    Double,
    /// `string`
    String,
    /// `bytes`
    Bytes,
    /// Length-delimited submessage
    Message(MessageId),
    /// Group-delimited submessage
    Group(MessageId),
}

impl FieldType {
    /// In-memory kind of one value of this type
    pub const fn value_type(&self) -> ValueType {
        match self {
            FieldType::Bool => ValueType::Bool,
            FieldType::Int32 | FieldType::SInt32 | FieldType::SFixed32 => ValueType::Int32,
            FieldType::Int64 | FieldType::SInt64 | FieldType::SFixed64 => ValueType::Int64,
            FieldType::UInt32 | FieldType::Fixed32 => ValueType::UInt32,
            FieldType::UInt64 | FieldType::Fixed64 => ValueType::UInt64,
            FieldType::Float => ValueType::Float,
            FieldType::Double => ValueType::Double,
            FieldType::String | FieldType::Bytes => ValueType::String,
            FieldType::Message(_) | FieldType::Group(_) => ValueType::Message,
        }
    }

    /// Wire type a single value of this type is written with
    pub const fn wire_type(&self) -> WireType {
        match self {
            FieldType::Bool
            | FieldType::Int32
            | FieldType::Int64
            | FieldType::UInt32
            | FieldType::UInt64
            | FieldType::SInt32
            | FieldType::SInt64 => WireType::Varint,
            FieldType::Fixed32 | FieldType::SFixed32 | FieldType::Float => WireType::Fixed32,
            FieldType::Fixed64 | FieldType::SFixed64 | FieldType::Double => WireType::Fixed64,
            FieldType::String | FieldType::Bytes | FieldType::Message(_) => {
                WireType::LengthDelimited
            }
            FieldType::Group(_) => WireType::StartGroup,
        }
    }

    /// Submessage type for message and group fields
    pub const fn message_type(&self) -> Option<MessageId> {
        match self {
            FieldType::Message(id) | FieldType::Group(id) => Some(*id),
            _ => None,
        }
    }

    /// Whether `value` can be stored as one element of this type
    ///
    /// Submessages must also be instances of the declared message type.
    pub fn accepts(&self, value: &Value) -> bool {
        match value {
            Value::Message(msg) => self.message_type() == Some(msg.message_id()),
            _ => value.value_type() == self.value_type(),
        }
    }

    /// Whether values are varint or fixed-width numbers
    pub const fn is_scalar(&self) -> bool {
        matches!(
            self.wire_type(),
            WireType::Varint | WireType::Fixed32 | WireType::Fixed64
        )
    }

    /// Convert a raw varint or little-endian fixed payload into the stored value
    ///
    /// Zigzag types are stored decoded. Returns `None` for non-scalar types.
    #[inline]
    pub fn scalar_from_wire(&self, raw: u64) -> Option<Value> {
        let value = match self {
            FieldType::Bool => Value::Bool(raw != 0),
            FieldType::Int32 => Value::Int32(raw as i32),
            FieldType::Int64 => Value::Int64(raw as i64),
            FieldType::UInt32 => Value::UInt32(raw as u32),
            FieldType::UInt64 => Value::UInt64(raw),
            FieldType::SInt32 => Value::Int32(varint::zigzag_decode32(raw as u32)),
            FieldType::SInt64 => Value::Int64(varint::zigzag_decode64(raw)),
            FieldType::Fixed32 => Value::UInt32(raw as u32),
            FieldType::Fixed64 => Value::UInt64(raw),
            FieldType::SFixed32 => Value::Int32(raw as u32 as i32),
            FieldType::SFixed64 => Value::Int64(raw as i64),
            FieldType::Float => Value::Float(f32::from_bits(raw as u32)),
            FieldType::Double => Value::Double(f64::from_bits(raw)),
            _ => return None,
        };
        Some(value)
    }

    /// Inverse of [`FieldType::scalar_from_wire`]
    pub fn scalar_to_wire(&self, value: &Value) -> Option<u64> {
        let raw = match (self, value) {
            (FieldType::Bool, Value::Bool(v)) => *v as u64,
            // Negative int32 is sign-extended to ten bytes on the wire.
            (FieldType::Int32, Value::Int32(v)) => *v as i64 as u64,
            (FieldType::Int64 | FieldType::SFixed64, Value::Int64(v)) => *v as u64,
            (FieldType::UInt32 | FieldType::Fixed32, Value::UInt32(v)) => *v as u64,
            (FieldType::UInt64 | FieldType::Fixed64, Value::UInt64(v)) => *v,
            (FieldType::SInt32, Value::Int32(v)) => varint::zigzag_encode32(*v) as u64,
            (FieldType::SInt64, Value::Int64(v)) => varint::zigzag_encode64(*v),
            (FieldType::SFixed32, Value::Int32(v)) => *v as u32 as u64,
            (FieldType::Float, Value::Float(v)) => v.to_bits() as u64,
            (FieldType::Double, Value::Double(v)) => v.to_bits(),
            _ => return None,
        };
        Some(raw)
    }
}

/// Field cardinality
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    /// Single value; unset reads as the type's zero value
    Singular,
    /// Single value with a schema-supplied default
    Optional,
    /// Sequence of values stored in an array
    Repeated,
}

/// Description of one field of a message layout
#[derive(Debug, Clone)]
pub struct FieldDef {
    owner: MessageId,
    number: u32,
    name: String,
    field_type: FieldType,
    label: Label,
    index: usize,
    set_bit: SetBit,
    tag: [u8; 2],
    tag_len: u8,
    default: Option<Value>,
}

impl FieldDef {
    /// Message type this field belongs to
    #[inline]
    pub fn owner(&self) -> MessageId {
        self.owner
    }

    /// Field number
    #[inline]
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Field name
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type
    #[inline]
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Cardinality
    #[inline]
    pub fn label(&self) -> Label {
        self.label
    }

    /// Whether the field is repeated
    #[inline]
    pub fn is_repeated(&self) -> bool {
        self.label == Label::Repeated
    }

    /// Storage slot index within the message
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Location of the field's set bit
    #[inline]
    pub fn set_bit(&self) -> SetBit {
        self.set_bit
    }

    /// Encoded length of this field's key
    #[inline]
    pub fn tag_len(&self) -> usize {
        self.tag_len as usize
    }

    /// Key bytes for one unpacked value, valid when `tag_len() <= 2`
    #[inline]
    pub(crate) fn tag_bytes(&self) -> &[u8; 2] {
        &self.tag
    }

    /// Kind of one element
    #[inline]
    pub fn value_type(&self) -> ValueType {
        self.field_type.value_type()
    }

    /// Kind of the slot holding this field in a message
    #[inline]
    pub fn slot_type(&self) -> ValueType {
        if self.is_repeated() {
            ValueType::Array
        } else {
            self.value_type()
        }
    }

    /// Submessage type for message and group fields
    #[inline]
    pub fn message_type(&self) -> Option<MessageId> {
        self.field_type.message_type()
    }

    /// Whether `value` fits this field's slot: an array of accepted elements
    /// for repeated fields, one accepted element otherwise
    pub fn accepts(&self, value: &Value) -> bool {
        match value {
            Value::Array(arr) if self.is_repeated() => {
                arr.elem_type() == self.value_type()
                    && arr.iter().all(|v| self.field_type.accepts(&v))
            }
            _ => !self.is_repeated() && self.field_type.accepts(value),
        }
    }

    /// Schema default: the explicit default for optional fields, or the
    /// template submessage for singular message fields
    #[inline]
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Value an unset scalar field reads as
    pub fn scalar_default(&self) -> Option<Value> {
        match &self.default {
            Some(v) if !v.value_type().is_owning() => Some(v.clone()),
            _ => self.field_type.scalar_from_wire(0),
        }
    }
}

/// Layout of one message type
#[derive(Debug)]
pub struct MessageLayout {
    id: MessageId,
    name: String,
    fields: Vec<FieldDef>,
    dense: Vec<u16>,
    sparse: Vec<(u32, u16)>,
    hasbit_bytes: usize,
    fast: FastTable,
}

impl MessageLayout {
    /// Identifier of this type within the schema
    #[inline]
    pub fn id(&self) -> MessageId {
        self.id
    }

    /// Type name
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in schema order
    #[inline]
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Number of storage slots
    #[inline]
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Size of the set-bit block in bytes
    #[inline]
    pub fn hasbit_bytes(&self) -> usize {
        self.hasbit_bytes
    }

    /// Look up a field by number
    #[inline]
    pub fn field_by_number(&self, number: u32) -> Option<&FieldDef> {
        let index = match self.dense.get(number as usize) {
            Some(&NO_FIELD) => return None,
            Some(&index) => index,
            None => {
                let pos = self
                    .sparse
                    .binary_search_by_key(&number, |&(n, _)| n)
                    .ok()?;
                self.sparse[pos].1
            }
        };
        self.fields.get(index as usize)
    }

    /// Look up a field by name
    pub fn field_by_name(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Allocate an empty message of this type
    #[inline]
    pub fn new_message(&self) -> Message {
        Message::new(self)
    }

    #[inline]
    pub(crate) fn fast_table(&self) -> &FastTable {
        &self.fast
    }
}

/// Immutable collection of message layouts
#[derive(Debug)]
pub struct Schema {
    messages: Vec<MessageLayout>,
}

impl Schema {
    /// Layout for a message type
    #[inline]
    pub fn layout(&self, id: MessageId) -> Option<&MessageLayout> {
        self.messages.get(id.index())
    }

    /// Find a message type by name
    pub fn message_by_name(&self, name: &str) -> Option<&MessageLayout> {
        self.messages.iter().find(|m| m.name == name)
    }

    /// All message layouts
    #[inline]
    pub fn messages(&self) -> &[MessageLayout] {
        &self.messages
    }

    /// Layout for `id`, reporting a foreign or stale id as a type mismatch
    #[inline]
    pub(crate) fn expect_layout(&self, id: MessageId) -> Result<&MessageLayout> {
        self.layout(id).ok_or(Error::TypeMismatch)
    }
}

/// Declaration of one field handed to the [`SchemaBuilder`]
#[derive(Debug, Clone)]
pub struct FieldSpec {
    number: u32,
    name: String,
    field_type: FieldType,
    label: Label,
    default: Option<Value>,
    default_fields: Vec<(u32, Value)>,
}

impl FieldSpec {
    /// Singular field
    pub fn new(number: u32, name: &str, field_type: FieldType) -> Self {
        Self {
            number,
            name: name.to_string(),
            field_type,
            label: Label::Singular,
            default: None,
            default_fields: Vec::new(),
        }
    }

    /// Make the field repeated
    pub fn repeated(mut self) -> Self {
        self.label = Label::Repeated;
        self
    }

    /// Make the field optional with an explicit default
    pub fn optional(mut self, default: Value) -> Self {
        self.label = Label::Optional;
        self.default = Some(default);
        self
    }

    /// Override one field of a submessage field's default instance
    pub fn default_field(mut self, number: u32, value: Value) -> Self {
        if self.label == Label::Singular {
            self.label = Label::Optional;
        }
        self.default_fields.push((number, value));
        self
    }
}

/// Builds a [`Schema`], computing slot indices, set bits and key bytes
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    messages: Vec<(String, Vec<FieldSpec>)>,
}

impl SchemaBuilder {
    /// Empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a message type; fields may refer to it before it is filled in
    pub fn message(&mut self, name: &str) -> MessageId {
        let id = MessageId(self.messages.len() as u32);
        self.messages.push((name.to_string(), Vec::new()));
        id
    }

    /// Add a field to a declared message type
    ///
    /// Ids not produced by this builder are ignored.
    pub fn field(&mut self, message: MessageId, spec: FieldSpec) -> &mut Self {
        if let Some((_, fields)) = self.messages.get_mut(message.index()) {
            fields.push(spec);
        }
        self
    }

    /// Finish the schema
    ///
    /// Fails with `TypeMismatch` when a default does not match its field's
    /// type, a repeated field declares a default, or a field refers to an
    /// undeclared message type; with `Malformed` for a field number outside
    /// `1..=MAX_FIELD_NUMBER`, declared twice in one message, or a message
    /// with 65,535 fields or more.
    pub fn build(self) -> Result<Arc<Schema>> {
        let count = self.messages.len();
        let mut layouts = Vec::with_capacity(count);
        let mut pending = Vec::new();

        for (msg_index, (name, specs)) in self.messages.into_iter().enumerate() {
            if specs.len() >= usize::from(NO_FIELD) {
                return Err(Error::Malformed);
            }
            let mut fields = Vec::with_capacity(specs.len());

            for (index, spec) in specs.into_iter().enumerate() {
                if spec.number == 0
                    || spec.number > MAX_FIELD_NUMBER
                    || fields.iter().any(|f: &FieldDef| f.number == spec.number)
                {
                    return Err(Error::Malformed);
                }
                if let Some(id) = spec.field_type.message_type() {
                    if id.index() >= count {
                        return Err(Error::TypeMismatch);
                    }
                }
                if spec.label == Label::Repeated
                    && (spec.default.is_some() || !spec.default_fields.is_empty())
                {
                    return Err(Error::TypeMismatch);
                }
                if !spec.default_fields.is_empty() && spec.field_type.message_type().is_none() {
                    return Err(Error::TypeMismatch);
                }
                if let Some(default) = &spec.default {
                    if !spec.field_type.accepts(default) {
                        return Err(Error::TypeMismatch);
                    }
                }

                let mut tag = [0u8; 2];
                let mut key = Vec::with_capacity(5);
                let tag_len = wire::encode_key(spec.number, spec.field_type.wire_type(), &mut key);
                let n = tag_len.min(2);
                tag[..n].copy_from_slice(&key[..n]);

                let needs_template = spec.field_type.message_type().is_some()
                    && spec.label != Label::Repeated
                    && spec.default.is_none();
                if needs_template {
                    pending.push((msg_index, index, spec.default_fields));
                }

                fields.push(FieldDef {
                    owner: MessageId(msg_index as u32),
                    number: spec.number,
                    name: spec.name,
                    field_type: spec.field_type,
                    label: spec.label,
                    index,
                    set_bit: SetBit::for_index(index),
                    tag,
                    tag_len: tag_len as u8,
                    default: spec.default,
                });
            }

            layouts.push(build_layout(MessageId(msg_index as u32), name, fields));
        }

        // Default submessage instances need every layout in place first.
        let mut templates = Vec::with_capacity(pending.len());
        for (msg_index, field_index, overrides) in pending {
            let child = layouts[msg_index].fields[field_index]
                .message_type()
                .and_then(|id| layouts.get(id.index()))
                .ok_or(Error::TypeMismatch)?;
            let mut template = Message::new(child);
            for (number, value) in overrides {
                let field = child.field_by_number(number).ok_or(Error::TypeMismatch)?;
                template.set(field, value)?;
            }
            templates.push((msg_index, field_index, template));
        }
        for (msg_index, field_index, template) in templates {
            layouts[msg_index].fields[field_index].default =
                Some(Value::Message(Shared::new(template)));
        }

        Ok(Arc::new(Schema { messages: layouts }))
    }
}

fn build_layout(id: MessageId, name: String, fields: Vec<FieldDef>) -> MessageLayout {
    let max_dense = fields
        .iter()
        .map(|f| f.number)
        .filter(|&n| n < DENSE_LOOKUP_LIMIT)
        .max();
    let mut dense = match max_dense {
        Some(max) => alloc::vec![NO_FIELD; max as usize + 1],
        None => Vec::new(),
    };
    let mut sparse = Vec::new();

    for field in &fields {
        if field.number < DENSE_LOOKUP_LIMIT {
            dense[field.number as usize] = field.index as u16;
        } else {
            sparse.push((field.number, field.index as u16));
        }
    }
    sparse.sort_unstable_by_key(|&(n, _)| n);

    let fast = FastTable::build(&fields);

    MessageLayout {
        id,
        name,
        hasbit_bytes: hasbits::bytes_for(fields.len()),
        fields,
        dense,
        sparse,
        fast,
    }
}

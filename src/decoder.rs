//! Protobuf binary decoder
//!
//! Parses a borrowed byte slice into a [`Message`], merging into whatever the
//! message already holds. Scalar fields with short keys go through the
//! table-dispatch fast path in [`crate::fast`]; everything else, and every
//! fast-path miss, goes through the generic loop here. Both write through the
//! same storage operations, so the result never depends on which one ran.
//!
//! Any failure aborts the whole parse. The target message is then in an
//! unspecified (but memory-safe) state and should be cleared or dropped.

use crate::arena::Arena;
use crate::error::{Error, Result};
use crate::message::{AppendPolicy, Message};
use crate::schema::{FieldDef, FieldType, MessageLayout, Schema};
use crate::string::StrBuf;
use crate::value::Value;
use crate::varint;
use crate::wire::{self, WireType};
use crate::DEFAULT_MAX_DEPTH;

/// Knobs for a single decode call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Nesting bound; a submessage or group at this depth fails with
    /// `MaxDepthExceeded`
    pub max_depth: u32,
    /// Use the table-dispatch fast path for scalar fields
    pub fast_path: bool,
    /// How decoded strings are stored
    pub append_policy: AppendPolicy,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            fast_path: true,
            append_policy: AppendPolicy::default(),
        }
    }
}

/// Decode `buf` into `msg` with default options
///
/// # Example
///
/// ```rust
/// use minipb::{decode, Arena, FieldSpec, FieldType, SchemaBuilder, Value};
///
/// let mut builder = SchemaBuilder::new();
/// let id = builder.message("Test");
/// builder.field(id, FieldSpec::new(1, "a", FieldType::Int32));
/// let schema = builder.build()?;
///
/// let layout = schema.layout(id).unwrap();
/// let mut msg = layout.new_message();
/// decode(&[0x08, 0x96, 0x01], &mut msg, &schema, &mut Arena::new())?;
///
/// let a = layout.field_by_number(1).unwrap();
/// assert_eq!(msg.get(a), Some(Value::Int32(150)));
/// # Ok::<(), minipb::Error>(())
/// ```
pub fn decode(buf: &[u8], msg: &mut Message, schema: &Schema, arena: &mut Arena) -> Result<()> {
    decode_with(buf, msg, schema, arena, &DecodeOptions::default())
}

/// Decode `buf` into `msg`
pub fn decode_with(
    buf: &[u8],
    msg: &mut Message,
    schema: &Schema,
    arena: &mut Arena,
    options: &DecodeOptions,
) -> Result<()> {
    let layout = schema.expect_layout(msg.message_id())?;
    let mut decoder = Decoder {
        buf,
        pos: 0,
        limit: buf.len(),
        depth: 0,
        schema,
        arena,
        options: *options,
    };
    decoder.parse_message(msg, layout, None)
}

/// State of one parse
pub(crate) struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
    // End of the innermost length-delimited region; never past `buf.len()`.
    limit: usize,
    depth: u32,
    schema: &'a Schema,
    arena: &'a mut Arena,
    options: DecodeOptions,
}

impl<'a> Decoder<'a> {
    /// Parse fields until the current limit, or until the end tag of `group`
    fn parse_message(
        &mut self,
        msg: &mut Message,
        layout: &MessageLayout,
        group: Option<u32>,
    ) -> Result<()> {
        let table = layout.fast_table();
        let mut predicted = if self.options.fast_path {
            table.first()
        } else {
            None
        };

        loop {
            if self.pos == self.limit {
                // An open group must be closed before its region ends.
                return match group {
                    None => Ok(()),
                    Some(_) => Err(Error::Truncated),
                };
            }

            if let Some(index) = predicted {
                if let (Some(entry), Some(field)) = (table.entry(index), layout.fields().get(index))
                {
                    if (entry.parser)(self, msg, field)? {
                        predicted = entry.next;
                        continue;
                    }
                }
            }

            let key = self.read_varint()?;
            let (number, wire_type) = wire::split_key(key)?;

            if wire_type == WireType::EndGroup {
                return match group {
                    Some(open) if open == number => Ok(()),
                    _ => Err(Error::Malformed),
                };
            }

            match layout.field_by_number(number) {
                Some(field) => {
                    self.parse_field(msg, field, wire_type)?;
                    if self.options.fast_path {
                        predicted = table.successor(field.index());
                    }
                }
                None => self.skip_field(number, wire_type)?,
            }
        }
    }

    /// Parse the value of a known field whose key has been consumed
    fn parse_field(&mut self, msg: &mut Message, field: &FieldDef, wire_type: WireType) -> Result<()> {
        let field_type = field.field_type();

        if wire_type != field_type.wire_type() {
            if wire_type == WireType::LengthDelimited && field.is_repeated() && field_type.is_scalar()
            {
                return self.parse_packed(msg, field);
            }
            return self.skip_field(field.number(), wire_type);
        }

        match field_type {
            FieldType::String | FieldType::Bytes => {
                let end = self.read_length()?;
                let buf = self.buf;
                let bytes = &buf[self.pos..end];
                self.pos = end;
                match self.options.append_policy {
                    AppendPolicy::CopyIntoRecycled => msg.append_bytes(field, bytes, self.arena),
                    AppendPolicy::ShareSource => {
                        self.arena.note_alloc::<StrBuf>();
                        self.arena.note_copy(bytes.len());
                        msg.append_with(
                            field,
                            Value::string(bytes),
                            AppendPolicy::ShareSource,
                            self.arena,
                        )
                    }
                }
            }
            FieldType::Message(id) => {
                let end = self.read_length()?;
                let schema = self.schema;
                let child_layout = schema.expect_layout(id)?;
                self.enter()?;
                let child = msg.recycle_submessage(field, child_layout, self.arena)?;

                let saved = self.limit;
                self.limit = end;
                self.parse_message(child, child_layout, None)?;
                self.limit = saved;
                self.leave();
                Ok(())
            }
            FieldType::Group(id) => {
                let schema = self.schema;
                let child_layout = schema.expect_layout(id)?;
                self.enter()?;
                let child = msg.recycle_submessage(field, child_layout, self.arena)?;
                self.parse_message(child, child_layout, Some(field.number()))?;
                self.leave();
                Ok(())
            }
            _ => {
                let raw = self.read_raw(wire_type)?;
                self.store_scalar(msg, field, raw)
            }
        }
    }

    /// Parse a packed run of scalars
    fn parse_packed(&mut self, msg: &mut Message, field: &FieldDef) -> Result<()> {
        let end = self.read_length()?;
        let element = field.field_type().wire_type();

        let saved = self.limit;
        self.limit = end;
        while self.pos < end {
            let raw = self.read_raw(element)?;
            self.store_scalar(msg, field, raw)?;
        }
        self.limit = saved;
        Ok(())
    }

    #[inline]
    fn store_scalar(&mut self, msg: &mut Message, field: &FieldDef, raw: u64) -> Result<()> {
        let value = field
            .field_type()
            .scalar_from_wire(raw)
            .ok_or(Error::TypeMismatch)?;
        msg.push_value(field, value, self.arena)
    }

    /// Skip one value of an unknown (or mistyped) field
    fn skip_field(&mut self, number: u32, wire_type: WireType) -> Result<()> {
        match wire_type {
            WireType::Varint => self.read_varint().map(drop),
            WireType::Fixed64 => self.read_fixed::<8>().map(drop),
            WireType::Fixed32 => self.read_fixed::<4>().map(drop),
            WireType::LengthDelimited => {
                self.pos = self.read_length()?;
                Ok(())
            }
            WireType::StartGroup => self.skip_group(number),
            WireType::EndGroup => Err(Error::Malformed),
        }
    }

    fn skip_group(&mut self, number: u32) -> Result<()> {
        self.enter()?;
        loop {
            if self.pos == self.limit {
                return Err(Error::Truncated);
            }
            let (inner, wire_type) = wire::split_key(self.read_varint()?)?;
            if wire_type == WireType::EndGroup {
                if inner != number {
                    return Err(Error::Malformed);
                }
                self.leave();
                return Ok(());
            }
            self.skip_field(inner, wire_type)?;
        }
    }

    #[inline]
    fn enter(&mut self) -> Result<()> {
        let depth = self.depth + 1;
        if depth >= self.options.max_depth {
            return Err(Error::MaxDepthExceeded);
        }
        self.depth = depth;
        Ok(())
    }

    #[inline]
    fn leave(&mut self) {
        self.depth -= 1;
    }

    /// Raw payload of a varint or fixed-width value
    #[inline]
    fn read_raw(&mut self, wire_type: WireType) -> Result<u64> {
        match wire_type {
            WireType::Varint => self.read_varint(),
            WireType::Fixed32 => self.read_fixed::<4>().map(|b| u32::from_le_bytes(b) as u64),
            WireType::Fixed64 => self.read_fixed::<8>().map(u64::from_le_bytes),
            _ => Err(Error::Malformed),
        }
    }

    /// Read a varint that must end before the current limit
    #[inline]
    pub(crate) fn read_varint(&mut self) -> Result<u64> {
        let (value, len) = varint::decode_u64(&self.buf[self.pos..self.limit])?;
        self.pos += len;
        Ok(value)
    }

    /// Read `N` literal bytes
    #[inline]
    pub(crate) fn read_fixed<const N: usize>(&mut self) -> Result<[u8; N]> {
        let end = self.pos + N;
        if end > self.limit {
            return Err(Error::Truncated);
        }
        let mut bytes = [0u8; N];
        bytes.copy_from_slice(&self.buf[self.pos..end]);
        self.pos = end;
        Ok(bytes)
    }

    /// Read a length prefix and return the end of the region it declares
    ///
    /// Running past the whole input is `Truncated`; running past the
    /// enclosing region while still inside the input is `Malformed`.
    fn read_length(&mut self) -> Result<usize> {
        let len = self.read_varint()?;
        let end = usize::try_from(len)
            .ok()
            .and_then(|len| self.pos.checked_add(len))
            .ok_or(Error::Truncated)?;
        if end > self.buf.len() {
            return Err(Error::Truncated);
        }
        if end > self.limit {
            return Err(Error::Malformed);
        }
        Ok(end)
    }

    /// Consume `tag` if the input continues with exactly these bytes
    #[inline]
    pub(crate) fn eat_tag(&mut self, tag: &[u8]) -> bool {
        let end = self.pos + tag.len();
        if end <= self.limit && &self.buf[self.pos..end] == tag {
            self.pos = end;
            true
        } else {
            false
        }
    }

    #[inline]
    pub(crate) fn arena(&mut self) -> &mut Arena {
        self.arena
    }
}

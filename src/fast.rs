//! Table-dispatch fast path for scalar fields
//!
//! Every scalar field whose key fits in one or two bytes gets a parser
//! specialized on four axes: cardinality, value width (1, 4 or 8 bytes),
//! codec (varint, zigzag, fixed) and key length. A specialized parser checks
//! the next bytes against the field's key, decodes the value inline and
//! stores it. On a miss it consumes nothing and the decoder falls back to its
//! generic loop.
//!
//! After a hit the decoder tries the entry's predicted successor first:
//! a repeated field predicts itself, anything else predicts the next field
//! in declaration order that has a fast entry.

use alloc::vec::Vec;
use core::fmt;

use crate::decoder::Decoder;
use crate::error::{Error, Result};
use crate::message::Message;
use crate::schema::{FieldDef, FieldType};
use crate::value::Value;
use crate::varint;

/// Specialized parser: `Ok(true)` when the field was parsed, `Ok(false)` on
/// a key mismatch with nothing consumed
pub(crate) type FastParser = fn(&mut Decoder<'_>, &mut Message, &FieldDef) -> Result<bool>;

const VARINT: u8 = 0;
const ZIGZAG: u8 = 1;
const FIXED: u8 = 2;

#[derive(Clone, Copy)]
pub(crate) struct FastEntry {
    pub(crate) parser: FastParser,
    pub(crate) next: Option<usize>,
}

impl fmt::Debug for FastEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FastEntry").field("next", &self.next).finish()
    }
}

/// Per-layout table of fast entries, indexed like the layout's fields
#[derive(Debug, Clone, Default)]
pub(crate) struct FastTable {
    entries: Vec<Option<FastEntry>>,
    first: Option<usize>,
}

impl FastTable {
    pub(crate) fn build(fields: &[FieldDef]) -> Self {
        let parsers: Vec<Option<FastParser>> = fields.iter().map(select_for).collect();
        let next_fast = |from: usize| (from..parsers.len()).find(|&i| parsers[i].is_some());

        let entries = fields
            .iter()
            .zip(&parsers)
            .enumerate()
            .map(|(index, (field, parser))| {
                parser.map(|parser| FastEntry {
                    parser,
                    next: if field.is_repeated() {
                        Some(index)
                    } else {
                        next_fast(index + 1)
                    },
                })
            })
            .collect();

        Self {
            entries,
            first: next_fast(0),
        }
    }

    /// First field with a fast entry
    #[inline]
    pub(crate) fn first(&self) -> Option<usize> {
        self.first
    }

    #[inline]
    pub(crate) fn entry(&self, index: usize) -> Option<&FastEntry> {
        self.entries.get(index).and_then(Option::as_ref)
    }

    /// Prediction after field `index` was parsed by the generic loop
    #[inline]
    pub(crate) fn successor(&self, index: usize) -> Option<usize> {
        match self.entry(index) {
            Some(entry) => entry.next,
            None => (index + 1..self.entries.len()).find(|&i| self.entries[i].is_some()),
        }
    }

    /// Number of fields served by the fast path
    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }
}

/// Width and codec of a scalar type
const fn shape(field_type: FieldType) -> Option<(usize, u8)> {
    let shape = match field_type {
        FieldType::Bool => (1, VARINT),
        FieldType::Int32 | FieldType::UInt32 => (4, VARINT),
        FieldType::Int64 | FieldType::UInt64 => (8, VARINT),
        FieldType::SInt32 => (4, ZIGZAG),
        FieldType::SInt64 => (8, ZIGZAG),
        FieldType::Fixed32 | FieldType::SFixed32 | FieldType::Float => (4, FIXED),
        FieldType::Fixed64 | FieldType::SFixed64 | FieldType::Double => (8, FIXED),
        _ => return None,
    };
    Some(shape)
}

fn select_for(field: &FieldDef) -> Option<FastParser> {
    let (width, codec) = shape(field.field_type())?;
    select(field.is_repeated(), width, codec, field.tag_len())
}

macro_rules! fast_parsers {
    ($($width:literal / $codec:ident),* $(,)?) => {
        fn select(repeated: bool, width: usize, codec: u8, tag_len: usize) -> Option<FastParser> {
            let parser: FastParser = match (repeated, width, codec, tag_len) {
                $(
                    (false, $width, $codec, 1) => parse_scalar::<false, $width, $codec, 1>,
                    (false, $width, $codec, 2) => parse_scalar::<false, $width, $codec, 2>,
                    (true, $width, $codec, 1) => parse_scalar::<true, $width, $codec, 1>,
                    (true, $width, $codec, 2) => parse_scalar::<true, $width, $codec, 2>,
                )*
                _ => return None,
            };
            Some(parser)
        }
    };
}

fast_parsers! {
    1 / VARINT,
    4 / VARINT,
    8 / VARINT,
    4 / ZIGZAG,
    8 / ZIGZAG,
    4 / FIXED,
    8 / FIXED,
}

fn parse_scalar<const REPEATED: bool, const WIDTH: usize, const CODEC: u8, const TAG_LEN: usize>(
    d: &mut Decoder<'_>,
    msg: &mut Message,
    field: &FieldDef,
) -> Result<bool> {
    if !d.eat_tag(&field.tag_bytes()[..TAG_LEN]) {
        return Ok(false);
    }

    let raw = match (CODEC, WIDTH) {
        (FIXED, 4) => u32::from_le_bytes(d.read_fixed::<4>()?) as u64,
        (FIXED, _) => u64::from_le_bytes(d.read_fixed::<8>()?),
        _ => d.read_varint()?,
    };
    let value = match (CODEC, WIDTH) {
        (VARINT, 1) => Value::Bool(raw != 0),
        (ZIGZAG, 4) => Value::Int32(varint::zigzag_decode32(raw as u32)),
        (ZIGZAG, _) => Value::Int64(varint::zigzag_decode64(raw)),
        _ => field
            .field_type()
            .scalar_from_wire(raw)
            .ok_or(Error::TypeMismatch)?,
    };

    if REPEATED {
        msg.push_value(field, value, d.arena())?;
    } else {
        msg.set(field, value)?;
    }
    Ok(true)
}

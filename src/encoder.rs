//! Protobuf binary encoder driven by the push dispatcher
//!
//! [`WireEncoder`] is a [`Handler`]: running the dispatcher over a message
//! with it produces the message's wire encoding. Repeated scalars are written
//! unpacked, submessages length-delimited and group fields between start and
//! end keys. Each open submessage is encoded into its own buffer and spliced
//! into its parent when it ends; buffers are kept for reuse across calls.

use alloc::vec::Vec;

use crate::dispatch::{run_handlers, Flow, Handler, Status};
use crate::error::{Error, Result};
use crate::message::Message;
use crate::schema::{FieldDef, FieldType, Schema};
use crate::value::Value;
use crate::varint;
use crate::wire::{self, WireType};

/// Submessage being encoded
#[derive(Debug)]
struct Frame {
    number: u32,
    group: bool,
    buf: Vec<u8>,
}

/// Encoder writing protobuf binary into a growable buffer
#[derive(Debug, Default)]
pub struct WireEncoder {
    out: Vec<u8>,
    stack: Vec<Frame>,
    spare: Vec<Vec<u8>>,
    error: Option<Error>,
}

impl WireEncoder {
    /// Empty encoder
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a field key
    #[inline]
    pub fn put_key(&mut self, number: u32, wire_type: WireType) {
        wire::encode_key(number, wire_type, self.current());
    }

    /// Write a varint
    #[inline]
    pub fn put_varint(&mut self, value: u64) {
        varint::encode_u64(value, self.current());
    }

    /// Write four little-endian bytes
    #[inline]
    pub fn put_fixed32(&mut self, value: u32) {
        self.current().extend_from_slice(&value.to_le_bytes());
    }

    /// Write eight little-endian bytes
    #[inline]
    pub fn put_fixed64(&mut self, value: u64) {
        self.current().extend_from_slice(&value.to_le_bytes());
    }

    /// Write a length prefix followed by `bytes`
    #[inline]
    pub fn put_bytes(&mut self, bytes: &[u8]) {
        let buf = self.current();
        varint::encode_u64(bytes.len() as u64, buf);
        buf.extend_from_slice(bytes);
    }

    /// Encoded bytes of the top-level message so far
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.out
    }

    /// Take the encoded bytes
    #[inline]
    pub fn into_bytes(self) -> Vec<u8> {
        self.out
    }

    /// Error that aborted the last walk, if any
    #[inline]
    pub fn error(&self) -> Option<Error> {
        self.error
    }

    /// Clear output and state, keeping allocations
    pub fn reset(&mut self) {
        self.out.clear();
        while let Some(frame) = self.stack.pop() {
            self.recycle_buf(frame.buf);
        }
        self.error = None;
    }

    fn current(&mut self) -> &mut Vec<u8> {
        match self.stack.last_mut() {
            Some(frame) => &mut frame.buf,
            None => &mut self.out,
        }
    }

    fn recycle_buf(&mut self, mut buf: Vec<u8>) {
        buf.clear();
        self.spare.push(buf);
    }

    fn put_value(&mut self, field: &FieldDef, value: &Value) -> Result<()> {
        let field_type = field.field_type();

        if let Value::String(s) = value {
            self.put_key(field.number(), WireType::LengthDelimited);
            self.put_bytes(s.as_bytes());
            return Ok(());
        }

        let raw = field_type
            .scalar_to_wire(value)
            .ok_or(Error::TypeMismatch)?;
        let wire_type = field_type.wire_type();
        self.put_key(field.number(), wire_type);
        match wire_type {
            WireType::Varint => self.put_varint(raw),
            WireType::Fixed32 => self.put_fixed32(raw as u32),
            WireType::Fixed64 => self.put_fixed64(raw),
            _ => return Err(Error::TypeMismatch),
        }
        Ok(())
    }

    fn fail(&mut self, error: Error) -> Flow {
        self.error = Some(error);
        Flow::Abort
    }
}

impl Handler for WireEncoder {
    fn start_message(&mut self) -> Flow {
        self.reset();
        Flow::Continue
    }

    fn end_message(&mut self, status: &mut Status) -> Flow {
        match self.error {
            Some(error) => {
                status.set_error(error);
                Flow::Abort
            }
            None => Flow::Continue,
        }
    }

    fn start_submessage(&mut self, field: &FieldDef) -> Flow {
        let group = match field.field_type() {
            FieldType::Group(_) => true,
            FieldType::Message(_) => false,
            _ => return self.fail(Error::TypeMismatch),
        };
        let buf = self.spare.pop().unwrap_or_default();
        self.stack.push(Frame {
            number: field.number(),
            group,
            buf,
        });
        Flow::Continue
    }

    fn end_submessage(&mut self, _field: &FieldDef) -> Flow {
        let Some(frame) = self.stack.pop() else {
            return self.fail(Error::Malformed);
        };

        if frame.group {
            self.put_key(frame.number, WireType::StartGroup);
            self.current().extend_from_slice(&frame.buf);
            self.put_key(frame.number, WireType::EndGroup);
        } else {
            self.put_key(frame.number, WireType::LengthDelimited);
            self.put_bytes(&frame.buf);
        }
        self.recycle_buf(frame.buf);
        Flow::Continue
    }

    fn value(&mut self, field: &FieldDef, value: &Value) -> Flow {
        match self.put_value(field, value) {
            Ok(()) => Flow::Continue,
            Err(error) => self.fail(error),
        }
    }
}

/// Serialize `msg` to protobuf binary
pub fn encode(msg: &Message, schema: &Schema) -> Result<Vec<u8>> {
    let mut encoder = WireEncoder::new();
    let mut status = Status::new();
    if run_handlers(msg, schema, &mut encoder, &mut status) == Flow::Abort {
        return Err(status.error().unwrap_or(Error::TypeMismatch));
    }
    Ok(encoder.into_bytes())
}

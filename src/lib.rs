//! minipb: a small protocol-buffer runtime with recycled, refcounted storage
//!
//! Messages are laid out from a [`Schema`] built once and shared read-only.
//! The wire decoder parses protobuf binary straight into message storage,
//! using specialized fast-path parsers for scalar fields and a generic loop
//! for everything else. Messages, arrays and string buffers are atomically
//! refcounted; a uniquely held object is reset and reused instead of being
//! freed, so parsing into the same message over and over stops allocating.
//! The push dispatcher walks a message and feeds its contents to a
//! [`Handler`], which is how messages are copied ([`CopySink`]) and
//! re-serialized ([`WireEncoder`]).
//!
//! # Wire Format
//!
//! ```text
//! key     = varint((field_number << 3) | wire_type)
//! 0 VARINT   LEB128, at most 10 bytes; sint32/sint64 are zigzag mapped
//! 1 FIXED64  8 bytes little-endian
//! 2 LEN      varint length, then that many bytes
//! 3 SGROUP   fields until the matching EGROUP key
//! 4 EGROUP
//! 5 FIXED32  4 bytes little-endian
//! ```
//!
//! # Features
//!
//! - Table-dispatch fast path keyed by cardinality, value width, codec and
//!   key length, with successor prediction
//! - Unknown fields skipped safely, including nested groups
//! - Packed repeated scalars
//! - Recursion bound for submessages and groups
//! - Copy-on-write schema defaults for submessage fields
//! - Refcounted or arena-style ownership of decoded objects
//! - `no_std` support with `alloc`
//!
//! # Example
//!
//! ```rust
//! use minipb::*;
//!
//! let mut builder = SchemaBuilder::new();
//! let person = builder.message("Person");
//! builder
//!     .field(person, FieldSpec::new(1, "id", FieldType::UInt32))
//!     .field(person, FieldSpec::new(2, "name", FieldType::String))
//!     .field(person, FieldSpec::new(3, "scores", FieldType::SInt32).repeated());
//! let schema = builder.build()?;
//!
//! let layout = schema.layout(person).unwrap();
//! let id = layout.field_by_name("id").unwrap();
//! let name = layout.field_by_name("name").unwrap();
//!
//! let mut msg = layout.new_message();
//! msg.set(id, Value::UInt32(42))?;
//! msg.set(name, Value::string(b"Ada"))?;
//!
//! let bytes = encode(&msg, &schema)?;
//!
//! let mut decoded = layout.new_message();
//! let mut arena = Arena::new();
//! decode(&bytes, &mut decoded, &schema, &mut arena)?;
//! assert_eq!(decoded.get(id), Some(Value::UInt32(42)));
//! assert_eq!(decoded.bytes(name), Some(&b"Ada"[..]));
//! # Ok::<(), minipb::Error>(())
//! ```

#![no_std]
#![deny(unsafe_code)]
#![warn(missing_docs)]

#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

pub mod arena;
pub mod array;
pub mod decoder;
pub mod dispatch;
pub mod encoder;
pub mod error;
mod fast;
pub mod hasbits;
pub mod message;
pub mod refcount;
pub mod schema;
pub mod sink;
pub mod string;
pub mod value;
pub mod varint;
pub mod wire;

// Re-export main types
pub use arena::{Arena, ArenaStats, Ownership};
pub use array::{Array, ArrayRef};
pub use decoder::{decode, decode_with, DecodeOptions};
pub use dispatch::{run_handlers, Flow, Handler, HandlerTable, Status};
pub use encoder::{encode, WireEncoder};
pub use error::{Error, Result};
pub use message::{AppendPolicy, Message, MessageRef};
pub use refcount::{release, retain, Recycle, Shared};
pub use schema::{
    FieldDef, FieldSpec, FieldType, Label, MessageId, MessageLayout, Schema, SchemaBuilder,
};
pub use sink::{copy_message, CopySink};
pub use string::{StrBuf, StrRef};
pub use value::{Value, ValueCell, ValueType};
pub use wire::WireType;

/// Default bound on submessage and group nesting
pub const DEFAULT_MAX_DEPTH: u32 = 64;

/// Longest valid varint encoding in bytes
pub const MAX_VARINT_LEN: usize = 10;

/// Largest valid field number
pub const MAX_FIELD_NUMBER: u32 = (1 << 29) - 1;

//! Push dispatcher: walk a message and feed its contents to a handler
//!
//! Fields are visited in schema order. Only set fields are dispatched;
//! repeated fields produce one callback per element in index order, and
//! submessages are bracketed by `start_submessage`/`end_submessage`.
//!
//! Each callback returns a [`Flow`]. `Abort` stops the whole walk at once;
//! `SkipSubmessage` from `start_submessage` skips that submessage (no nested
//! callbacks and no `end_submessage`) and the walk carries on.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;

use crate::error::Error;
use crate::message::Message;
use crate::schema::{FieldDef, MessageId, Schema};
use crate::value::Value;

/// Result of a handler callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep walking
    Continue,
    /// Stop the walk immediately
    Abort,
    /// Skip the submessage just started; treated as `Continue` elsewhere
    SkipSubmessage,
}

/// Outcome of one dispatch walk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Status {
    aborted: bool,
    abort_field: Option<u32>,
    error: Option<Error>,
    values: usize,
    skipped: usize,
}

impl Status {
    /// Fresh status
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the walk completed without an abort or a reported error
    #[inline]
    pub fn ok(&self) -> bool {
        !self.aborted && self.error.is_none()
    }

    /// Whether a callback aborted the walk
    #[inline]
    pub fn aborted(&self) -> bool {
        self.aborted
    }

    /// Number of the field being dispatched when the walk was aborted
    #[inline]
    pub fn abort_field(&self) -> Option<u32> {
        self.abort_field
    }

    /// Error reported by the walk or by a handler
    #[inline]
    pub fn error(&self) -> Option<Error> {
        self.error
    }

    /// Number of `value` callbacks delivered
    #[inline]
    pub fn values(&self) -> usize {
        self.values
    }

    /// Number of submessages skipped on request
    #[inline]
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Record an error; the first one reported is kept
    pub fn set_error(&mut self, error: Error) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    fn abort(&mut self, field: Option<&FieldDef>) -> Flow {
        self.aborted = true;
        self.abort_field = field.map(FieldDef::number);
        Flow::Abort
    }
}

/// Receiver of a dispatch walk
///
/// Every callback defaults to `Continue`, so a handler only implements what
/// it cares about.
pub trait Handler {
    /// Called once before any field of the top-level message
    fn start_message(&mut self) -> Flow {
        Flow::Continue
    }

    /// Called once after the top-level message; may report into `status`
    fn end_message(&mut self, _status: &mut Status) -> Flow {
        Flow::Continue
    }

    /// Called before the fields of a submessage value
    fn start_submessage(&mut self, _field: &FieldDef) -> Flow {
        Flow::Continue
    }

    /// Called after the fields of a submessage value
    fn end_submessage(&mut self, _field: &FieldDef) -> Flow {
        Flow::Continue
    }

    /// Called for every scalar or string value
    fn value(&mut self, _field: &FieldDef, _value: &Value) -> Flow {
        Flow::Continue
    }

    /// Whether `field` should be dispatched at all
    fn wants(&self, _field: &FieldDef) -> bool {
        true
    }
}

/// Walk `msg` and push its contents into `handler`
///
/// `status` is reset first. Returns `Flow::Abort` when a callback aborted
/// or the message does not belong to `schema` (reported as `TypeMismatch`),
/// `Flow::Continue` otherwise.
pub fn run_handlers<H: Handler + ?Sized>(
    msg: &Message,
    schema: &Schema,
    handler: &mut H,
    status: &mut Status,
) -> Flow {
    *status = Status::new();

    if handler.start_message() == Flow::Abort {
        return status.abort(None);
    }
    if walk(msg, schema, handler, status) == Flow::Abort {
        return Flow::Abort;
    }
    if handler.end_message(status) == Flow::Abort {
        return status.abort(None);
    }
    Flow::Continue
}

fn walk<H: Handler + ?Sized>(
    msg: &Message,
    schema: &Schema,
    handler: &mut H,
    status: &mut Status,
) -> Flow {
    let Some(layout) = schema.layout(msg.message_id()) else {
        status.set_error(Error::TypeMismatch);
        return status.abort(None);
    };

    for field in layout.fields() {
        if !msg.has(field) || !handler.wants(field) {
            continue;
        }

        let flow = match msg.array(field) {
            Some(array) => array
                .iter()
                .map(|value| dispatch_value(field, &value, schema, handler, status))
                .find(|flow| *flow == Flow::Abort)
                .unwrap_or(Flow::Continue),
            None => match msg.get(field) {
                Some(value) => dispatch_value(field, &value, schema, handler, status),
                None => Flow::Continue,
            },
        };
        if flow == Flow::Abort {
            return Flow::Abort;
        }
    }
    Flow::Continue
}

fn dispatch_value<H: Handler + ?Sized>(
    field: &FieldDef,
    value: &Value,
    schema: &Schema,
    handler: &mut H,
    status: &mut Status,
) -> Flow {
    if status.aborted {
        return Flow::Abort;
    }

    let Value::Message(sub) = value else {
        status.values += 1;
        return match handler.value(field, value) {
            Flow::Abort => status.abort(Some(field)),
            _ => Flow::Continue,
        };
    };

    match handler.start_submessage(field) {
        Flow::Abort => return status.abort(Some(field)),
        Flow::SkipSubmessage => {
            status.skipped += 1;
            return Flow::Continue;
        }
        Flow::Continue => {}
    }
    if walk(sub, schema, handler, status) == Flow::Abort {
        return Flow::Abort;
    }
    match handler.end_submessage(field) {
        Flow::Abort => status.abort(Some(field)),
        _ => Flow::Continue,
    }
}

type ValueFn<'h> = Box<dyn FnMut(&FieldDef, &Value) -> Flow + 'h>;
type SubmessageFn<'h> = Box<dyn FnMut(&FieldDef) -> Flow + 'h>;

/// Handler built from closures registered per field
///
/// Keys are (message type, field number). Fields without a registered
/// closure are not dispatched; a submessage field needs an
/// [`on_submessage`](HandlerTable::on_submessage) closure for its nested
/// fields to be reached.
#[derive(Default)]
pub struct HandlerTable<'h> {
    values: BTreeMap<(MessageId, u32), ValueFn<'h>>,
    submessages: BTreeMap<(MessageId, u32), SubmessageFn<'h>>,
}

impl<'h> HandlerTable<'h> {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Call `f` for every value of field `number` of message type `message`
    pub fn on_value<F>(&mut self, message: MessageId, number: u32, f: F) -> &mut Self
    where
        F: FnMut(&FieldDef, &Value) -> Flow + 'h,
    {
        self.values.insert((message, number), Box::new(f));
        self
    }

    /// Call `f` when a submessage in field `number` of type `message` starts
    pub fn on_submessage<F>(&mut self, message: MessageId, number: u32, f: F) -> &mut Self
    where
        F: FnMut(&FieldDef) -> Flow + 'h,
    {
        self.submessages.insert((message, number), Box::new(f));
        self
    }

    /// Number of registered closures
    pub fn len(&self) -> usize {
        self.values.len() + self.submessages.len()
    }

    /// Check if no closure is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Handler for HandlerTable<'_> {
    fn start_submessage(&mut self, field: &FieldDef) -> Flow {
        match self.submessages.get_mut(&(field.owner(), field.number())) {
            Some(f) => f(field),
            None => Flow::SkipSubmessage,
        }
    }

    fn value(&mut self, field: &FieldDef, value: &Value) -> Flow {
        match self.values.get_mut(&(field.owner(), field.number())) {
            Some(f) => f(field, value),
            None => Flow::Continue,
        }
    }

    fn wants(&self, field: &FieldDef) -> bool {
        let key = (field.owner(), field.number());
        self.values.contains_key(&key) || self.submessages.contains_key(&key)
    }
}

impl core::fmt::Debug for HandlerTable<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HandlerTable")
            .field("values", &self.values.keys())
            .field("submessages", &self.submessages.keys())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldSpec, FieldType, SchemaBuilder};
    use alloc::string::String;
    use alloc::sync::Arc;
    use alloc::vec::Vec;
    use alloc::{format, vec};

    fn schema() -> Arc<Schema> {
        let mut b = SchemaBuilder::new();
        let outer = b.message("Outer");
        let inner = b.message("Inner");
        b.field(outer, FieldSpec::new(1, "id", FieldType::UInt32))
            .field(outer, FieldSpec::new(2, "inner", FieldType::Message(inner)))
            .field(outer, FieldSpec::new(3, "tags", FieldType::String).repeated())
            .field(outer, FieldSpec::new(4, "unset", FieldType::Bool));
        b.field(inner, FieldSpec::new(5, "x", FieldType::Int64));
        b.build().unwrap()
    }

    fn sample(schema: &Schema) -> Message {
        let outer = &schema.messages()[0];
        let inner = &schema.messages()[1];
        let mut msg = outer.new_message();
        msg.set(outer.field_by_number(1).unwrap(), Value::UInt32(7)).unwrap();
        let sub = msg.append_message(outer.field_by_number(2).unwrap(), schema).unwrap();
        sub.set(inner.field_by_number(5).unwrap(), Value::Int64(-1)).unwrap();
        msg.append(outer.field_by_number(3).unwrap(), Value::string(b"a")).unwrap();
        msg.append(outer.field_by_number(3).unwrap(), Value::string(b"b")).unwrap();
        msg
    }

    /// Records every callback as a line of text
    #[derive(Default)]
    struct Trace {
        events: Vec<String>,
        abort_on: Option<u32>,
        skip: bool,
    }

    impl Handler for Trace {
        fn start_message(&mut self) -> Flow {
            self.events.push("start".into());
            Flow::Continue
        }

        fn end_message(&mut self, _status: &mut Status) -> Flow {
            self.events.push("end".into());
            Flow::Continue
        }

        fn start_submessage(&mut self, field: &FieldDef) -> Flow {
            self.events.push(format!("<{}", field.name()));
            if self.skip {
                Flow::SkipSubmessage
            } else {
                Flow::Continue
            }
        }

        fn end_submessage(&mut self, field: &FieldDef) -> Flow {
            self.events.push(format!("{}>", field.name()));
            Flow::Continue
        }

        fn value(&mut self, field: &FieldDef, value: &Value) -> Flow {
            let text = match value.as_bytes() {
                Some(bytes) => String::from_utf8_lossy(bytes).into_owned(),
                None => format!("{:?}", value.as_i64()),
            };
            self.events.push(format!("{}={}", field.name(), text));
            if self.abort_on == Some(field.number()) {
                Flow::Abort
            } else {
                Flow::Continue
            }
        }
    }

    #[test]
    fn test_walk_order() {
        let schema = schema();
        let msg = sample(&schema);
        let mut trace = Trace::default();
        let mut status = Status::new();

        assert_eq!(run_handlers(&msg, &schema, &mut trace, &mut status), Flow::Continue);
        assert!(status.ok());
        assert_eq!(status.values(), 4);
        assert_eq!(
            trace.events,
            vec!["start", "id=Some(7)", "<inner", "x=Some(-1)", "inner>", "tags=a", "tags=b", "end"]
        );
    }

    #[test]
    fn test_abort_stops_walk() {
        let schema = schema();
        let msg = sample(&schema);
        let mut trace = Trace {
            abort_on: Some(5),
            ..Trace::default()
        };
        let mut status = Status::new();

        // Aborting inside the nested walk unwinds past every outer level.
        let flow = run_handlers(&msg, &schema, &mut trace, &mut status);
        assert_eq!(flow, Flow::Abort);
        assert!(status.aborted());
        assert_eq!(status.abort_field(), Some(5));
        assert_eq!(trace.events, vec!["start", "id=Some(7)", "<inner", "x=Some(-1)"]);
    }

    #[test]
    fn test_skip_submessage() {
        let schema = schema();
        let msg = sample(&schema);
        let mut trace = Trace {
            skip: true,
            ..Trace::default()
        };
        let mut status = Status::new();

        assert_eq!(run_handlers(&msg, &schema, &mut trace, &mut status), Flow::Continue);
        assert!(status.ok());
        assert_eq!(status.skipped(), 1);
        assert_eq!(
            trace.events,
            vec!["start", "id=Some(7)", "<inner", "tags=a", "tags=b", "end"]
        );
    }

    #[test]
    fn test_handler_table_dispatches_registered_fields() {
        let schema = schema();
        let msg = sample(&schema);
        let outer = schema.messages()[0].id();
        let inner = schema.messages()[1].id();

        let mut tags = Vec::new();
        let mut x = None;
        {
            let mut table = HandlerTable::new();
            table
                .on_value(outer, 3, |_, v| {
                    tags.push(v.as_bytes().unwrap_or_default().to_vec());
                    Flow::Continue
                })
                .on_submessage(outer, 2, |_| Flow::Continue)
                .on_value(inner, 5, |_, v| {
                    x = v.as_i64();
                    Flow::Continue
                });
            assert_eq!(table.len(), 3);

            let mut status = Status::new();
            assert_eq!(run_handlers(&msg, &schema, &mut table, &mut status), Flow::Continue);
            // Field 1 of Outer has no closure and is not dispatched.
            assert_eq!(status.values(), 3);
        }
        assert_eq!(tags, vec![b"a".to_vec(), b"b".to_vec()]);
        assert_eq!(x, Some(-1));
    }

    #[test]
    fn test_foreign_message_reports_mismatch() {
        let schema = schema();
        let mut b = SchemaBuilder::new();
        for i in 0..3 {
            b.message(&format!("M{}", i));
        }
        let other = b.build().unwrap();
        let foreign = other.messages()[2].new_message();

        let mut status = Status::new();
        let flow = run_handlers(&foreign, &schema, &mut Trace::default(), &mut status);
        assert_eq!(flow, Flow::Abort);
        assert_eq!(status.error(), Some(Error::TypeMismatch));
    }
}

//! Handler that rebuilds a message from a dispatch walk

use alloc::vec::Vec;

use crate::arena::{Arena, ArenaStats};
use crate::dispatch::{run_handlers, Flow, Handler, Status};
use crate::error::{Error, Result};
use crate::message::{AppendPolicy, Message};
use crate::schema::{FieldDef, Schema};
use crate::value::Value;

/// Appends every dispatched value into a target message
///
/// Submessages are recycled from the target's cached children and strings
/// are stored according to the configured [`AppendPolicy`], so feeding the
/// same sink target repeatedly settles into reusing its storage.
#[derive(Debug)]
pub struct CopySink<'s> {
    schema: &'s Schema,
    root: Message,
    // Fields leading from `root` to the submessage currently being filled.
    path: Vec<&'s FieldDef>,
    arena: Arena,
    policy: AppendPolicy,
    error: Option<Error>,
}

impl<'s> CopySink<'s> {
    /// Sink appending into `target`
    pub fn new(schema: &'s Schema, target: Message) -> Self {
        Self {
            schema,
            root: target,
            path: Vec::new(),
            arena: Arena::new(),
            policy: AppendPolicy::default(),
            error: None,
        }
    }

    /// Use `policy` for string values
    pub fn with_policy(mut self, policy: AppendPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Message built so far
    pub fn message(&self) -> &Message {
        &self.root
    }

    /// Allocation counters for the values copied so far
    pub fn stats(&self) -> ArenaStats {
        self.arena.stats()
    }

    /// Finish and hand back the target
    pub fn into_message(self) -> Message {
        self.root
    }

    /// Same field as seen through this sink's schema
    fn resolve(&self, field: &FieldDef) -> Result<&'s FieldDef> {
        self.schema
            .layout(field.owner())
            .and_then(|layout| layout.fields().get(field.index()))
            .ok_or(Error::TypeMismatch)
    }

    fn begin(&mut self, field: &FieldDef) -> Result<()> {
        let field = self.resolve(field)?;
        let id = field.message_type().ok_or(Error::TypeMismatch)?;
        let child = self.schema.expect_layout(id)?;

        let current = descend(&mut self.root, &self.path)?;
        current.recycle_submessage(field, child, &mut self.arena)?;
        self.path.push(field);
        Ok(())
    }

    fn put(&mut self, field: &FieldDef, value: &Value) -> Result<()> {
        let field = self.resolve(field)?;
        let current = descend(&mut self.root, &self.path)?;
        current.append_with(field, value.clone(), self.policy, &mut self.arena)
    }

    fn fail(&mut self, error: Error) -> Flow {
        if self.error.is_none() {
            self.error = Some(error);
        }
        Flow::Abort
    }
}

fn descend<'m>(root: &'m mut Message, path: &[&FieldDef]) -> Result<&'m mut Message> {
    let mut msg = root;
    for field in path {
        msg = msg.last_submessage_mut(field).ok_or(Error::TypeMismatch)?;
    }
    Ok(msg)
}

impl Handler for CopySink<'_> {
    fn start_message(&mut self) -> Flow {
        self.path.clear();
        self.error = None;
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
        match self.begin(field) {
            Ok(()) => Flow::Continue,
            Err(error) => self.fail(error),
        }
    }

    fn end_submessage(&mut self, _field: &FieldDef) -> Flow {
        self.path.pop();
        Flow::Continue
    }

    fn value(&mut self, field: &FieldDef, value: &Value) -> Flow {
        match self.put(field, value) {
            Ok(()) => Flow::Continue,
            Err(error) => self.fail(error),
        }
    }
}

/// Deep-copy `src` into a fresh message of the same type
///
/// Strings are copied, never shared with `src`.
pub fn copy_message(src: &Message, schema: &Schema) -> Result<Message> {
    let layout = schema.expect_layout(src.message_id())?;
    let mut sink = CopySink::new(schema, layout.new_message());
    let mut status = Status::new();

    if run_handlers(src, schema, &mut sink, &mut status) == Flow::Abort {
        return Err(sink.error.or(status.error()).unwrap_or(Error::TypeMismatch));
    }
    Ok(sink.into_message())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refcount::Shared;
    use crate::schema::{FieldSpec, FieldType, SchemaBuilder};
    use alloc::sync::Arc;

    fn schema() -> Arc<Schema> {
        let mut b = SchemaBuilder::new();
        let tree = b.message("Tree");
        b.field(tree, FieldSpec::new(1, "label", FieldType::String))
            .field(tree, FieldSpec::new(2, "weight", FieldType::SInt32))
            .field(tree, FieldSpec::new(3, "children", FieldType::Message(tree)).repeated())
            .field(tree, FieldSpec::new(4, "first", FieldType::Message(tree)));
        b.build().unwrap()
    }

    fn field(schema: &Schema, number: u32) -> &FieldDef {
        schema.messages()[0].field_by_number(number).unwrap()
    }

    fn sample(schema: &Schema) -> Message {
        let mut root = schema.messages()[0].new_message();
        root.set(field(schema, 1), Value::string(b"root")).unwrap();
        for (label, weight) in [(&b"a"[..], -1), (&b"b"[..], 2)] {
            let child = root.append_message(field(schema, 3), schema).unwrap();
            child.set(field(schema, 1), Value::string(label)).unwrap();
            child.set(field(schema, 2), Value::Int32(weight)).unwrap();
        }
        let first = root.append_message(field(schema, 4), schema).unwrap();
        first.set(field(schema, 2), Value::Int32(9)).unwrap();
        root
    }

    #[test]
    fn test_copy_is_equal_and_unshared() {
        let schema = schema();
        let src = sample(&schema);
        let copy = copy_message(&src, &schema).unwrap();

        assert_eq!(copy, src);
        let (Some(Value::String(a)), Some(Value::String(b))) =
            (src.get(field(&schema, 1)), copy.get(field(&schema, 1)))
        else {
            panic!("label missing");
        };
        assert!(!Shared::ptr_eq(&a, &b));
    }

    #[test]
    fn test_repeated_copies_recycle_target() {
        let schema = schema();
        let src = sample(&schema);

        let mut sink = CopySink::new(&schema, schema.messages()[0].new_message());
        let mut status = Status::new();
        run_handlers(&src, &schema, &mut sink, &mut status);
        let first = sink.stats();

        let mut target = sink.into_message();
        target.clear();
        let mut sink = CopySink::new(&schema, target);
        assert_eq!(run_handlers(&src, &schema, &mut sink, &mut status), Flow::Continue);

        let second = sink.stats();
        assert_eq!(second.allocations(), 0);
        assert_eq!(second.recycled, first.allocations());
        assert_eq!(sink.message(), &src);
    }

    #[test]
    fn test_share_policy_aliases_strings() {
        let schema = schema();
        let src = sample(&schema);

        let mut sink = CopySink::new(&schema, schema.messages()[0].new_message())
            .with_policy(AppendPolicy::ShareSource);
        let mut status = Status::new();
        run_handlers(&src, &schema, &mut sink, &mut status);
        let copy = sink.into_message();

        let (Some(Value::String(a)), Some(Value::String(b))) =
            (src.get(field(&schema, 1)), copy.get(field(&schema, 1)))
        else {
            panic!("label missing");
        };
        assert!(Shared::ptr_eq(&a, &b));
    }
}

//! Schema-described message storage
//!
//! A [`Message`] holds one set bit and one [`Slot`] per field of its layout.
//! Uniquely owned children stay in their slots after the set bit is cleared,
//! so recycling a message and parsing into it again reuses the children as
//! well as the message itself.

use alloc::vec::Vec;

use crate::arena::Arena;
use crate::array::Array;
use crate::error::{Error, Result};
use crate::hasbits::{HasBits, SetBit};
use crate::refcount::{self, Recycle, Shared};
use crate::schema::{FieldDef, MessageId, MessageLayout, Schema};
use crate::string::StrBuf;
use crate::value::{read_slot, Slot, Value, ValueCell, ValueType};

/// Shared handle to a message
pub type MessageRef = Shared<Message>;

/// How [`Message::append_with`] stores a string value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AppendPolicy {
    /// Recycle the destination buffer and copy the bytes in; repeated appends
    /// into the same message stop allocating once buffers are warm
    #[default]
    CopyIntoRecycled,
    /// Take a count on the caller's buffer; no copy, but nothing is reused
    ShareSource,
}

/// One message instance
#[derive(Debug, Clone)]
pub struct Message {
    id: MessageId,
    hasbits: HasBits,
    slots: Vec<Slot>,
}

impl Message {
    /// Allocate an empty message: every field reads as its default
    pub fn new(layout: &MessageLayout) -> Self {
        Self {
            id: layout.id(),
            hasbits: HasBits::new(layout.hasbit_bytes()),
            slots: layout
                .fields()
                .iter()
                .map(|f| Slot::zeroed(f.slot_type()))
                .collect(),
        }
    }

    /// Message type of this instance
    #[inline]
    pub fn message_id(&self) -> MessageId {
        self.id
    }

    /// Whether `field` is explicitly set
    #[inline]
    pub fn has(&self, field: &FieldDef) -> bool {
        field.owner() == self.id && self.hasbits.is_set(field.set_bit())
    }

    /// Number of fields explicitly set
    #[inline]
    pub fn set_count(&self) -> usize {
        self.hasbits.count_set()
    }

    /// Whether no field is set
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.hasbits.is_empty()
    }

    /// Clear every set bit, keeping uniquely owned child objects for reuse
    ///
    /// Children that other owners still reference lose this message's count.
    pub fn clear(&mut self) {
        self.hasbits.clear_all();
        self.slots.iter_mut().for_each(Slot::drop_if_shared);
    }

    /// Clear one field's set bit, keeping its child object for reuse when
    /// uniquely owned
    pub fn clear_field(&mut self, field: &FieldDef) {
        if field.owner() != self.id {
            return;
        }
        self.hasbits.clear(field.set_bit());
        if let Some(slot) = self.slots.get_mut(field.index()) {
            slot.drop_if_shared();
        }
    }

    /// Stored value of a set field; `None` when unset
    pub fn get(&self, field: &FieldDef) -> Option<Value> {
        if !self.has(field) {
            return None;
        }
        self.slots.get(field.index()).and_then(read_slot)
    }

    /// Stored value, or the schema default when unset
    ///
    /// An unset submessage field is materialized from a copy of the schema's
    /// default instance and marked set, so later mutation never reaches the
    /// shared default. An unset repeated field gets an empty array installed
    /// (its set bit stays clear). Scalars and strings return the schema
    /// default without touching the message.
    pub fn get_or_default(&mut self, field: &FieldDef) -> Result<Value> {
        self.check_field(field)?;
        if self.has(field) {
            return self.get(field).ok_or(Error::TypeMismatch);
        }

        match field.slot_type() {
            ValueType::Message => {
                let template = match field.default_value() {
                    Some(Value::Message(template)) => Message::clone(template),
                    _ => return Err(Error::TypeMismatch),
                };
                let value = Value::Message(Shared::new(template));
                self.set(field, value.clone())?;
                Ok(value)
            }
            ValueType::Array => {
                let elem = field.value_type();
                let Some(Slot::Array(slot)) = self.slots.get_mut(field.index()) else {
                    return Err(Error::TypeMismatch);
                };
                refcount::recycle(slot, || Array::new(elem));
                slot.clone().map(Value::Array).ok_or(Error::TypeMismatch)
            }
            ValueType::String => match field.default_value() {
                Some(value @ Value::String(_)) => Ok(value.clone()),
                _ => Ok(Value::string(b"")),
            },
            _ => field.scalar_default().ok_or(Error::TypeMismatch),
        }
    }

    /// Store `value` in `field` and mark it set
    ///
    /// The previous occupant of a pointer slot loses this message's count.
    /// Fails with `TypeMismatch` when the value kind differs from the
    /// field's slot kind (an array for repeated fields) or a submessage is
    /// not of the field's message type.
    pub fn set(&mut self, field: &FieldDef, value: Value) -> Result<()> {
        self.check_field(field)?;
        if !field.accepts(&value) {
            return Err(Error::TypeMismatch);
        }
        let slot = self.slots.get_mut(field.index()).ok_or(Error::TypeMismatch)?;
        let previous = ValueCell::new(slot).write(value)?;
        self.hasbits.set(field.set_bit());
        drop(previous);
        Ok(())
    }

    /// Append to a repeated field, or set a singular one, copying strings
    /// into recycled buffers
    pub fn append(&mut self, field: &FieldDef, value: Value) -> Result<()> {
        let mut arena = Arena::new();
        self.append_with(field, value, AppendPolicy::default(), &mut arena)
    }

    /// [`Message::append`] with an explicit string policy and arena
    pub fn append_with(
        &mut self,
        field: &FieldDef,
        value: Value,
        policy: AppendPolicy,
        arena: &mut Arena,
    ) -> Result<()> {
        self.check_field(field)?;
        if !field.field_type().accepts(&value) {
            return Err(Error::TypeMismatch);
        }

        let (slot, _) = self.append_slot(field, arena)?;
        match (value, policy, slot) {
            (Value::String(src), AppendPolicy::CopyIntoRecycled, Slot::String(dest)) => {
                let bytes = src.as_bytes();
                arena.recycle(dest, StrBuf::new).assign(bytes);
                arena.note_copy(bytes.len());
                Ok(())
            }
            (Value::String(src), AppendPolicy::ShareSource, Slot::String(dest)) => {
                arena.install(dest, src);
                Ok(())
            }
            (value, _, slot) => ValueCell::new(slot).write(value).map(drop),
        }
    }

    /// Submessage to fill in for the next value of a message field
    ///
    /// Repeated fields get a new (possibly recycled) element at the tail;
    /// a set singular field returns its existing child for merging.
    pub fn append_message(&mut self, field: &FieldDef, schema: &Schema) -> Result<&mut Message> {
        let id = field.message_type().ok_or(Error::TypeMismatch)?;
        let child = schema.expect_layout(id)?;
        self.recycle_submessage(field, child, &mut Arena::new())
    }

    /// Array of a set repeated field
    pub fn array(&self, field: &FieldDef) -> Option<&Array> {
        match self.slot(field)? {
            Slot::Array(Some(arr)) => Some(arr),
            _ => None,
        }
    }

    /// Submessage of a set singular message field
    pub fn submessage(&self, field: &FieldDef) -> Option<&Message> {
        match self.slot(field)? {
            Slot::Message(Some(msg)) => Some(msg),
            _ => None,
        }
    }

    /// Bytes of a set singular string field
    pub fn bytes(&self, field: &FieldDef) -> Option<&[u8]> {
        match self.slot(field)? {
            Slot::String(Some(s)) => Some(s.as_bytes()),
            _ => None,
        }
    }

    /// Slot of a set field
    pub(crate) fn slot(&self, field: &FieldDef) -> Option<&Slot> {
        if !self.has(field) {
            return None;
        }
        self.slots.get(field.index())
    }

    /// Write a scalar as the next value of `field`
    pub(crate) fn push_value(
        &mut self,
        field: &FieldDef,
        value: Value,
        arena: &mut Arena,
    ) -> Result<()> {
        let (slot, _) = self.append_slot(field, arena)?;
        ValueCell::new(slot).write(value).map(drop)
    }

    /// Copy `bytes` into the string slot for the next value of `field`
    pub(crate) fn append_bytes(
        &mut self,
        field: &FieldDef,
        bytes: &[u8],
        arena: &mut Arena,
    ) -> Result<()> {
        match self.append_slot(field, arena)? {
            (Slot::String(dest), _) => {
                arena.recycle(dest, StrBuf::new).assign(bytes);
                arena.note_copy(bytes.len());
                Ok(())
            }
            _ => Err(Error::TypeMismatch),
        }
    }

    /// Submessage to parse the next value of `field` into
    ///
    /// Repeated fields get a recycled element at the tail. A singular field
    /// that is already set is returned as is so repeated occurrences merge;
    /// otherwise its cached child is recycled.
    pub(crate) fn recycle_submessage(
        &mut self,
        field: &FieldDef,
        child: &MessageLayout,
        arena: &mut Arena,
    ) -> Result<&mut Message> {
        let repeated = field.is_repeated();
        let (Slot::Message(dest), was_set) = self.append_slot(field, arena)? else {
            return Err(Error::TypeMismatch);
        };
        if was_set && !repeated && dest.is_some() {
            return dest.as_mut().map(Shared::make_mut).ok_or(Error::TypeMismatch);
        }
        Ok(arena.recycle(dest, || Message::new(child)))
    }

    /// Most recently appended (or the singular) submessage of a set field
    pub(crate) fn last_submessage_mut(&mut self, field: &FieldDef) -> Option<&mut Message> {
        if !self.has(field) {
            return None;
        }
        match self.slots.get_mut(field.index())? {
            Slot::Message(Some(msg)) => Some(Shared::make_mut(msg)),
            Slot::Array(Some(arr)) => {
                let arr = Shared::make_mut(arr);
                let last = arr.len().checked_sub(1)?;
                match arr.slot_mut(last)? {
                    Slot::Message(Some(msg)) => Some(Shared::make_mut(msg)),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Mark `field` set and return the slot the next value goes into
    ///
    /// For repeated fields this grows the array (recycling it first if the
    /// field was not set) and returns the new tail element. The flag reports
    /// whether the field was already set.
    fn append_slot(&mut self, field: &FieldDef, arena: &mut Arena) -> Result<(&mut Slot, bool)> {
        self.check_field(field)?;
        let was_set = self.hasbits.is_set(field.set_bit());
        let slot = self.slots.get_mut(field.index()).ok_or(Error::TypeMismatch)?;

        if !field.is_repeated() {
            self.hasbits.set(field.set_bit());
            return Ok((slot, was_set));
        }

        let Slot::Array(arr_slot) = slot else {
            return Err(Error::TypeMismatch);
        };
        if !was_set || arr_slot.is_none() {
            let elem = field.value_type();
            arena.recycle(arr_slot, || Array::new(elem));
        }
        let array = match arr_slot {
            Some(arr) => Shared::make_mut(arr),
            None => return Err(Error::TypeMismatch),
        };
        self.hasbits.set(field.set_bit());

        let index = array.len();
        array.resize(index + 1);
        let elem_slot = array.slot_mut(index).ok_or(Error::TypeMismatch)?;
        Ok((elem_slot, was_set))
    }

    fn check_field(&self, field: &FieldDef) -> Result<()> {
        match self.slots.get(field.index()) {
            Some(slot) if field.owner() == self.id && slot.value_type() == field.slot_type() => {
                Ok(())
            }
            _ => Err(Error::TypeMismatch),
        }
    }
}

impl Recycle for Message {
    fn reset(&mut self) {
        self.clear();
    }
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        if self.id != other.id || self.hasbits != other.hasbits {
            return false;
        }
        // Only set fields take part; unset slots may cache stale children.
        self.slots
            .iter()
            .zip(&other.slots)
            .enumerate()
            .filter(|(index, _)| self.hasbits.is_set(SetBit::for_index(*index)))
            .all(|(_, (a, b))| a == b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refcount::release;
    use crate::schema::{FieldSpec, FieldType, SchemaBuilder};
    use alloc::sync::Arc;

    fn schema() -> Arc<Schema> {
        let mut b = SchemaBuilder::new();
        let person = b.message("Person");
        let address = b.message("Address");
        b.field(person, FieldSpec::new(1, "id", FieldType::Int32))
            .field(person, FieldSpec::new(2, "name", FieldType::String))
            .field(person, FieldSpec::new(3, "address", FieldType::Message(address)))
            .field(person, FieldSpec::new(4, "emails", FieldType::String).repeated())
            .field(
                person,
                FieldSpec::new(5, "score", FieldType::UInt32).optional(Value::UInt32(7)),
            )
            .field(person, FieldSpec::new(6, "friends", FieldType::Message(person)).repeated());
        b.field(address, FieldSpec::new(1, "city", FieldType::String))
            .field(address, FieldSpec::new(2, "zip", FieldType::UInt32));
        b.build().unwrap()
    }

    fn field<'a>(layout: &'a MessageLayout, number: u32) -> &'a FieldDef {
        layout.field_by_number(number).unwrap()
    }

    #[test]
    fn test_new_message_is_empty() {
        let schema = schema();
        let person = schema.message_by_name("Person").unwrap();
        let msg = Message::new(person);

        assert!(msg.is_empty());
        for f in person.fields() {
            assert!(!msg.has(f));
            assert_eq!(msg.get(f), None);
        }
    }

    #[test]
    fn test_set_and_get() {
        let schema = schema();
        let person = schema.message_by_name("Person").unwrap();
        let mut msg = Message::new(person);

        msg.set(field(person, 1), Value::Int32(150)).unwrap();
        msg.set(field(person, 2), Value::string(b"Ada")).unwrap();

        assert_eq!(msg.get(field(person, 1)), Some(Value::Int32(150)));
        assert_eq!(msg.bytes(field(person, 2)), Some(&b"Ada"[..]));
        assert_eq!(msg.set_count(), 2);
    }

    #[test]
    fn test_set_type_mismatch() {
        let schema = schema();
        let person = schema.message_by_name("Person").unwrap();
        let address = schema.message_by_name("Address").unwrap();
        let mut msg = Message::new(person);

        assert_eq!(msg.set(field(person, 1), Value::Int64(1)), Err(Error::TypeMismatch));
        assert_eq!(msg.set(field(person, 4), Value::string(b"x")), Err(Error::TypeMismatch));
        // Field from another message type
        assert_eq!(msg.set(field(address, 2), Value::UInt32(1)), Err(Error::TypeMismatch));
        assert!(msg.is_empty());
    }

    #[test]
    fn test_set_releases_previous_occupant() {
        let schema = schema();
        let person = schema.message_by_name("Person").unwrap();
        let mut msg = Message::new(person);

        let first = Value::string(b"first");
        let Value::String(first_ref) = &first else { unreachable!() };
        let first_ref = first_ref.clone();

        msg.set(field(person, 2), first).unwrap();
        assert_eq!(Shared::ref_count(&first_ref), 2);

        msg.set(field(person, 2), Value::string(b"second")).unwrap();
        assert_eq!(Shared::ref_count(&first_ref), 1);
    }

    #[test]
    fn test_get_or_default_scalars_do_not_mutate() {
        let schema = schema();
        let person = schema.message_by_name("Person").unwrap();
        let mut msg = Message::new(person);

        assert_eq!(msg.get_or_default(field(person, 5)).unwrap(), Value::UInt32(7));
        assert_eq!(msg.get_or_default(field(person, 1)).unwrap(), Value::Int32(0));
        assert_eq!(
            msg.get_or_default(field(person, 2)).unwrap().as_bytes(),
            Some(&b""[..])
        );
        assert!(msg.is_empty());
    }

    #[test]
    fn test_get_or_default_submessage_copies_template() {
        let schema = schema();
        let person = schema.message_by_name("Person").unwrap();
        let address = schema.message_by_name("Address").unwrap();
        let addr_field = field(person, 3);

        let Some(Value::Message(template)) = addr_field.default_value() else {
            panic!("missing template");
        };
        let template_count = Shared::ref_count(template);

        let mut a = Message::new(person);
        let mut b = Message::new(person);
        let va = a.get_or_default(addr_field).unwrap();
        let vb = b.get_or_default(addr_field).unwrap();

        assert!(a.has(addr_field));
        assert!(!Shared::ptr_eq(va.as_message().unwrap(), template));
        assert!(!Shared::ptr_eq(va.as_message().unwrap(), vb.as_message().unwrap()));
        assert_eq!(Shared::ref_count(template), template_count);

        // Mutating the materialized child leaves the template alone.
        drop(va);
        let child = a.recycle_submessage(addr_field, address, &mut Arena::new()).unwrap();
        child.set(field(address, 2), Value::UInt32(94107)).unwrap();
        assert!(template.is_empty());
    }

    #[test]
    fn test_append_repeated_strings() {
        let schema = schema();
        let person = schema.message_by_name("Person").unwrap();
        let emails = field(person, 4);
        let mut msg = Message::new(person);

        let src = Value::string(b"a@example.com");
        msg.append(emails, src.clone()).unwrap();
        msg.append(emails, Value::string(b"b@example.com")).unwrap();

        let arr = msg.array(emails).unwrap();
        assert_eq!(arr.len(), 2);
        assert_eq!(arr.get(0).unwrap().as_bytes(), Some(&b"a@example.com"[..]));
        // Copy policy never aliases the caller's buffer.
        let (Some(Value::String(stored)), Value::String(src)) = (arr.get(0), &src) else {
            panic!("expected strings");
        };
        assert!(!Shared::ptr_eq(&stored, src));
        assert_eq!(Shared::ref_count(src), 1);
    }

    #[test]
    fn test_share_source_policy_aliases() {
        let schema = schema();
        let person = schema.message_by_name("Person").unwrap();
        let emails = field(person, 4);
        let mut msg = Message::new(person);
        let mut arena = Arena::new();

        let src = Value::string(b"shared");
        let Value::String(src_ref) = &src else { unreachable!() };
        let src_ref = src_ref.clone();

        msg.append_with(emails, src, AppendPolicy::ShareSource, &mut arena).unwrap();
        assert_eq!(Shared::ref_count(&src_ref), 2);
        assert_eq!(arena.stats().bytes_copied, 0);

        let mut copy = Message::new(person);
        copy.append_with(emails, Value::String(src_ref.clone()), AppendPolicy::CopyIntoRecycled, &mut arena)
            .unwrap();
        assert_eq!(Shared::ref_count(&src_ref), 2);
        assert_eq!(arena.stats().bytes_copied, 6);
    }

    #[test]
    fn test_recycled_message_reuses_children() {
        let schema = schema();
        let person = schema.message_by_name("Person").unwrap();
        let emails = field(person, 4);
        let mut msg = Message::new(person);
        let mut arena = Arena::new();

        msg.append_bytes(emails, b"one", &mut arena).unwrap();
        msg.append_bytes(emails, b"two", &mut arena).unwrap();
        let first_round = arena.stats();
        assert_eq!(first_round.arrays, 1);
        assert_eq!(first_round.strings, 2);

        msg.reset();
        assert!(msg.is_empty());

        msg.append_bytes(emails, b"three", &mut arena).unwrap();
        msg.append_bytes(emails, b"four", &mut arena).unwrap();
        let second_round = arena.stats();
        assert_eq!(second_round.allocations(), first_round.allocations());
        assert_eq!(second_round.recycled, 3);

        let arr = msg.array(emails).unwrap();
        assert_eq!(arr.len(), 2);
        assert_eq!(arr.get(1).unwrap().as_bytes(), Some(&b"four"[..]));
    }

    #[test]
    fn test_release_cascade_with_shared_child() {
        let schema = schema();
        let person = schema.message_by_name("Person").unwrap();
        let address = schema.message_by_name("Address").unwrap();

        let mut addr = Message::new(address);
        addr.set(field(address, 1), Value::string(b"Paris")).unwrap();
        let addr = Shared::new(addr);

        let mut a = Message::new(person);
        a.set(field(person, 3), Value::Message(addr.clone())).unwrap();
        let mut b = Message::new(person);
        b.set(field(person, 3), Value::Message(addr.clone())).unwrap();
        assert_eq!(Shared::ref_count(&addr), 3);

        assert!(release(Some(Shared::new(a))));
        assert_eq!(Shared::ref_count(&addr), 2);
        assert!(release(Some(Shared::new(b))));
        assert_eq!(Shared::ref_count(&addr), 1);
        assert!(release(Some(addr)));
    }

    #[test]
    fn test_release_cascades_to_grandchildren() {
        let schema = schema();
        let person = schema.message_by_name("Person").unwrap();
        let address = schema.message_by_name("Address").unwrap();

        let city = Value::string(b"Lyon");
        let Value::String(city_ref) = &city else { unreachable!() };
        let city_ref = city_ref.clone();

        let mut friend = Message::new(person);
        let addr = friend.append_message(field(person, 3), &schema).unwrap();
        addr.set(field(address, 1), city).unwrap();

        let mut root = Message::new(person);
        root.set(field(person, 6), Value::Array(Shared::new({
            let mut friends = Array::new(ValueType::Message);
            friends.push(Value::Message(Shared::new(friend))).unwrap();
            friends
        })))
        .unwrap();
        assert_eq!(Shared::ref_count(&city_ref), 2);

        // root -> friends array -> friend -> address -> city
        assert!(release(Some(Shared::new(root))));
        assert_eq!(Shared::ref_count(&city_ref), 1);
    }

    #[test]
    fn test_submessage_kind_must_match_field() {
        let schema = schema();
        let person = schema.message_by_name("Person").unwrap();
        let address = schema.message_by_name("Address").unwrap();
        let mut msg = Message::new(person);

        let stranger = Value::Message(Shared::new(Message::new(person)));
        assert_eq!(msg.set(field(person, 3), stranger.clone()), Err(Error::TypeMismatch));
        assert_eq!(
            msg.append(field(person, 6), Value::Message(Shared::new(Message::new(address)))),
            Err(Error::TypeMismatch)
        );
        let mut wrong = Array::new(ValueType::Message);
        wrong.push(Value::Message(Shared::new(Message::new(address)))).unwrap();
        assert_eq!(
            msg.set(field(person, 6), Value::Array(Shared::new(wrong))),
            Err(Error::TypeMismatch)
        );
        assert_eq!(
            msg.set(field(person, 4), Value::Array(Shared::new(Array::new(ValueType::Int32)))),
            Err(Error::TypeMismatch)
        );
        assert!(msg.is_empty());

        msg.set(field(person, 3), Value::Message(Shared::new(Message::new(address))))
            .unwrap();
        msg.append(field(person, 6), stranger).unwrap();
        assert_eq!(msg.set_count(), 2);
    }

    #[test]
    fn test_singular_submessage_merges() {
        let schema = schema();
        let person = schema.message_by_name("Person").unwrap();
        let address = schema.message_by_name("Address").unwrap();
        let addr_field = field(person, 3);
        let mut msg = Message::new(person);

        msg.append_message(addr_field, &schema)
            .unwrap()
            .set(field(address, 1), Value::string(b"Oslo"))
            .unwrap();
        msg.append_message(addr_field, &schema)
            .unwrap()
            .set(field(address, 2), Value::UInt32(150))
            .unwrap();

        let addr = msg.submessage(addr_field).unwrap();
        assert_eq!(addr.bytes(field(address, 1)), Some(&b"Oslo"[..]));
        assert_eq!(addr.get(field(address, 2)), Some(Value::UInt32(150)));
    }

    #[test]
    fn test_clear_releases_shared_children_only() {
        let schema = schema();
        let person = schema.message_by_name("Person").unwrap();
        let name = field(person, 2);
        let mut msg = Message::new(person);

        let held = Value::string(b"held");
        let Value::String(held_ref) = &held else { unreachable!() };
        let held_ref = held_ref.clone();
        msg.set(name, held).unwrap();
        assert_eq!(Shared::ref_count(&held_ref), 2);

        msg.clear_field(name);
        assert!(!msg.has(name));
        assert_eq!(Shared::ref_count(&held_ref), 1);

        // A uniquely owned buffer is parked for the next parse.
        let mut arena = Arena::new();
        msg.append_bytes(name, b"own", &mut arena).unwrap();
        msg.clear();
        msg.append_bytes(name, b"again", &mut arena).unwrap();
        assert_eq!(arena.stats().strings, 1);
        assert_eq!(arena.stats().recycled, 1);
    }

    #[test]
    fn test_equality_ignores_unset_slots() {
        let schema = schema();
        let person = schema.message_by_name("Person").unwrap();

        let mut a = Message::new(person);
        a.set(field(person, 2), Value::string(b"stale")).unwrap();
        a.clear();
        a.set(field(person, 1), Value::Int32(1)).unwrap();

        let mut b = Message::new(person);
        b.set(field(person, 1), Value::Int32(1)).unwrap();
        assert_eq!(a, b);

        b.set(field(person, 1), Value::Int32(2)).unwrap();
        assert_ne!(a, b);
    }
}

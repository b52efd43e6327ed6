// Copyright 2025 Cowboy AI, LLC.

//! Composite values: shared, identity-comparable attribute containers
//!
//! A composite owns an ordered set of attribute records, an optional
//! prototype link and, for map-like composites, a table of keyed entries.
//! Definitions follow host attribute semantics: a non-reconfigurable
//! record only accepts compatible redefinitions, a non-extensible
//! composite rejects new keys, and writes through immutable data records
//! or reader-only accessors are errors rather than silent no-ops.
//!
//! Borrows are never held across reader/writer calls, so readers may
//! re-enter the composite they belong to.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::errors::{DescriptorError, DescriptorResult};
use crate::record::{AttributeRecord, RecordKind};
use crate::value::{Key, Value};

/// Identity of a composite, usable as a map key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompositeId(usize);

/// Shape of a composite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompositeKind {
    /// Attribute slots only
    #[default]
    Plain,
    /// Keyed-entry container; entries live beside the attribute slots
    Map,
}

struct CompositeData {
    kind: CompositeKind,
    prototype: Option<Composite>,
    attributes: IndexMap<Key, AttributeRecord>,
    entries: IndexMap<String, Value>,
    extensible: bool,
}

/// Shared handle to an attribute container
#[derive(Clone)]
pub struct Composite(Rc<RefCell<CompositeData>>);

impl Default for Composite {
    fn default() -> Self {
        Self::new()
    }
}

impl Composite {
    /// Create an empty plain composite
    pub fn new() -> Self {
        Self::with_parts(CompositeKind::Plain, None)
    }

    /// Create an empty map-like composite
    pub fn new_map() -> Self {
        Self::with_parts(CompositeKind::Map, None)
    }

    /// Create an empty plain composite inheriting from `prototype`
    pub fn with_prototype(prototype: Composite) -> Self {
        Self::with_parts(CompositeKind::Plain, Some(prototype))
    }

    fn with_parts(kind: CompositeKind, prototype: Option<Composite>) -> Self {
        Self(Rc::new(RefCell::new(CompositeData {
            kind,
            prototype,
            attributes: IndexMap::new(),
            entries: IndexMap::new(),
            extensible: true,
        })))
    }

    /// Build a plain composite from name/value pairs using default data records
    pub fn from_pairs<K, I>(pairs: I) -> Self
    where
        K: Into<Key>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self::from_records(pairs.into_iter().map(|(key, value)| (key, AttributeRecord::data(value))))
    }

    /// Build a plain composite holding the given records as-is
    pub fn from_records<K, I>(records: I) -> Self
    where
        K: Into<Key>,
        I: IntoIterator<Item = (K, AttributeRecord)>,
    {
        let composite = Self::new();
        {
            let mut data = composite.0.borrow_mut();
            for (key, record) in records {
                data.attributes.insert(key.into(), record);
            }
        }
        composite
    }

    /// Identity of this composite
    pub fn id(&self) -> CompositeId {
        CompositeId(Rc::as_ptr(&self.0) as *const () as usize)
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &Composite) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Shape of this composite
    pub fn kind(&self) -> CompositeKind {
        self.0.borrow().kind
    }

    /// Prototype link
    pub fn prototype(&self) -> Option<Composite> {
        self.0.borrow().prototype.clone()
    }

    fn read(&self) -> DescriptorResult<std::cell::Ref<'_, CompositeData>> {
        self.0
            .try_borrow()
            .map_err(|_| DescriptorError::Borrow(format!("{self:?} is being modified")))
    }

    fn write(&self) -> DescriptorResult<std::cell::RefMut<'_, CompositeData>> {
        self.0
            .try_borrow_mut()
            .map_err(|_| DescriptorError::Borrow(format!("{self:?} is being read")))
    }

    /// Own attribute record under `key`
    pub fn own_record(&self, key: &Key) -> DescriptorResult<Option<AttributeRecord>> {
        Ok(self.read()?.attributes.get(key).cloned())
    }

    /// Whether `key` is an own attribute
    pub fn has_own(&self, key: &Key) -> bool {
        self.read()
            .map(|data| data.attributes.contains_key(key))
            .unwrap_or(false)
    }

    /// All own keys, hidden ones included, in definition order
    pub fn own_keys(&self) -> DescriptorResult<Vec<Key>> {
        Ok(self.read()?.attributes.keys().cloned().collect())
    }

    /// Own keys whose records are iterable-visible
    pub fn visible_keys(&self) -> DescriptorResult<Vec<Key>> {
        Ok(self
            .read()?
            .attributes
            .iter()
            .filter(|(_, record)| record.iterable_visible)
            .map(|(key, _)| key.clone())
            .collect())
    }

    /// Number of own attributes
    pub fn len(&self) -> usize {
        self.read().map(|data| data.attributes.len()).unwrap_or(0)
    }

    /// Whether there are no own attributes
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Define or redefine an own attribute
    pub fn define(&self, key: impl Into<Key>, record: AttributeRecord) -> DescriptorResult<()> {
        let key = key.into();
        let mut data = self.write()?;
        match data.attributes.get(&key) {
            Some(existing) if !existing.reconfigurable => {
                if !existing.accepts_redefinition(&record) {
                    return Err(DescriptorError::NotReconfigurable {
                        key: key.to_string(),
                    });
                }
            }
            Some(_) => {}
            None if !data.extensible => {
                return Err(DescriptorError::NotExtensible {
                    key: key.to_string(),
                });
            }
            None => {}
        }
        data.attributes.insert(key, record);
        Ok(())
    }

    /// Replace a record without policy checks; only for composites the
    /// caller has just created
    pub(crate) fn overwrite_record(&self, key: Key, record: AttributeRecord) -> DescriptorResult<()> {
        self.write()?.attributes.insert(key, record);
        Ok(())
    }

    /// Remove an own attribute
    pub fn remove(&self, key: &Key) -> DescriptorResult<Option<AttributeRecord>> {
        let mut data = self.write()?;
        if let Some(existing) = data.attributes.get(key) {
            if !existing.reconfigurable {
                return Err(DescriptorError::NotReconfigurable {
                    key: key.to_string(),
                });
            }
        }
        Ok(data.attributes.shift_remove(key))
    }

    /// Find a record on this composite or along its prototype chain
    pub fn lookup(&self, key: &Key) -> DescriptorResult<Option<AttributeRecord>> {
        let mut current = Some(self.clone());
        while let Some(composite) = current {
            let data = composite.read()?;
            if let Some(record) = data.attributes.get(key) {
                return Ok(Some(record.clone()));
            }
            let next = data.prototype.clone();
            drop(data);
            current = next;
        }
        Ok(None)
    }

    /// Read an attribute, invoking its reader if it is an accessor
    pub fn get(&self, key: impl Into<Key>) -> DescriptorResult<Value> {
        let key = key.into();
        match self.lookup(&key)? {
            None => Ok(Value::Undefined),
            Some(record) => match record.kind {
                RecordKind::Data { value, .. } => Ok(value),
                RecordKind::Accessor {
                    reader: Some(reader),
                    ..
                } => reader.call(&Value::Composite(self.clone()), &[]),
                RecordKind::Accessor { reader: None, .. } => Ok(Value::Undefined),
            },
        }
    }

    /// Write an attribute, invoking its writer if it is an accessor
    pub fn set(&self, key: impl Into<Key>, value: Value) -> DescriptorResult<()> {
        let key = key.into();
        let own = self.own_record(&key)?;
        let found = match own {
            Some(record) => Some((record, true)),
            None => self.lookup(&key)?.map(|record| (record, false)),
        };
        match found {
            Some((record, is_own)) => match record.kind {
                RecordKind::Accessor {
                    writer: Some(writer),
                    ..
                } => {
                    writer.call(&Value::Composite(self.clone()), &[value])?;
                    Ok(())
                }
                RecordKind::Accessor { writer: None, .. }
                | RecordKind::Data { mutable: false, .. } => Err(DescriptorError::ReadOnly {
                    key: key.to_string(),
                }),
                RecordKind::Data { mutable: true, .. } if is_own => {
                    let mut data = self.write()?;
                    if let Some(existing) = data.attributes.get_mut(&key) {
                        existing.set_value(value);
                    }
                    Ok(())
                }
                RecordKind::Data { .. } => self.define(key, AttributeRecord::data(value)),
            },
            None => self.define(key, AttributeRecord::data(value)),
        }
    }

    /// Read a keyed entry of a map-like composite
    pub fn map_get(&self, key: &str) -> DescriptorResult<Value> {
        Ok(self.read()?.entries.get(key).cloned().unwrap_or_default())
    }

    /// Write a keyed entry of a map-like composite
    pub fn map_set(&self, key: impl Into<String>, value: Value) -> DescriptorResult<()> {
        self.write()?.entries.insert(key.into(), value);
        Ok(())
    }

    /// Number of keyed entries
    pub fn map_len(&self) -> usize {
        self.read().map(|data| data.entries.len()).unwrap_or(0)
    }

    /// Stop accepting new attributes
    pub fn prevent_extensions(&self) -> DescriptorResult<()> {
        self.write()?.extensible = false;
        Ok(())
    }

    /// Whether new attributes may be added
    pub fn is_extensible(&self) -> bool {
        self.read().map(|data| data.extensible).unwrap_or(false)
    }

    /// Prevent extensions and mark every record non-reconfigurable
    pub fn seal(&self) -> DescriptorResult<()> {
        let mut data = self.write()?;
        data.extensible = false;
        for record in data.attributes.values_mut() {
            record.reconfigurable = false;
        }
        Ok(())
    }

    /// Seal and additionally make every data record immutable
    pub fn freeze(&self) -> DescriptorResult<()> {
        let mut data = self.write()?;
        data.extensible = false;
        for record in data.attributes.values_mut() {
            record.reconfigurable = false;
            if let RecordKind::Data { mutable, .. } = &mut record.kind {
                *mutable = false;
            }
        }
        Ok(())
    }

    /// Whether the composite is sealed
    pub fn is_sealed(&self) -> bool {
        self.read()
            .map(|data| {
                !data.extensible && data.attributes.values().all(|r| !r.reconfigurable)
            })
            .unwrap_or(false)
    }

    /// Whether the composite is frozen
    pub fn is_frozen(&self) -> bool {
        self.read()
            .map(|data| {
                !data.extensible
                    && data.attributes.values().all(|r| {
                        !r.reconfigurable && !matches!(r.kind, RecordKind::Data { mutable: true, .. })
                    })
            })
            .unwrap_or(false)
    }

    /// Fresh, extensible composite with the same kind and prototype and
    /// no attributes; map entries are copied
    pub fn blank_like(&self) -> DescriptorResult<Composite> {
        let data = self.read()?;
        let blank = Self::with_parts(data.kind, data.prototype.clone());
        blank.0.borrow_mut().entries = data.entries.clone();
        Ok(blank)
    }

    /// Fresh composite sharing this one's kind and prototype, populated
    /// with copies of its own records; payloads are shared, not cloned
    pub fn structural_replacement(&self) -> DescriptorResult<Composite> {
        let replacement = self.blank_like()?;
        let attributes = self.read()?.attributes.clone();
        replacement.0.borrow_mut().attributes = attributes;
        Ok(replacement)
    }
}

impl fmt::Debug for Composite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(data) => {
                let keys: Vec<String> = data.attributes.keys().map(Key::to_string).collect();
                write!(f, "Composite#{:x}{:?}", self.id().0, keys)
            }
            Err(_) => write!(f, "Composite#{:x}<busy>", self.id().0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Function;

    #[test]
    fn define_then_get_data_attribute() {
        let c = Composite::new();
        c.define("x", AttributeRecord::data(Value::from(5))).unwrap();
        assert_eq!(c.get("x").unwrap(), Value::from(5));
        assert_eq!(c.get("missing").unwrap(), Value::Undefined);
    }

    #[test]
    fn immutable_data_rejects_writes() {
        let c = Composite::new();
        c.define("x", AttributeRecord::data_with(Value::from(1), false, true, true))
            .unwrap();
        let err = c.set("x", Value::from(2)).unwrap_err();
        assert!(matches!(err, DescriptorError::ReadOnly { .. }));
        assert_eq!(c.get("x").unwrap(), Value::from(1));
    }

    #[test]
    fn reader_only_accessor_rejects_writes() {
        let c = Composite::new();
        let reader = Function::nullary("answer", || Value::from(42));
        c.define("answer", AttributeRecord::accessor(Some(reader), None))
            .unwrap();
        assert!(c.set("answer", Value::from(0)).is_err());
        assert_eq!(c.get("answer").unwrap(), Value::from(42));
    }

    #[test]
    fn non_reconfigurable_records_resist_redefinition() {
        let c = Composite::new();
        c.define("k", AttributeRecord::data_with(Value::from(1), false, false, true))
            .unwrap();
        let err = c.define("k", AttributeRecord::data(Value::from(2))).unwrap_err();
        assert!(matches!(err, DescriptorError::NotReconfigurable { .. }));
        // Identical redefinition is accepted
        c.define("k", AttributeRecord::data_with(Value::from(1), false, false, true))
            .unwrap();
        assert!(c.remove(&Key::from("k")).is_err());
    }

    #[test]
    fn sealed_composite_rejects_new_keys() {
        let c = Composite::from_pairs([("a", Value::from(1))]);
        c.seal().unwrap();
        assert!(c.is_sealed());
        assert!(!c.is_frozen());
        let err = c.define("b", AttributeRecord::data(Value::Null)).unwrap_err();
        assert!(matches!(err, DescriptorError::NotExtensible { .. }));
        // Still mutable after sealing
        c.set("a", Value::from(2)).unwrap();
        assert_eq!(c.get("a").unwrap(), Value::from(2));
    }

    #[test]
    fn frozen_composite_rejects_writes() {
        let c = Composite::from_pairs([("a", Value::from(1))]);
        c.freeze().unwrap();
        assert!(c.is_frozen());
        assert!(c.set("a", Value::from(2)).is_err());
    }

    #[test]
    fn prototype_chain_lookup() {
        let proto = Composite::from_pairs([("greeting", Value::from("hi"))]);
        let child = Composite::with_prototype(proto.clone());
        assert_eq!(child.get("greeting").unwrap(), Value::from("hi"));
        assert!(!child.has_own(&Key::from("greeting")));
        // Writing an inherited mutable slot shadows it
        child.set("greeting", Value::from("yo")).unwrap();
        assert_eq!(child.get("greeting").unwrap(), Value::from("yo"));
        assert_eq!(proto.get("greeting").unwrap(), Value::from("hi"));
    }

    #[test]
    fn reader_may_reenter_its_composite() {
        let c = Composite::from_pairs([("base", Value::from(2))]);
        let doubled = Function::new("doubled", 0, |this, _| {
            let base = this
                .as_composite()
                .map(|c| c.get("base"))
                .transpose()?
                .and_then(|v| v.as_number())
                .unwrap_or(0.0);
            Ok(Value::from(base * 2.0))
        });
        c.define("doubled", AttributeRecord::accessor(Some(doubled), None))
            .unwrap();
        assert_eq!(c.get("doubled").unwrap(), Value::from(4));
    }

    #[test]
    fn structural_replacement_shares_payloads_not_identity() {
        let inner = Composite::new();
        let c = Composite::with_prototype(Composite::new());
        c.define("inner", AttributeRecord::data(inner.clone().into()))
            .unwrap();
        let r = c.structural_replacement().unwrap();
        assert!(!r.ptr_eq(&c));
        assert!(r.prototype().unwrap().ptr_eq(&c.prototype().unwrap()));
        assert_eq!(r.get("inner").unwrap(), Value::Composite(inner));
        let blank = c.blank_like().unwrap();
        assert!(blank.is_empty());
    }

    #[test]
    fn visible_keys_skip_hidden_records() {
        let c = Composite::new();
        c.define("shown", AttributeRecord::data(Value::Null)).unwrap();
        c.define("hidden", AttributeRecord::data_with(Value::Null, true, true, false))
            .unwrap();
        assert_eq!(c.own_keys().unwrap().len(), 2);
        assert_eq!(c.visible_keys().unwrap(), vec![Key::from("shown")]);
    }

    #[test]
    fn map_entries_are_separate_from_attributes() {
        let m = Composite::new_map();
        m.map_set("value", Value::from(3)).unwrap();
        assert_eq!(m.kind(), CompositeKind::Map);
        assert_eq!(m.map_get("value").unwrap(), Value::from(3));
        assert_eq!(m.get("value").unwrap(), Value::Undefined);
        assert_eq!(m.map_len(), 1);
    }
}

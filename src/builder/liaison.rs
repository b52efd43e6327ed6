// Copyright 2025 Cowboy AI, LLC.

//! Liaisons: adapters from a storage container's native get/set to the
//! uniform reader/writer shape of accessor records

use std::fmt;

use crate::composite::{Composite, CompositeKind};
use crate::errors::{DescriptorError, DescriptorResult};
use crate::record::AttributeRecord;
use crate::value::Value;

/// Get/set adapter for accessor storage
pub trait Liaison {
    /// Read `key` from `storage`
    fn get(&self, storage: &Value, key: &str) -> DescriptorResult<Value>;

    /// Write `value` under `key` in `storage`
    fn set(&self, storage: &Value, key: &str, value: Value) -> DescriptorResult<()>;
}

/// Keyed-entry access for map-like composites, plain slot access otherwise
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultLiaison;

impl DefaultLiaison {
    fn container<'a>(storage: &'a Value) -> DescriptorResult<&'a Composite> {
        storage.as_composite().ok_or_else(|| {
            DescriptorError::InvalidDescriptor(format!(
                "accessor storage must be a composite, got {}",
                storage.type_name()
            ))
        })
    }
}

impl Liaison for DefaultLiaison {
    fn get(&self, storage: &Value, key: &str) -> DescriptorResult<Value> {
        let container = Self::container(storage)?;
        match container.kind() {
            CompositeKind::Map => container.map_get(key),
            CompositeKind::Plain => container.get(key),
        }
    }

    fn set(&self, storage: &Value, key: &str, value: Value) -> DescriptorResult<()> {
        let container = Self::container(storage)?;
        match container.kind() {
            CompositeKind::Map => container.map_set(key, value),
            CompositeKind::Plain => container.set(key, value),
        }
    }
}

/// Liaison built from a pair of closures
pub struct FnLiaison<G, S> {
    getter: G,
    setter: S,
}

impl<G, S> FnLiaison<G, S>
where
    G: Fn(&Value, &str) -> DescriptorResult<Value>,
    S: Fn(&Value, &str, Value) -> DescriptorResult<()>,
{
    /// Wrap a getter and a setter
    pub fn new(getter: G, setter: S) -> Self {
        Self { getter, setter }
    }
}

impl<G, S> Liaison for FnLiaison<G, S>
where
    G: Fn(&Value, &str) -> DescriptorResult<Value>,
    S: Fn(&Value, &str, Value) -> DescriptorResult<()>,
{
    fn get(&self, storage: &Value, key: &str) -> DescriptorResult<Value> {
        (self.getter)(storage, key)
    }

    fn set(&self, storage: &Value, key: &str, value: Value) -> DescriptorResult<()> {
        (self.setter)(storage, key, value)
    }
}

impl<G, S> fmt::Debug for FnLiaison<G, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnLiaison")
    }
}

/// Private single-slot storage cell holding `initial` under `key`
pub fn storage_cell(key: &str, initial: Value) -> Composite {
    Composite::from_records([(key, AttributeRecord::data_with(initial, true, true, false))])
}

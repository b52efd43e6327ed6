// Copyright 2025 Cowboy AI, LLC.

//! Accessor record construction
//!
//! The shapes of the first two positional arguments select a strategy:
//!
//! | first | second | strategy |
//! |-------|--------|----------|
//! | nullish/absent | nullish/absent | read-write over a private storage cell |
//! | zero-arity fn | absent | read-only, reader = first |
//! | any | `true` / `false` | initial value in a cell; `false` drops the writer |
//! | non-function | absent | initial value in a read-write cell |
//! | zero-arity fn | one-arity fn | read-write, reader = first, writer = second |
//! | zero-arity fn | anything else | read-only, reader = first |
//! | one-arity fn | one-arity fn | factories, each called once with the storage |
//! | otherwise | | literal reader/writer |
//!
//! Positional slots three to six carry `reconfigurable`, `iterable_visible`,
//! `storage` and `key`. A composite in slot three is read as an options
//! object instead; [`RecordOptions`] arguments override both.

use std::rc::Rc;

use tracing::trace;

use super::args::{ArgShape, RecordArg, RecordOptions, SplitArgs, DEFAULT_STORAGE_KEY};
use super::liaison::{storage_cell, DefaultLiaison, Liaison};
use crate::errors::{DescriptorError, DescriptorResult};
use crate::record::{AttributeRecord, RecordKind};
use crate::value::{Function, StorageBinding, Value};

/// How the accessor's reader and writer are obtained
#[derive(Debug)]
enum Strategy {
    /// Read-write over storage, leaving existing contents alone
    Storage,
    /// Read-only, user reader
    ReadOnly(Function),
    /// Storage seeded with a value; writer only when `writable`
    InitialValue { value: Value, writable: bool },
    /// User reader and writer
    ReadWrite(Function, Function),
    /// Factories producing reader and writer from the storage
    Factories(Function, Function),
    /// Arguments used as-is
    Literal(Value, Value),
}

impl Strategy {
    fn select(args: &SplitArgs) -> Self {
        let first = args.positional.first().cloned().unwrap_or_default();
        let second = args.positional.get(1).cloned().unwrap_or_default();
        let as_fn = |v: &Value| v.as_function().cloned();

        match (args.shape(0), args.shape(1)) {
            (a, b) if a.is_nullish() && b.is_nullish() => Strategy::Storage,
            (ArgShape::ZeroArgFn, ArgShape::Absent) => as_fn(&first).map_or(Strategy::Storage, Strategy::ReadOnly),
            (_, ArgShape::Flag(writable)) => Strategy::InitialValue {
                value: first,
                writable,
            },
            (a, ArgShape::Absent) if !a.is_function() => Strategy::InitialValue {
                value: first,
                writable: true,
            },
            (ArgShape::ZeroArgFn, ArgShape::OneArgFn) => match (as_fn(&first), as_fn(&second)) {
                (Some(reader), Some(writer)) => Strategy::ReadWrite(reader, writer),
                _ => Strategy::Literal(first, second),
            },
            (ArgShape::ZeroArgFn, _) => as_fn(&first).map_or(Strategy::Storage, Strategy::ReadOnly),
            (ArgShape::OneArgFn, ArgShape::OneArgFn) => match (as_fn(&first), as_fn(&second)) {
                (Some(reader), Some(writer)) => Strategy::Factories(reader, writer),
                _ => Strategy::Literal(first, second),
            },
            _ => Strategy::Literal(first, second),
        }
    }
}

/// Storage resolved for one builder call
struct ResolvedStorage {
    storage: Value,
    key: String,
    liaison: Rc<dyn Liaison>,
}

impl ResolvedStorage {
    fn new(options: &RecordOptions) -> Self {
        let key = options
            .key
            .clone()
            .unwrap_or_else(|| DEFAULT_STORAGE_KEY.to_string());
        let storage = options
            .storage
            .clone()
            .unwrap_or_else(|| storage_cell(&key, Value::Undefined).into());
        let liaison = options
            .liaison
            .clone()
            .unwrap_or_else(|| Rc::new(DefaultLiaison));
        Self {
            storage,
            key,
            liaison,
        }
    }

    fn binding(&self) -> StorageBinding {
        StorageBinding {
            storage: self.storage.clone(),
            key: self.key.clone(),
        }
    }

    fn reader(&self) -> Function {
        let (storage, key, liaison) = (self.storage.clone(), self.key.clone(), self.liaison.clone());
        Function::new("get", 0, move |_, _| liaison.get(&storage, &key)).with_binding(self.binding())
    }

    fn writer(&self) -> Function {
        let (storage, key, liaison) = (self.storage.clone(), self.key.clone(), self.liaison.clone());
        Function::new("set", 1, move |_, args| {
            liaison.set(&storage, &key, args.first().cloned().unwrap_or_default())?;
            Ok(Value::Undefined)
        })
        .with_binding(self.binding())
    }

    /// Annotate a user function with this storage, binding the receiver
    /// when requested
    fn attach(&self, function: Function, bind: bool) -> Function {
        let function = if bind {
            function.bound_to(self.storage.clone())
        } else {
            function
        };
        function.with_binding(self.binding())
    }
}

/// Build an accessor record from a flexible argument list
///
/// Fails only when the call names neither a reader, a writer nor anything
/// a storage cell could be built from.
pub fn make_accessor_record<I>(args: I) -> DescriptorResult<AttributeRecord>
where
    I: IntoIterator<Item = RecordArg>,
{
    let mut split = SplitArgs::new(args);
    let options = positional_options(&split);
    let explicit = std::mem::take(&mut split.options);
    let mut resolved = options;
    resolved.merge(explicit);

    let strategy = Strategy::select(&split);
    trace!(?strategy, "building accessor record");
    let bind = resolved.bind.unwrap_or(false);
    let has_storage = resolved.storage.is_some();
    let storage = ResolvedStorage::new(&resolved);

    let (reader, writer) = match strategy {
        Strategy::Storage => (Some(storage.reader()), Some(storage.writer())),
        Strategy::InitialValue { value, writable } => {
            storage.liaison.set(&storage.storage, &storage.key, value)?;
            (Some(storage.reader()), writable.then(|| storage.writer()))
        }
        Strategy::ReadOnly(reader) => (Some(user_function(&storage, reader, bind, has_storage)), None),
        Strategy::ReadWrite(reader, writer) => (
            Some(user_function(&storage, reader, bind, has_storage)),
            Some(user_function(&storage, writer, bind, has_storage)),
        ),
        Strategy::Factories(make_reader, make_writer) => {
            let reader = produce(&make_reader, &storage, 0, "reader")?;
            let writer = produce(&make_writer, &storage, 1, "writer")?;
            (Some(storage.attach(reader, true)), Some(storage.attach(writer, true)))
        }
        Strategy::Literal(first, second) => {
            let reader = first.as_function().cloned();
            let writer = second.as_function().cloned();
            if reader.is_none() && writer.is_none() {
                return Err(DescriptorError::construction(format!(
                    "accessor needs a reader, a writer or storage; got {} and {}",
                    first.type_name(),
                    second.type_name()
                )));
            }
            (
                reader.map(|r| user_function(&storage, r, bind, has_storage)),
                writer.map(|w| user_function(&storage, w, bind, has_storage)),
            )
        }
    };

    Ok(AttributeRecord {
        kind: RecordKind::Accessor { reader, writer },
        reconfigurable: resolved.reconfigurable.unwrap_or(true),
        iterable_visible: resolved.iterable_visible.unwrap_or(true),
    })
}

/// Options carried in positional slots three to six, or in an options
/// composite in slot three
fn positional_options(split: &SplitArgs) -> RecordOptions {
    let storage = split.positional.get(4).filter(|v| !v.is_nullish()).cloned();
    let mut options = RecordOptions {
        reconfigurable: split.flag_at(2),
        iterable_visible: split.flag_at(3),
        storage,
        key: split.positional.get(5).and_then(Value::as_str).map(str::to_string),
        ..RecordOptions::default()
    };
    if let Some(Value::Composite(named)) = split.positional.get(2) {
        trace!("reading options composite from third argument");
        options.merge(RecordOptions::from_composite(named));
    }
    options
}

/// User-supplied functions only get a storage annotation when storage was
/// requested, explicitly or through `bind`
fn user_function(storage: &ResolvedStorage, function: Function, bind: bool, has_storage: bool) -> Function {
    if bind || has_storage {
        storage.attach(function, bind)
    } else {
        function
    }
}

/// Call a factory with the storage and check the arity of what it returns
fn produce(factory: &Function, storage: &ResolvedStorage, arity: usize, role: &str) -> DescriptorResult<Function> {
    let produced = factory.call(&Value::Undefined, std::slice::from_ref(&storage.storage))?;
    match produced {
        Value::Function(f) if f.arity() == arity => Ok(f),
        other => Err(DescriptorError::construction(format!(
            "{role} factory must return a function of arity {arity}, got {}",
            match &other {
                Value::Function(f) => format!("function of arity {}", f.arity()),
                v => v.type_name().to_string(),
            }
        ))),
    }
}

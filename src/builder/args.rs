// Copyright 2025 Cowboy AI, LLC.

//! Builder arguments and their shape classification
//!
//! Builder calls accept a loose list of [`RecordArg`]s. Each argument is
//! classified once into an [`ArgShape`]; the data and accessor builders
//! then pick a construction strategy from the shapes of the leading
//! positional arguments.

use std::fmt;
use std::rc::Rc;

use super::liaison::Liaison;
use crate::classifier::keys;
use crate::composite::Composite;
use crate::value::{Function, Key, Value};

/// Slot name used by storage cells when no key is given
pub const DEFAULT_STORAGE_KEY: &str = "value";

/// Named builder options
///
/// Unset fields fall back to the builder defaults: flags `true`, storage a
/// fresh private cell, key [`DEFAULT_STORAGE_KEY`], no receiver binding and
/// the default liaison.
#[derive(Clone, Default)]
pub struct RecordOptions {
    /// Data records: whether writes are accepted
    pub mutable: Option<bool>,
    /// Whether the record may later be replaced
    pub reconfigurable: Option<bool>,
    /// Whether the slot is enumerable
    pub iterable_visible: Option<bool>,
    /// Accessor records: explicit storage cell or container
    pub storage: Option<Value>,
    /// Accessor records: slot name within the storage
    pub key: Option<String>,
    /// Accessor records: call reader/writer with the storage as receiver
    pub bind: Option<bool>,
    /// Accessor records: get/set adapter for the storage
    pub liaison: Option<Rc<dyn Liaison>>,
}

impl RecordOptions {
    /// Empty options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `mutable`
    pub fn with_mutable(mut self, mutable: bool) -> Self {
        self.mutable = Some(mutable);
        self
    }

    /// Set `reconfigurable`
    pub fn with_reconfigurable(mut self, reconfigurable: bool) -> Self {
        self.reconfigurable = Some(reconfigurable);
        self
    }

    /// Set `iterable_visible`
    pub fn with_iterable_visible(mut self, iterable_visible: bool) -> Self {
        self.iterable_visible = Some(iterable_visible);
        self
    }

    /// Set the storage container
    pub fn with_storage(mut self, storage: impl Into<Value>) -> Self {
        self.storage = Some(storage.into());
        self
    }

    /// Set the slot name within the storage
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Bind the storage as receiver of reader and writer
    pub fn with_bind(mut self, bind: bool) -> Self {
        self.bind = Some(bind);
        self
    }

    /// Override the storage adapter
    pub fn with_liaison(mut self, liaison: Rc<dyn Liaison>) -> Self {
        self.liaison = Some(liaison);
        self
    }

    /// Overlay `other` on top of these options; fields set in `other` win
    pub fn merge(&mut self, other: RecordOptions) {
        macro_rules! overlay {
            ($($field:ident),*) => {
                $(if other.$field.is_some() { self.$field = other.$field; })*
            };
        }
        overlay!(mutable, reconfigurable, iterable_visible, storage, key, bind, liaison);
    }

    /// Read options from a composite's `mutable`, `reconfigurable`,
    /// `iterable_visible`, `storage`, `key` and `bind` attributes
    pub fn from_composite(options: &Composite) -> Self {
        let field = |name: &str| options.get(Key::from(name)).unwrap_or_default();
        let storage = field("storage");
        Self {
            mutable: field(keys::MUTABLE).as_bool(),
            reconfigurable: field(keys::RECONFIGURABLE).as_bool(),
            iterable_visible: field(keys::ITERABLE_VISIBLE).as_bool(),
            storage: (!storage.is_nullish()).then_some(storage),
            key: field("key").as_str().map(str::to_string),
            bind: field("bind").as_bool(),
            liaison: None,
        }
    }
}

impl fmt::Debug for RecordOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordOptions")
            .field("mutable", &self.mutable)
            .field("reconfigurable", &self.reconfigurable)
            .field("iterable_visible", &self.iterable_visible)
            .field("storage", &self.storage)
            .field("key", &self.key)
            .field("bind", &self.bind)
            .field("liaison", &self.liaison.is_some())
            .finish()
    }
}

/// One argument of a builder call
#[derive(Debug, Clone)]
pub enum RecordArg {
    /// Positional value
    Value(Value),
    /// Named options
    Options(RecordOptions),
}

impl From<Value> for RecordArg {
    fn from(value: Value) -> Self {
        RecordArg::Value(value)
    }
}

impl From<RecordOptions> for RecordArg {
    fn from(options: RecordOptions) -> Self {
        RecordArg::Options(options)
    }
}

impl From<Function> for RecordArg {
    fn from(function: Function) -> Self {
        RecordArg::Value(function.into())
    }
}

impl From<Composite> for RecordArg {
    fn from(composite: Composite) -> Self {
        RecordArg::Value(composite.into())
    }
}

impl From<bool> for RecordArg {
    fn from(flag: bool) -> Self {
        RecordArg::Value(flag.into())
    }
}

impl From<i32> for RecordArg {
    fn from(n: i32) -> Self {
        RecordArg::Value(n.into())
    }
}

impl From<f64> for RecordArg {
    fn from(n: f64) -> Self {
        RecordArg::Value(n.into())
    }
}

impl From<&str> for RecordArg {
    fn from(s: &str) -> Self {
        RecordArg::Value(s.into())
    }
}

/// Shape of a positional argument as seen by overload resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgShape {
    /// Argument not supplied
    Absent,
    /// Undefined or null
    Nullish,
    /// Function of arity zero
    ZeroArgFn,
    /// Function of arity one
    OneArgFn,
    /// Function of any other arity
    OtherFn,
    /// Literal boolean
    Flag(bool),
    /// Any other value
    Plain,
}

impl ArgShape {
    /// Classify an optional positional argument
    pub fn of(arg: Option<&Value>) -> Self {
        match arg {
            None => ArgShape::Absent,
            Some(value) if value.is_nullish() => ArgShape::Nullish,
            Some(Value::Function(f)) => match f.arity() {
                0 => ArgShape::ZeroArgFn,
                1 => ArgShape::OneArgFn,
                _ => ArgShape::OtherFn,
            },
            Some(Value::Bool(flag)) => ArgShape::Flag(*flag),
            Some(_) => ArgShape::Plain,
        }
    }

    /// Absent or nullish
    pub fn is_nullish(&self) -> bool {
        matches!(self, ArgShape::Absent | ArgShape::Nullish)
    }

    /// Any function shape
    pub fn is_function(&self) -> bool {
        matches!(self, ArgShape::ZeroArgFn | ArgShape::OneArgFn | ArgShape::OtherFn)
    }
}

/// Positional values and merged options of a builder call
///
/// Trailing `Undefined` positionals are dropped, matching a call that
/// simply omitted them.
#[derive(Debug, Default)]
pub(crate) struct SplitArgs {
    pub positional: Vec<Value>,
    pub options: RecordOptions,
}

impl SplitArgs {
    pub fn new<I>(args: I) -> Self
    where
        I: IntoIterator<Item = RecordArg>,
    {
        let mut split = SplitArgs::default();
        for arg in args {
            match arg {
                RecordArg::Value(value) => split.positional.push(value),
                RecordArg::Options(options) => split.options.merge(options),
            }
        }
        while matches!(split.positional.last(), Some(Value::Undefined)) {
            split.positional.pop();
        }
        split
    }

    pub fn shape(&self, index: usize) -> ArgShape {
        ArgShape::of(self.positional.get(index))
    }

    pub fn flag_at(&self, index: usize) -> Option<bool> {
        self.positional.get(index).and_then(Value::as_bool)
    }
}

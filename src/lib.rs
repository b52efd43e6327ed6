// Copyright 2025 Cowboy AI, LLC.

//! # CIM Descriptor
//!
//! Attribute descriptors for the Composable Information Machine.
//!
//! An attribute of a composite is described by an [`AttributeRecord`]:
//! either a data record (a payload plus `mutable`) or an accessor record
//! (a reader and/or writer), both carrying `reconfigurable` and
//! `iterable_visible`. This crate provides:
//!
//! - **Classifier**: score whether an arbitrary value is shaped like a
//!   record, and which kind ([`classify`], [`is_descriptor`])
//! - **Record Builder**: build data and accessor records from flexible
//!   argument lists, including storage-backed accessors
//!   ([`make_data_record`], [`make_accessor_record`])
//! - **Visibility Scopes**: six fixed policy presets ([`VisibilityScope`],
//!   [`scope`])
//! - **Property Handlers**: per-key interceptors that rewrite records while
//!   they are copied ([`PropertyHandler`], [`ScopeCascadeHandler`])
//! - **Composition Engine**: cycle-safe shallow and deep merging of
//!   attribute records ([`compose_into`], [`shallow_copy`], [`deep_copy`])
//!
//! ## Design Principles
//!
//! 1. **Explicit policy**: read-only and locked attributes fail loudly on
//!    write, never silently
//! 2. **Identity**: composites and functions compare by identity
//! 3. **Recoverable merges**: composition logs and skips what it cannot
//!    copy and always returns its destination
//!
//! ```
//! use cim_descriptor::{make_data_record, Composite, Composer, RecordArg, Value};
//!
//! let source = Composite::new();
//! source.define("x", make_data_record([RecordArg::from(5)])).unwrap();
//!
//! let result = Composer::deep().compose(&[source.into()]);
//! assert_eq!(result.get("x").unwrap(), Value::from(5));
//! ```

#![warn(missing_docs)]

pub mod builder;
pub mod classifier;
pub mod composite;
pub mod composition;
pub mod errors;
pub mod handler;
pub mod record;
pub mod scope;
pub mod value;

pub use builder::{
    make_accessor_record, make_data_record, storage_cell, ArgShape, DefaultLiaison, FnLiaison, Liaison,
    RecordArg, RecordOptions, DEFAULT_STORAGE_KEY,
};
pub use classifier::{classify, classify_record, is_descriptor, ClassificationResult};
pub use composite::{Composite, CompositeId, CompositeKind};
pub use composition::{compose_into, deep_copy, shallow_copy, ComposeConfig, Composer, VisitedSet};
pub use errors::{DescriptorError, DescriptorResult};
pub use handler::{FlowDirective, FnHandler, HandlerResponse, HandlerSet, PropertyHandler, ScopeCascadeHandler};
pub use record::{AttributeRecord, RecordKind};
pub use scope::{scope, ScopeOverrides, VisibilityScope};
pub use value::{Function, Key, StorageBinding, Value};

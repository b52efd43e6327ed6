// Copyright 2025 Cowboy AI, LLC.

//! Property handler protocol
//!
//! Handlers intercept attributes while the composition engine merges them
//! into a destination. A handler receives the current record and answers
//! with a replacement record plus a [`FlowDirective`] telling the engine
//! whether to walk into the rewritten payload or to stop the handler chain
//! for this key.

pub mod scope_cascade;

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::composite::Composite;
use crate::errors::DescriptorResult;
use crate::record::AttributeRecord;
use crate::scope::VisibilityScope;
use crate::value::Key;

pub use scope_cascade::ScopeCascadeHandler;

/// Handler instruction to the composition engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FlowDirective {
    /// Use the record and carry on
    #[default]
    NoChange,
    /// Use the record, then apply this handler to the attributes of its
    /// composite payload
    ContinueDeeper,
    /// Use the record and skip the remaining handlers for this key
    BreakOut,
}

/// Handler answer
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerResponse {
    /// Replacement record; `None` keeps the current one
    pub new_record: Option<AttributeRecord>,
    /// What the engine does next
    pub flow: FlowDirective,
}

impl HandlerResponse {
    /// Replacement record with a directive
    pub fn new(new_record: AttributeRecord, flow: FlowDirective) -> Self {
        Self {
            new_record: Some(new_record),
            flow,
        }
    }

    /// Replacement record, no further processing
    pub fn unchanged(record: AttributeRecord) -> Self {
        Self::new(record, FlowDirective::NoChange)
    }

    /// No replacement at all
    pub fn empty() -> Self {
        Self {
            new_record: None,
            flow: FlowDirective::NoChange,
        }
    }
}

/// Attribute interceptor consulted by the composition engine
#[cfg_attr(test, mockall::automock)]
pub trait PropertyHandler {
    /// Rewrite the record for `key` being copied from `source` into
    /// `destination`. Errors are logged by the engine and the record is
    /// kept as it was.
    fn handle(
        &self,
        key: &Key,
        record: &AttributeRecord,
        destination: &Composite,
        source: &Composite,
    ) -> DescriptorResult<HandlerResponse>;
}

/// Handler wrapping a closure
pub struct FnHandler<F> {
    handler: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&Key, &AttributeRecord, &Composite, &Composite) -> DescriptorResult<HandlerResponse>,
{
    /// Wrap a closure
    pub fn new(handler: F) -> Self {
        Self { handler }
    }
}

impl<F> PropertyHandler for FnHandler<F>
where
    F: Fn(&Key, &AttributeRecord, &Composite, &Composite) -> DescriptorResult<HandlerResponse>,
{
    fn handle(
        &self,
        key: &Key,
        record: &AttributeRecord,
        destination: &Composite,
        source: &Composite,
    ) -> DescriptorResult<HandlerResponse> {
        (self.handler)(key, record, destination, source)
    }
}

/// Handlers registered per key, run in registration order
#[derive(Clone, Default)]
pub struct HandlerSet {
    handlers: IndexMap<Key, Vec<Rc<dyn PropertyHandler>>>,
}

impl HandlerSet {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// One scope cascade handler per visibility scope, keyed by the
    /// scope's own token
    pub fn visibility_defaults() -> Self {
        VisibilityScope::ALL
            .into_iter()
            .fold(Self::new(), |set, scope| set.with(scope, ScopeCascadeHandler::new(scope)))
    }

    /// Append a handler for `key`
    pub fn register(&mut self, key: impl Into<Key>, handler: Rc<dyn PropertyHandler>) {
        self.handlers.entry(key.into()).or_default().push(handler);
    }

    /// Builder-style [`register`](Self::register)
    pub fn with(mut self, key: impl Into<Key>, handler: impl PropertyHandler + 'static) -> Self {
        self.register(key, Rc::new(handler));
        self
    }

    /// Handlers for `key`, in registration order
    pub fn handlers_for(&self, key: &Key) -> &[Rc<dyn PropertyHandler>] {
        self.handlers.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Append every handler of `other`
    pub fn extend(&mut self, other: &HandlerSet) {
        for (key, handlers) in &other.handlers {
            self.handlers
                .entry(key.clone())
                .or_default()
                .extend(handlers.iter().cloned());
        }
    }

    /// Keys with at least one handler
    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.handlers.keys()
    }

    /// Number of keys with handlers
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no handler is registered
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for HandlerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.handlers.iter().map(|(k, v)| (k.to_string(), v.len())))
            .finish()
    }
}

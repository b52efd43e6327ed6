// Copyright 2025 Cowboy AI, LLC.

//! Scope cascade handler: push a visibility scope through a whole subtree
//!
//! The attribute's own record is always rewritten, data and accessor shapes
//! alike: it takes the scope's `reconfigurable` and `iterable_visible`, and
//! the flexible scopes also force a data record's `mutable` to true.
//!
//! Primitive payloads just take the scope's flags. A composite payload is
//! replaced by an independent clone whose every attribute, transitively,
//! carries the scope's flags; the handler then asks the engine to continue
//! into the clone. The clone walk keeps its own identity map, so cyclic
//! payloads are cloned into cyclic clones, and stops at a depth limit.
//! Subtrees already carrying the scope are left alone, which makes the
//! handler idempotent under the engine's continue-deeper pass.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::{FlowDirective, HandlerResponse, PropertyHandler};
use crate::composite::{Composite, CompositeId};
use crate::errors::DescriptorResult;
use crate::record::AttributeRecord;
use crate::scope::VisibilityScope;
use crate::value::{Key, Value};

/// Default bound on the clone walk
pub const DEFAULT_CASCADE_DEPTH: usize = 64;

/// Handler bound to one visibility scope
///
/// Every record it sees is rewritten with the scope's flags; under
/// `FlexibleHidden` and `FlexibleVisible` data records also become mutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeCascadeHandler {
    scope: VisibilityScope,
    depth_limit: usize,
}

impl ScopeCascadeHandler {
    /// Handler for `scope` with the default depth limit
    pub fn new(scope: VisibilityScope) -> Self {
        Self {
            scope,
            depth_limit: DEFAULT_CASCADE_DEPTH,
        }
    }

    /// Override the clone walk depth limit
    pub fn with_depth_limit(mut self, depth_limit: usize) -> Self {
        self.depth_limit = depth_limit.max(1);
        self
    }

    /// Scope this handler applies
    pub fn scope(&self) -> VisibilityScope {
        self.scope
    }

    /// Whether every record reachable from `root` already carries the scope
    fn is_scoped(&self, root: &Composite) -> DescriptorResult<bool> {
        let mut seen = HashSet::new();
        let mut pending = vec![root.clone()];
        while let Some(current) = pending.pop() {
            if !seen.insert(current.id()) {
                continue;
            }
            for key in current.own_keys()? {
                let Some(record) = current.own_record(&key)? else {
                    continue;
                };
                if !record.matches_scope(self.scope) {
                    return Ok(false);
                }
                if let Some(nested) = record.payload_composite() {
                    pending.push(nested);
                }
            }
        }
        Ok(true)
    }

    fn cascade_clone(
        &self,
        original: &Composite,
        depth: usize,
        clones: &mut HashMap<CompositeId, Composite>,
    ) -> DescriptorResult<Composite> {
        if let Some(existing) = clones.get(&original.id()) {
            return Ok(existing.clone());
        }
        let clone = original.structural_replacement()?;
        clones.insert(original.id(), clone.clone());

        for key in clone.own_keys()? {
            let Some(record) = clone.own_record(&key)? else {
                continue;
            };
            let mut scoped = record.with_scope(self.scope);
            if let Some(nested) = record.payload_composite() {
                if depth + 1 < self.depth_limit {
                    let nested_clone = self.cascade_clone(&nested, depth + 1, clones)?;
                    scoped.set_value(Value::Composite(nested_clone));
                } else {
                    debug!(scope = %self.scope, %key, "cascade depth limit reached, payload left shared");
                }
            }
            clone.overwrite_record(key, scoped)?;
        }
        Ok(clone)
    }
}

impl PropertyHandler for ScopeCascadeHandler {
    fn handle(
        &self,
        key: &Key,
        record: &AttributeRecord,
        _destination: &Composite,
        _source: &Composite,
    ) -> DescriptorResult<HandlerResponse> {
        let scoped = record.with_scope(self.scope);
        let Some(payload) = record.payload_composite() else {
            return Ok(HandlerResponse::unchanged(scoped));
        };
        if self.is_scoped(&payload)? {
            return Ok(HandlerResponse::unchanged(scoped));
        }

        debug!(scope = %self.scope, %key, "cascading scope into payload");
        let mut clones = HashMap::new();
        let clone = self.cascade_clone(&payload, 0, &mut clones)?;
        let mut rewritten = scoped;
        rewritten.set_value(Value::Composite(clone));
        Ok(HandlerResponse::new(rewritten, FlowDirective::ContinueDeeper))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Function;

    fn handle(handler: &ScopeCascadeHandler, record: &AttributeRecord) -> HandlerResponse {
        handler
            .handle(&Key::from("k"), record, &Composite::new(), &Composite::new())
            .unwrap()
    }

    #[test]
    fn primitive_payload_takes_scope_flags() {
        let handler = ScopeCascadeHandler::new(VisibilityScope::ImmutableHidden);
        let response = handle(&handler, &AttributeRecord::data(Value::from(1)));
        assert_eq!(response.flow, FlowDirective::NoChange);
        let record = response.new_record.unwrap();
        assert!(!record.reconfigurable && !record.iterable_visible);
    }

    #[test]
    fn flexible_scope_forces_mutable_on_data() {
        let frozen = AttributeRecord::data_with(Value::from(1), false, true, true);
        for scope in [VisibilityScope::FlexibleHidden, VisibilityScope::FlexibleVisible] {
            let record = handle(&ScopeCascadeHandler::new(scope), &frozen).new_record.unwrap();
            assert_eq!(record.mutable(), Some(true));
            assert!(!record.reconfigurable);
        }

        let record = handle(&ScopeCascadeHandler::new(VisibilityScope::ImmutableVisible), &frozen)
            .new_record
            .unwrap();
        assert_eq!(record.mutable(), Some(false));
    }

    #[test]
    fn accessor_takes_scope_flags() {
        let handler = ScopeCascadeHandler::new(VisibilityScope::MutableHidden);
        let reader = Function::nullary("r", || Value::Null);
        let response = handle(&handler, &AttributeRecord::accessor(Some(reader), None));
        let record = response.new_record.unwrap();
        assert!(record.reconfigurable && !record.iterable_visible);
        assert!(record.is_accessor());
    }

    #[test]
    fn composite_payload_is_cloned_and_scoped_transitively() {
        let inner = Composite::from_pairs([("deep", Value::from(1))]);
        let payload = Composite::from_pairs([("p", Value::from(1)), ("inner", inner.clone().into())]);
        let handler = ScopeCascadeHandler::new(VisibilityScope::ImmutableHidden);
        let response = handle(&handler, &AttributeRecord::data(payload.clone().into()));
        assert_eq!(response.flow, FlowDirective::ContinueDeeper);

        let clone = response.new_record.unwrap().payload_composite().unwrap();
        assert!(!clone.ptr_eq(&payload));
        let p = clone.own_record(&Key::from("p")).unwrap().unwrap();
        assert!(!p.reconfigurable && !p.iterable_visible);

        let inner_clone = clone.own_record(&Key::from("inner")).unwrap().unwrap().payload_composite().unwrap();
        assert!(!inner_clone.ptr_eq(&inner));
        let deep = inner_clone.own_record(&Key::from("deep")).unwrap().unwrap();
        assert!(!deep.iterable_visible);

        // Originals untouched
        assert!(payload.own_record(&Key::from("p")).unwrap().unwrap().iterable_visible);
        assert!(inner.own_record(&Key::from("deep")).unwrap().unwrap().iterable_visible);
    }

    #[test]
    fn cyclic_payload_clones_into_cycle() {
        let payload = Composite::new();
        payload.define("me", AttributeRecord::data(payload.clone().into())).unwrap();
        let handler = ScopeCascadeHandler::new(VisibilityScope::FlexibleVisible);
        let response = handle(&handler, &AttributeRecord::data(payload.clone().into()));
        let clone = response.new_record.unwrap().payload_composite().unwrap();
        let me = clone.own_record(&Key::from("me")).unwrap().unwrap().payload_composite().unwrap();
        assert!(me.ptr_eq(&clone));
        // Break the cycles so the test does not leak
        payload.remove(&Key::from("me")).unwrap();
        clone.overwrite_record(Key::from("me"), AttributeRecord::data(Value::Null)).unwrap();
    }

    #[test]
    fn already_scoped_payload_is_left_alone() {
        let handler = ScopeCascadeHandler::new(VisibilityScope::ImmutableHidden);
        let first = handle(&handler, &AttributeRecord::data(Composite::from_pairs([("p", Value::from(1))]).into()));
        let scoped = first.new_record.unwrap();
        let again = handle(&handler, &scoped);
        assert_eq!(again.flow, FlowDirective::NoChange);
        assert_eq!(again.new_record.unwrap().value(), scoped.value());
    }

    #[test]
    fn depth_limit_leaves_deep_payloads_shared() {
        let leaf = Composite::from_pairs([("x", Value::from(1))]);
        let payload = Composite::from_pairs([("leaf", leaf.clone().into())]);
        let handler = ScopeCascadeHandler::new(VisibilityScope::MutableHidden).with_depth_limit(1);
        let response = handle(&handler, &AttributeRecord::data(payload.into()));
        let clone = response.new_record.unwrap().payload_composite().unwrap();
        let kept = clone.own_record(&Key::from("leaf")).unwrap().unwrap().payload_composite().unwrap();
        assert!(kept.ptr_eq(&leaf));
    }
}

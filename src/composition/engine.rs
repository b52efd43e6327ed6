// Copyright 2025 Cowboy AI, LLC.

//! Composition engine: merge the attributes of source composites into a
//! destination
//!
//! Sources are processed left to right and later sources overwrite
//! earlier ones key by key. Composite payloads are replaced by fresh
//! structural copies; in deep mode each copy is itself filled by the same
//! merge, sharing one [`VisitedSet`] for the whole call. A payload that was
//! already processed resolves to its replacement, so shared substructure
//! collapses to one copy. A reference to the source currently being merged
//! points back to the destination. An earlier top-level source met later as
//! a payload is copied like any other payload, never linked to the
//! destination.
//!
//! Nothing here aborts a merge: unreadable attributes, failing handlers and
//! refused installs are logged and the key is skipped.

use std::collections::HashSet;
use std::rc::Rc;

use tracing::{debug, trace, warn};

use super::config::ComposeConfig;
use super::visited::VisitedSet;
use crate::composite::{Composite, CompositeId};
use crate::errors::DescriptorResult;
use crate::handler::{FlowDirective, HandlerSet, PropertyHandler, ScopeCascadeHandler};
use crate::record::AttributeRecord;
use crate::scope::VisibilityScope;
use crate::value::{Key, Value};

/// Configured composition engine
#[derive(Debug, Clone, Default)]
pub struct Composer {
    config: ComposeConfig,
    handlers: HandlerSet,
}

impl Composer {
    /// Engine with validated settings and no handlers
    pub fn new(config: ComposeConfig) -> DescriptorResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            handlers: HandlerSet::new(),
        })
    }

    /// One-level engine, no handlers
    pub fn shallow() -> Self {
        Self::default()
    }

    /// Recursive engine, no handlers
    pub fn deep() -> Self {
        Self {
            config: ComposeConfig::deep(),
            handlers: HandlerSet::new(),
        }
    }

    /// Replace the handler set
    pub fn with_handlers(mut self, handlers: HandlerSet) -> Self {
        self.handlers = handlers;
        self
    }

    /// Add one scope cascade handler per visibility scope, keyed by the
    /// scope token and bounded by the configured cascade depth
    pub fn with_visibility_defaults(mut self) -> Self {
        for scope in VisibilityScope::ALL {
            let handler = ScopeCascadeHandler::new(scope).with_depth_limit(self.config.cascade_depth_limit);
            self.handlers.register(scope, Rc::new(handler));
        }
        self
    }

    /// Settings in use
    pub fn config(&self) -> &ComposeConfig {
        &self.config
    }

    /// Handlers in use
    pub fn handlers(&self) -> &HandlerSet {
        &self.handlers
    }

    /// Merge `sources` into a fresh composite
    pub fn compose(&self, sources: &[Value]) -> Composite {
        self.compose_into(&Composite::new(), sources)
    }

    /// Merge `sources` into `destination` and return it
    pub fn compose_into(&self, destination: &Composite, sources: &[Value]) -> Composite {
        let mut visited = VisitedSet::new();
        for (index, source) in sources.iter().enumerate() {
            let Some(source) = source.as_composite() else {
                debug!(index, kind = source.type_name(), "source is not a composite, skipped");
                continue;
            };
            if !visited.begin_source(source, destination) {
                debug!(index, ?source, "source already merged, skipped");
                continue;
            }
            self.merge_source(destination, source, &mut visited);
        }
        destination.clone()
    }

    fn merge_source(&self, destination: &Composite, source: &Composite, visited: &mut VisitedSet) {
        let keys = match source.own_keys() {
            Ok(keys) => keys,
            Err(err) => {
                warn!(?source, %err, "source attributes unreadable, source skipped");
                return;
            }
        };

        for key in keys {
            let record = match source.own_record(&key) {
                Ok(Some(record)) => record,
                Ok(None) => continue,
                Err(err) => {
                    warn!(%key, %err, "source attribute unreadable, key skipped");
                    continue;
                }
            };
            if !self.config.include_hidden && !record.iterable_visible {
                debug!(%key, "hidden attribute skipped");
                continue;
            }

            let record = self.replace_payload(record, visited);
            let record = self.apply_handlers(&key, record, destination, source);
            install(destination, key, record);
        }
    }

    /// Swap a composite payload for its replacement in the result
    fn replace_payload(&self, mut record: AttributeRecord, visited: &mut VisitedSet) -> AttributeRecord {
        let Some(payload) = record.payload_composite() else {
            return record;
        };
        if let Some(existing) = visited.replacement_for(&payload) {
            trace!(?payload, "payload already replaced, linking");
            record.set_value(Value::Composite(existing));
            return record;
        }

        let replacement = if self.config.deep {
            payload.blank_like()
        } else {
            payload.structural_replacement()
        };
        let replacement = match replacement {
            Ok(replacement) => replacement,
            Err(err) => {
                warn!(?payload, %err, "payload could not be copied, left shared");
                return record;
            }
        };
        visited.insert(&payload, &replacement);
        if self.config.deep {
            self.merge_source(&replacement, &payload, visited);
        }
        record.set_value(Value::Composite(replacement));
        record
    }

    /// Run the handlers registered for `key` in order
    fn apply_handlers(
        &self,
        key: &Key,
        record: AttributeRecord,
        destination: &Composite,
        source: &Composite,
    ) -> AttributeRecord {
        let mut current = record;
        for handler in self.handlers.handlers_for(key) {
            let response = match handler.handle(key, &current, destination, source) {
                Ok(response) => response,
                Err(err) => {
                    warn!(%key, %err, "property handler failed, record kept");
                    continue;
                }
            };
            match response.new_record {
                Some(next) => current = next,
                None => debug!(%key, "handler returned no record, record kept"),
            }
            match response.flow {
                FlowDirective::NoChange => {}
                FlowDirective::ContinueDeeper => {
                    if let Some(payload) = current.payload_composite() {
                        debug!(%key, "continuing handler into payload");
                        self.cascade(&**handler, &payload, 0, &mut HashSet::new());
                    }
                }
                FlowDirective::BreakOut => {
                    debug!(%key, "handler chain stopped");
                    break;
                }
            }
        }
        current
    }

    /// Apply one handler to every own attribute of `container`, following
    /// further continue-deeper answers
    ///
    /// Only the handler that answered `ContinueDeeper` is reapplied; nested
    /// keys are not looked up in the handler set, so handlers registered for
    /// them do not run during the cascade.
    fn cascade(
        &self,
        handler: &dyn PropertyHandler,
        container: &Composite,
        depth: usize,
        seen: &mut HashSet<CompositeId>,
    ) {
        if depth >= self.config.cascade_depth_limit {
            debug!(?container, depth, "cascade depth limit reached");
            return;
        }
        if !seen.insert(container.id()) {
            return;
        }
        let keys = match container.own_keys() {
            Ok(keys) => keys,
            Err(err) => {
                warn!(?container, %err, "payload attributes unreadable, cascade skipped");
                return;
            }
        };

        for key in keys {
            let record = match container.own_record(&key) {
                Ok(Some(record)) => record,
                Ok(None) => continue,
                Err(err) => {
                    warn!(%key, %err, "payload attribute unreadable, key skipped");
                    continue;
                }
            };
            let response = match handler.handle(&key, &record, container, container) {
                Ok(response) => response,
                Err(err) => {
                    warn!(%key, %err, "property handler failed in cascade, record kept");
                    continue;
                }
            };
            let next = response.new_record.unwrap_or(record);
            let nested = match response.flow {
                FlowDirective::ContinueDeeper => next.payload_composite(),
                _ => None,
            };
            install(container, key, next);
            if let Some(nested) = nested {
                self.cascade(handler, &nested, depth + 1, seen);
            }
        }
    }
}

fn install(destination: &Composite, key: Key, record: AttributeRecord) {
    let label = key.to_string();
    match destination.define(key, record) {
        Ok(()) => trace!(key = %label, "attribute installed"),
        Err(err) => warn!(key = %label, %err, "install on destination failed, key skipped"),
    }
}

/// Merge `sources` into `destination` with an explicit handler set
pub fn compose_into(
    deep: bool,
    destination: &Composite,
    sources: &[Value],
    handlers: Option<&HandlerSet>,
) -> Composite {
    let composer = Composer {
        config: ComposeConfig {
            deep,
            ..ComposeConfig::default()
        },
        handlers: handlers.cloned().unwrap_or_default(),
    };
    composer.compose_into(destination, sources)
}

/// One-level merge with the visibility scope handlers
pub fn shallow_copy(destination: &Composite, sources: &[Value]) -> Composite {
    Composer::shallow()
        .with_visibility_defaults()
        .compose_into(destination, sources)
}

/// Recursive merge with the visibility scope handlers
pub fn deep_copy(destination: &Composite, sources: &[Value]) -> Composite {
    Composer::deep()
        .with_visibility_defaults()
        .compose_into(destination, sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DescriptorError;
    use crate::handler::{FnHandler, HandlerResponse, MockPropertyHandler};
    use pretty_assertions::assert_eq;

    fn get(composite: &Composite, key: &str) -> Value {
        composite.get(key).unwrap()
    }

    fn payload(composite: &Composite, key: &str) -> Composite {
        composite
            .own_record(&Key::from(key))
            .unwrap()
            .and_then(|record| record.payload_composite())
            .unwrap()
    }

    #[test]
    fn later_sources_win() {
        let result = Composer::shallow().compose(&[
            Composite::from_pairs([("x", Value::from(1)), ("y", Value::from("a"))]).into(),
            Composite::from_pairs([("x", Value::from(2))]).into(),
        ]);
        assert_eq!(get(&result, "x"), Value::from(2));
        assert_eq!(get(&result, "y"), Value::from("a"));
    }

    #[test]
    fn non_composite_and_repeated_sources_are_skipped() {
        let source = Composite::from_pairs([("x", Value::from(1))]);
        let destination = Composite::new();
        let result = Composer::shallow().compose_into(
            &destination,
            &[Value::Null, Value::from(3), source.clone().into(), source.into()],
        );
        assert!(result.ptr_eq(&destination));
        assert_eq!(result.own_keys().unwrap(), vec![Key::from("x")]);
    }

    ///
    /// ```mermaid
    /// graph LR
    ///     S[source] -->|a| P[payload]
    ///     P -->|n| Q[nested]
    ///     R[result] -->|a| P2[copy of payload]
    ///     P2 -->|n| Q
    /// ```
    #[test]
    fn shallow_copies_one_level() {
        let nested = Composite::from_pairs([("v", Value::from(1))]);
        let inner = Composite::from_pairs([("n", Value::from(nested.clone()))]);
        let source = Composite::from_pairs([("a", Value::from(inner.clone()))]);

        let result = Composer::shallow().compose(&[source.into()]);
        let copied = payload(&result, "a");
        assert!(!copied.ptr_eq(&inner));
        assert!(payload(&copied, "n").ptr_eq(&nested));
    }

    #[test]
    fn deep_copies_every_level() {
        let nested = Composite::from_pairs([("v", Value::from(1))]);
        let inner = Composite::from_pairs([("n", Value::from(nested.clone()))]);
        let source = Composite::from_pairs([("a", Value::from(inner.clone()))]);

        let result = Composer::deep().compose(&[source.into()]);
        let copied = payload(&result, "a");
        let copied_nested = payload(&copied, "n");
        assert!(!copied.ptr_eq(&inner));
        assert!(!copied_nested.ptr_eq(&nested));
        assert_eq!(get(&copied_nested, "v"), Value::from(1));
    }

    #[test]
    fn self_reference_points_back_into_result() {
        let cyclic = Composite::new();
        cyclic.define("me", AttributeRecord::data(cyclic.clone().into())).unwrap();

        let result = Composer::deep().compose(&[cyclic.clone().into()]);
        let me = payload(&result, "me");
        assert!(me.ptr_eq(&result));
        assert!(!me.ptr_eq(&cyclic));

        cyclic.remove(&Key::from("me")).unwrap();
        result.remove(&Key::from("me")).unwrap();
    }

    #[test]
    fn nested_cycle_resolves_to_its_copy() {
        let inner = Composite::new();
        inner.define("up", AttributeRecord::data(inner.clone().into())).unwrap();
        let source = Composite::from_pairs([("inner", Value::from(inner.clone()))]);

        let result = Composer::deep().compose(&[source.into()]);
        let copy = payload(&result, "inner");
        assert!(!copy.ptr_eq(&inner));
        assert!(payload(&copy, "up").ptr_eq(&copy));

        inner.remove(&Key::from("up")).unwrap();
        copy.remove(&Key::from("up")).unwrap();
    }

    #[test]
    fn shared_substructure_collapses_to_one_copy() {
        let shared = Composite::from_pairs([("n", Value::from(1))]);
        let result = Composer::deep().compose(&[
            Composite::from_pairs([("a", Value::from(shared.clone()))]).into(),
            Composite::from_pairs([("b", Value::from(shared.clone()))]).into(),
        ]);
        let a = payload(&result, "a");
        let b = payload(&result, "b");
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&shared));
        assert_eq!(get(&a, "n"), Value::from(1));
    }

    #[test]
    fn earlier_source_as_payload_is_copied_not_linked() {
        for deep in [false, true] {
            let first = Composite::from_pairs([("n", Value::from(1))]);
            let second = Composite::from_pairs([("a", Value::from(first.clone()))]);
            let config = ComposeConfig {
                deep,
                ..ComposeConfig::default()
            };

            let result = Composer::new(config).unwrap().compose(&[first.clone().into(), second.into()]);
            let a = payload(&result, "a");
            assert!(!a.ptr_eq(&result));
            assert!(!a.ptr_eq(&first));
            assert_eq!(a.own_keys().unwrap(), vec![Key::from("n")]);
            assert_eq!(result.own_keys().unwrap(), vec![Key::from("n"), Key::from("a")]);
        }
    }

    #[test]
    fn hidden_attributes_follow_config() {
        let source = Composite::new();
        source
            .define("hidden", AttributeRecord::data_with(Value::from(1), true, true, false))
            .unwrap();
        source.define("shown", AttributeRecord::data(Value::from(2))).unwrap();

        let with_hidden = Composer::shallow().compose(&[source.clone().into()]);
        assert!(with_hidden.has_own(&Key::from("hidden")));

        let config = ComposeConfig {
            include_hidden: false,
            ..ComposeConfig::default()
        };
        let without = Composer::new(config).unwrap().compose(&[source.into()]);
        assert!(!without.has_own(&Key::from("hidden")));
        assert!(without.has_own(&Key::from("shown")));
    }

    #[test]
    fn refused_installs_do_not_abort() {
        let destination = Composite::from_pairs([("x", Value::from(1))]);
        destination.seal().unwrap();
        let source = Composite::from_pairs([("x", Value::from(2)), ("y", Value::from(3))]);

        let result = Composer::shallow().compose_into(&destination, &[source.into()]);
        assert_eq!(get(&result, "x"), Value::from(1));
        assert!(!result.has_own(&Key::from("y")));
    }

    #[test]
    fn handler_rewrites_record() {
        let mut handler = MockPropertyHandler::new();
        handler
            .expect_handle()
            .withf(|key, _, _, _| key == &Key::from("x"))
            .times(1)
            .returning(|_, record, _, _| Ok(HandlerResponse::unchanged(record.with_flags(false, false))));
        let handlers = HandlerSet::new().with("x", handler);

        let result = Composer::shallow()
            .with_handlers(handlers)
            .compose(&[Composite::from_pairs([("x", Value::from(1)), ("y", Value::from(2))]).into()]);
        let x = result.own_record(&Key::from("x")).unwrap().unwrap();
        assert!(!x.reconfigurable && !x.iterable_visible);
        assert!(result.own_record(&Key::from("y")).unwrap().unwrap().iterable_visible);
    }

    #[test]
    fn failing_or_empty_handler_keeps_record() {
        let mut failing = MockPropertyHandler::new();
        failing
            .expect_handle()
            .times(1)
            .returning(|_, _, _, _| Err(DescriptorError::construction("boom")));
        let mut empty = MockPropertyHandler::new();
        empty.expect_handle().times(1).returning(|_, _, _, _| Ok(HandlerResponse::empty()));
        let handlers = HandlerSet::new().with("x", failing).with("x", empty);

        let result = Composer::shallow()
            .with_handlers(handlers)
            .compose(&[Composite::from_pairs([("x", Value::from(1))]).into()]);
        assert_eq!(
            result.own_record(&Key::from("x")).unwrap(),
            Some(AttributeRecord::data(Value::from(1)))
        );
    }

    #[test]
    fn break_out_stops_handler_chain() {
        let mut first = MockPropertyHandler::new();
        first
            .expect_handle()
            .times(1)
            .returning(|_, record, _, _| Ok(HandlerResponse::new(record.clone(), FlowDirective::BreakOut)));
        let mut second = MockPropertyHandler::new();
        second.expect_handle().times(0);
        let handlers = HandlerSet::new().with("x", first).with("x", second);

        Composer::shallow()
            .with_handlers(handlers)
            .compose(&[Composite::from_pairs([("x", Value::from(1))]).into()]);
    }

    #[test]
    fn continue_deeper_reaches_nested_attributes() {
        let mut handler = MockPropertyHandler::new();
        handler
            .expect_handle()
            .withf(|key, _, _, _| key == &Key::from("outer"))
            .times(1)
            .returning(|_, record, _, _| Ok(HandlerResponse::new(record.clone(), FlowDirective::ContinueDeeper)));
        handler
            .expect_handle()
            .withf(|key, _, _, _| key == &Key::from("inner"))
            .times(1)
            .returning(|_, record, _, _| Ok(HandlerResponse::unchanged(record.with_flags(true, false))));
        let handlers = HandlerSet::new().with("outer", handler);

        let source = Composite::from_pairs([("outer", Value::from(Composite::from_pairs([("inner", Value::from(1))])))]);
        let result = Composer::shallow().with_handlers(handlers).compose(&[source.into()]);
        let inner = payload(&result, "outer").own_record(&Key::from("inner")).unwrap().unwrap();
        assert!(!inner.iterable_visible);
    }

    #[test]
    fn cascade_reapplies_only_the_answering_handler() {
        let mut outer = MockPropertyHandler::new();
        outer
            .expect_handle()
            .withf(|key, _, _, _| key == &Key::from("outer"))
            .times(1)
            .returning(|_, record, _, _| Ok(HandlerResponse::new(record.clone(), FlowDirective::ContinueDeeper)));
        outer
            .expect_handle()
            .withf(|key, _, _, _| key == &Key::from("inner"))
            .times(1)
            .returning(|_, record, _, _| Ok(HandlerResponse::unchanged(record.clone())));
        let mut inner = MockPropertyHandler::new();
        inner.expect_handle().times(0);
        let handlers = HandlerSet::new().with("outer", outer).with("inner", inner);

        let source = Composite::from_pairs([("outer", Value::from(Composite::from_pairs([("inner", Value::from(1))])))]);
        Composer::shallow().with_handlers(handlers).compose(&[source.into()]);
    }

    #[test]
    fn handlers_see_destination_and_source() {
        let source = Composite::from_pairs([("x", Value::from(1))]);
        let destination = Composite::new();
        let (expected_source, expected_destination) = (source.clone(), destination.clone());
        let handler = FnHandler::new(move |_key: &Key, record: &AttributeRecord, dest: &Composite, src: &Composite| {
            assert!(dest.ptr_eq(&expected_destination));
            assert!(src.ptr_eq(&expected_source));
            Ok(HandlerResponse::unchanged(record.clone()))
        });
        let mut handlers = HandlerSet::new();
        handlers.register("x", Rc::new(handler));
        compose_into(false, &destination, &[source.into()], Some(&handlers));
        assert!(destination.has_own(&Key::from("x")));
    }

    #[test]
    fn scope_keyed_attributes_cascade_with_defaults() {
        let secret = Composite::from_pairs([("p", Value::from(1))]);
        let source = Composite::new();
        source
            .define(VisibilityScope::ImmutableHidden, AttributeRecord::data(secret.clone().into()))
            .unwrap();

        let result = shallow_copy(&Composite::new(), &[source.into()]);
        let record = result
            .own_record(&Key::Scope(VisibilityScope::ImmutableHidden))
            .unwrap()
            .unwrap();
        assert!(!record.reconfigurable && !record.iterable_visible);
        let cloned = record.payload_composite().unwrap();
        assert!(!cloned.ptr_eq(&secret));
        let p = cloned.own_record(&Key::from("p")).unwrap().unwrap();
        assert!(!p.reconfigurable && !p.iterable_visible);
    }

    #[test]
    fn deep_copy_without_scoped_keys_is_plain_deep_merge() {
        let nested = Composite::from_pairs([("v", Value::from(1))]);
        let result = deep_copy(
            &Composite::new(),
            &[Composite::from_pairs([("a", Value::from(nested.clone()))]).into()],
        );
        let copied = payload(&result, "a");
        assert!(!copied.ptr_eq(&nested));
        assert!(copied.own_record(&Key::from("v")).unwrap().unwrap().iterable_visible);
    }
}

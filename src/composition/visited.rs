// Copyright 2025 Cowboy AI, LLC.

//! Per-call record of composites already processed

use std::collections::{HashMap, HashSet};

use crate::composite::{Composite, CompositeId};

/// Originals seen during one composition call, each mapped to the
/// composite that stands in for it in the result
///
/// Top-level sources are tracked apart from payload replacements. Only the
/// source being merged right now stands in as the destination; once the
/// next source begins, an earlier source met as a payload gets its own copy.
#[derive(Debug, Default)]
pub struct VisitedSet {
    replacements: HashMap<CompositeId, Composite>,
    sources: HashSet<CompositeId>,
    current: Option<(CompositeId, Composite)>,
}

impl VisitedSet {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `original` was already processed
    pub fn contains(&self, original: &Composite) -> bool {
        self.replacements.contains_key(&original.id())
    }

    /// Mark `original` processed, standing in as `replacement`. Returns
    /// false when it was already marked; the first replacement is kept.
    pub fn insert(&mut self, original: &Composite, replacement: &Composite) -> bool {
        if self.contains(original) {
            return false;
        }
        self.replacements.insert(original.id(), replacement.clone());
        true
    }

    /// Start merging top-level `source` into `destination`. Returns false
    /// when the source was already merged in this call.
    pub fn begin_source(&mut self, source: &Composite, destination: &Composite) -> bool {
        if !self.sources.insert(source.id()) {
            return false;
        }
        self.current = Some((source.id(), destination.clone()));
        true
    }

    /// Composite standing in for `original`: the destination when it is the
    /// source being merged, otherwise its payload replacement
    pub fn replacement_for(&self, original: &Composite) -> Option<Composite> {
        match &self.current {
            Some((id, destination)) if *id == original.id() => Some(destination.clone()),
            _ => self.replacements.get(&original.id()).cloned(),
        }
    }

    /// Number of payload originals replaced
    pub fn len(&self) -> usize {
        self.replacements.len()
    }

    /// Whether nothing was seen yet
    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty()
    }
}

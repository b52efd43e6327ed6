// Copyright 2025 Cowboy AI, LLC.

//! Classifier: score opaque values against the attribute-record shape
//!
//! Pure, deterministic heuristic. A candidate earns up to four points:
//! a compact key set, well-typed shared flags, well-typed data or accessor
//! slots, and an actual payload (a `value` key, or at least one real
//! reader/writer function). Confidence is the score over four. A candidate
//! carrying keys of both the data and the accessor group is never valid.

use serde::{Deserialize, Serialize};

use crate::record::AttributeRecord;
use crate::value::{Key, Value};

/// Key names recognised on descriptor-shaped composites
pub mod keys {
    /// Shared flag: record may be replaced or removed
    pub const RECONFIGURABLE: &str = "reconfigurable";
    /// Shared flag: slot appears in enumeration
    pub const ITERABLE_VISIBLE: &str = "iterable_visible";
    /// Data slot: payload
    pub const VALUE: &str = "value";
    /// Data slot: writes accepted
    pub const MUTABLE: &str = "mutable";
    /// Accessor slot: zero-arity reader
    pub const READER: &str = "reader";
    /// Accessor slot: one-arity writer
    pub const WRITER: &str = "writer";

    /// Flags shared by both record shapes
    pub const SHARED: [&str; 2] = [RECONFIGURABLE, ITERABLE_VISIBLE];
    /// Data record slots
    pub const DATA: [&str; 2] = [VALUE, MUTABLE];
    /// Accessor record slots
    pub const ACCESSOR: [&str; 2] = [READER, WRITER];
    /// Every recognised key
    pub const ALL: [&str; 6] = [RECONFIGURABLE, ITERABLE_VISIBLE, VALUE, MUTABLE, READER, WRITER];
}

const MAX_SCORE: f64 = 4.0;
const COMPACT_KEY_COUNT: usize = 4;

/// Detailed classification report
///
/// Produced per call and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Score in [0, 1]
    pub confidence: f64,
    /// Valid and carries well-typed accessor slots
    pub is_accessor_shaped: bool,
    /// Valid and carries well-typed data slots
    pub is_data_shaped: bool,
    /// Usable as an attribute record
    pub is_valid: bool,
    /// At least one shared flag, all of them boolean
    pub has_shared_flags: bool,
    /// At least one accessor slot, all of them functions
    pub has_accessor_slots: bool,
    /// At least one data slot, `mutable` boolean if present
    pub has_data_slots: bool,
}

/// Classify a value against the attribute-record shape
///
/// With `strict`, any own key outside the recognised set makes the
/// candidate invalid outright. Never fails: non-composites and composites
/// that cannot be inspected classify as invalid with zero confidence.
pub fn classify(value: &Value, strict: bool) -> ClassificationResult {
    let invalid = ClassificationResult::default();
    let Some(candidate) = value.as_composite() else {
        return invalid;
    };
    let Ok(own_keys) = candidate.own_keys() else {
        return invalid;
    };

    let names: Vec<&str> = own_keys.iter().filter_map(Key::as_name).collect();
    if strict && (names.len() != own_keys.len() || names.iter().any(|n| !keys::ALL.contains(n))) {
        return invalid;
    }

    let present = |name: &str| names.iter().any(|n| *n == name);
    let slot = |name: &str| -> Value {
        if present(name) {
            candidate.get(Key::from(name)).unwrap_or_default()
        } else {
            Value::Undefined
        }
    };
    let bool_or_absent = |name: &str| matches!(slot(name), Value::Bool(_) | Value::Undefined);
    let function_or_absent =
        |name: &str| matches!(slot(name), Value::Function(_) | Value::Undefined);

    let mut score = 0u8;
    if own_keys.len() <= COMPACT_KEY_COUNT {
        score += 1;
    }

    let any_shared = keys::SHARED.iter().any(|&k| present(k));
    let any_data = keys::DATA.iter().any(|&k| present(k));
    let any_accessor = keys::ACCESSOR.iter().any(|&k| present(k));

    let has_shared_flags = any_shared && keys::SHARED.iter().all(|&k| bool_or_absent(k));
    let has_accessor_slots = any_accessor && keys::ACCESSOR.iter().all(|&k| function_or_absent(k));
    let has_data_slots = any_data && (!present(keys::MUTABLE) || slot(keys::MUTABLE).as_bool().is_some());

    if has_shared_flags {
        score += 1;
    }
    if has_accessor_slots || has_data_slots {
        score += 1;
    }

    let mut is_valid = score > 0;
    let mut is_accessor_shaped = is_valid && has_accessor_slots;
    let mut is_data_shaped = is_valid && has_data_slots;

    if is_data_shaped && present(keys::VALUE) {
        score += 1;
    } else if is_accessor_shaped && keys::ACCESSOR.iter().any(|&k| slot(k).is_function()) {
        score += 1;
    }

    // Keys from both groups conflict regardless of how they are typed
    if any_accessor && any_data {
        score = 0;
        is_valid = false;
        is_accessor_shaped = false;
        is_data_shaped = false;
    }

    ClassificationResult {
        confidence: f64::from(score) / MAX_SCORE,
        is_accessor_shaped,
        is_data_shaped,
        is_valid,
        has_shared_flags,
        has_accessor_slots,
        has_data_slots,
    }
}

/// Whether a value is usable as an attribute record
pub fn is_descriptor(value: &Value, strict: bool) -> bool {
    classify(value, strict).is_valid
}

/// Classify a record through its descriptor-shaped rendering
pub fn classify_record(record: &AttributeRecord) -> ClassificationResult {
    classify(&record.to_composite().into(), true)
}

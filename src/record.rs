// Copyright 2025 Cowboy AI, LLC.

//! Attribute records
//!
//! An [`AttributeRecord`] describes how one named slot of a composite is
//! accessed: either a stored value (data record) or a reader/writer pair
//! (accessor record), plus the shared `reconfigurable` and
//! `iterable_visible` policy flags. A record is never both shapes.

use crate::classifier::{self, keys, ClassificationResult};
use crate::composite::Composite;
use crate::errors::{DescriptorError, DescriptorResult};
use crate::scope::VisibilityScope;
use crate::value::{Function, Key, Value};

/// Access shape of a record
#[derive(Debug, Clone, PartialEq)]
pub enum RecordKind {
    /// Stored value
    Data {
        /// Payload
        value: Value,
        /// Whether writes are accepted
        mutable: bool,
    },
    /// Computed reader/writer pair
    Accessor {
        /// Zero-arity reader
        reader: Option<Function>,
        /// One-arity writer
        writer: Option<Function>,
    },
}

/// Metadata describing one slot of a composite
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeRecord {
    /// Data or accessor shape
    pub kind: RecordKind,
    /// Whether the record may later be replaced or removed
    pub reconfigurable: bool,
    /// Whether the slot appears when enumerating own attributes
    pub iterable_visible: bool,
}

impl AttributeRecord {
    /// Mutable, reconfigurable, visible data record
    pub fn data(value: Value) -> Self {
        Self::data_with(value, true, true, true)
    }

    /// Data record with explicit flags
    pub fn data_with(value: Value, mutable: bool, reconfigurable: bool, iterable_visible: bool) -> Self {
        Self {
            kind: RecordKind::Data { value, mutable },
            reconfigurable,
            iterable_visible,
        }
    }

    /// Reconfigurable, visible accessor record
    pub fn accessor(reader: Option<Function>, writer: Option<Function>) -> Self {
        Self {
            kind: RecordKind::Accessor { reader, writer },
            reconfigurable: true,
            iterable_visible: true,
        }
    }

    /// Whether this is a data record
    pub fn is_data(&self) -> bool {
        matches!(self.kind, RecordKind::Data { .. })
    }

    /// Whether this is an accessor record
    pub fn is_accessor(&self) -> bool {
        matches!(self.kind, RecordKind::Accessor { .. })
    }

    /// Payload of a data record
    pub fn value(&self) -> Option<&Value> {
        match &self.kind {
            RecordKind::Data { value, .. } => Some(value),
            RecordKind::Accessor { .. } => None,
        }
    }

    /// Mutability of a data record
    pub fn mutable(&self) -> Option<bool> {
        match &self.kind {
            RecordKind::Data { mutable, .. } => Some(*mutable),
            RecordKind::Accessor { .. } => None,
        }
    }

    /// Reader of an accessor record
    pub fn reader(&self) -> Option<&Function> {
        match &self.kind {
            RecordKind::Accessor { reader, .. } => reader.as_ref(),
            RecordKind::Data { .. } => None,
        }
    }

    /// Writer of an accessor record
    pub fn writer(&self) -> Option<&Function> {
        match &self.kind {
            RecordKind::Accessor { writer, .. } => writer.as_ref(),
            RecordKind::Data { .. } => None,
        }
    }

    /// Composite payload of a data record
    pub fn payload_composite(&self) -> Option<Composite> {
        self.value().and_then(Value::as_composite).cloned()
    }

    /// Replace the payload of a data record; accessors are left untouched
    pub fn set_value(&mut self, new_value: Value) {
        if let RecordKind::Data { value, .. } = &mut self.kind {
            *value = new_value;
        }
    }

    /// Copy with the shared flags replaced
    pub fn with_flags(&self, reconfigurable: bool, iterable_visible: bool) -> Self {
        Self {
            kind: self.kind.clone(),
            reconfigurable,
            iterable_visible,
        }
    }

    /// Copy with a visibility scope's overrides applied
    pub fn with_scope(&self, scope: VisibilityScope) -> Self {
        let overrides = scope.overrides();
        let mut scoped = self.with_flags(overrides.reconfigurable, overrides.iterable_visible);
        if let (Some(forced), RecordKind::Data { mutable, .. }) = (overrides.mutable, &mut scoped.kind) {
            *mutable = forced;
        }
        scoped
    }

    /// Whether the record already carries a scope's overrides
    pub fn matches_scope(&self, scope: VisibilityScope) -> bool {
        let overrides = scope.overrides();
        self.reconfigurable == overrides.reconfigurable
            && self.iterable_visible == overrides.iterable_visible
            && match (overrides.mutable, self.mutable()) {
                (Some(forced), Some(mutable)) => forced == mutable,
                _ => true,
            }
    }

    /// Whether `next` may replace this record when this one is not
    /// reconfigurable: flags and shape must be unchanged, an immutable
    /// value must stay the same, accessor functions must stay the same
    pub(crate) fn accepts_redefinition(&self, next: &AttributeRecord) -> bool {
        if next.reconfigurable || next.iterable_visible != self.iterable_visible {
            return false;
        }
        match (&self.kind, &next.kind) {
            (
                RecordKind::Data { mutable: true, .. },
                RecordKind::Data { .. },
            ) => true,
            (
                RecordKind::Data { value, mutable: false },
                RecordKind::Data {
                    value: next_value,
                    mutable: next_mutable,
                },
            ) => !next_mutable && value == next_value,
            (
                RecordKind::Accessor { reader, writer },
                RecordKind::Accessor {
                    reader: next_reader,
                    writer: next_writer,
                },
            ) => reader == next_reader && writer == next_writer,
            _ => false,
        }
    }

    /// Render as a descriptor-shaped composite
    pub fn to_composite(&self) -> Composite {
        let mut pairs: Vec<(&str, Value)> = Vec::with_capacity(4);
        match &self.kind {
            RecordKind::Data { value, mutable } => {
                pairs.push((keys::VALUE, value.clone()));
                pairs.push((keys::MUTABLE, Value::Bool(*mutable)));
            }
            RecordKind::Accessor { reader, writer } => {
                if let Some(reader) = reader {
                    pairs.push((keys::READER, reader.clone().into()));
                }
                if let Some(writer) = writer {
                    pairs.push((keys::WRITER, writer.clone().into()));
                }
            }
        }
        pairs.push((keys::RECONFIGURABLE, Value::Bool(self.reconfigurable)));
        pairs.push((keys::ITERABLE_VISIBLE, Value::Bool(self.iterable_visible)));
        Composite::from_pairs(pairs)
    }

    /// Parse a descriptor-shaped composite; missing flags default to false
    pub fn from_composite(candidate: &Value) -> DescriptorResult<Self> {
        let report = classifier::classify(candidate, true);
        let composite = match candidate.as_composite() {
            Some(composite) if report.is_valid => composite,
            _ => {
                return Err(DescriptorError::InvalidDescriptor(format!(
                    "{} is not descriptor-shaped (confidence {:.2})",
                    candidate.type_name(),
                    report.confidence
                )))
            }
        };
        let field = |name: &str| composite.get(Key::from(name));
        let flag = |name: &str| -> DescriptorResult<bool> {
            Ok(field(name)?.as_bool().unwrap_or(false))
        };
        let function = |name: &str| -> DescriptorResult<Option<Function>> {
            Ok(field(name)?.as_function().cloned())
        };

        let kind = if report.is_accessor_shaped {
            RecordKind::Accessor {
                reader: function(keys::READER)?,
                writer: function(keys::WRITER)?,
            }
        } else {
            RecordKind::Data {
                value: field(keys::VALUE)?,
                mutable: flag(keys::MUTABLE)?,
            }
        };
        Ok(Self {
            kind,
            reconfigurable: flag(keys::RECONFIGURABLE)?,
            iterable_visible: flag(keys::ITERABLE_VISIBLE)?,
        })
    }

    /// Classify this record's descriptor-shaped rendering
    pub fn classify(&self) -> ClassificationResult {
        classifier::classify_record(self)
    }
}

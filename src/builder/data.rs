// Copyright 2025 Cowboy AI, LLC.

//! Data record construction
//!
//! Overloads, by positional argument:
//!
//! | args | meaning |
//! |------|---------|
//! | none | `undefined` payload |
//! | one descriptor-shaped composite with a `value` | unwrap it: adopt its payload and flags |
//! | one anything else | the payload |
//! | second: boolean | `mutable` |
//! | second: composite | options (`mutable`, `reconfigurable`, `iterable_visible`) |
//! | third / fourth: boolean | `reconfigurable`, `iterable_visible` |
//!
//! [`RecordOptions`] arguments anywhere in the list override all of the
//! above. Every flag not set explicitly defaults to `true`.

use tracing::trace;

use super::args::{RecordArg, RecordOptions, SplitArgs};
use crate::classifier::{self, keys};
use crate::record::AttributeRecord;
use crate::value::{Key, Value};

/// Build a data record from a flexible argument list
pub fn make_data_record<I>(args: I) -> AttributeRecord
where
    I: IntoIterator<Item = RecordArg>,
{
    let SplitArgs {
        positional,
        options: explicit,
    } = SplitArgs::new(args);
    let mut resolved = RecordOptions::new();
    let mut value = positional.first().cloned().unwrap_or_default();

    if positional.len() == 1 {
        if let Some((payload, flags)) = unwrap_descriptor(&value) {
            trace!("unwrapping descriptor-shaped data argument");
            value = payload;
            resolved.merge(flags);
        }
    }

    let flag_at = |index: usize| positional.get(index).and_then(Value::as_bool);
    match positional.get(1) {
        Some(Value::Bool(mutable)) => {
            resolved.mutable = Some(*mutable);
            resolved.reconfigurable = flag_at(2);
            resolved.iterable_visible = flag_at(3);
        }
        Some(Value::Composite(options)) => resolved.merge(RecordOptions::from_composite(options)),
        _ => {}
    }
    resolved.merge(explicit);

    AttributeRecord::data_with(
        value,
        resolved.mutable.unwrap_or(true),
        resolved.reconfigurable.unwrap_or(true),
        resolved.iterable_visible.unwrap_or(true),
    )
}

/// Payload and flags of a descriptor-shaped composite carrying a `value`
fn unwrap_descriptor(candidate: &Value) -> Option<(Value, RecordOptions)> {
    let composite = candidate.as_composite()?;
    if !composite.has_own(&Key::from(keys::VALUE)) || !classifier::classify(candidate, true).is_data_shaped {
        return None;
    }
    let field = |name: &str| composite.get(Key::from(name)).unwrap_or_default();
    let flags = RecordOptions {
        mutable: field(keys::MUTABLE).as_bool(),
        reconfigurable: field(keys::RECONFIGURABLE).as_bool(),
        iterable_visible: field(keys::ITERABLE_VISIBLE).as_bool(),
        ..RecordOptions::default()
    };
    Some((field(keys::VALUE), flags))
}

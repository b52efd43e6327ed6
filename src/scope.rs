// Copyright 2025 Cowboy AI, LLC.

//! Visibility scopes: canonical attribute policy presets
//!
//! Six fixed tags, each carrying an override triple for the
//! `reconfigurable` and `iterable_visible` flags (and `mutable` for the
//! flexible pair). Tags are plain enum values, so two lookups of the same
//! tag are always equal and scopes work directly as map keys.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{DescriptorError, DescriptorResult};

/// Canonical policy preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VisibilityScope {
    /// Reconfigurable, hidden from enumeration
    MutableHidden,
    /// Reconfigurable, visible in enumeration
    MutableVisible,
    /// Locked, hidden from enumeration
    ImmutableHidden,
    /// Locked, visible in enumeration
    ImmutableVisible,
    /// Locked but writable, hidden from enumeration
    FlexibleHidden,
    /// Locked but writable, visible in enumeration
    FlexibleVisible,
}

/// Flag values a scope imposes on the records it touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeOverrides {
    /// Forced `reconfigurable`
    pub reconfigurable: bool,
    /// Forced `iterable_visible`
    pub iterable_visible: bool,
    /// Forced `mutable` on data records, when the scope dictates one
    pub mutable: Option<bool>,
}

impl VisibilityScope {
    /// Every scope, in table order
    pub const ALL: [VisibilityScope; 6] = [
        VisibilityScope::MutableHidden,
        VisibilityScope::MutableVisible,
        VisibilityScope::ImmutableHidden,
        VisibilityScope::ImmutableVisible,
        VisibilityScope::FlexibleHidden,
        VisibilityScope::FlexibleVisible,
    ];

    /// Canonical tag name
    pub fn tag(&self) -> &'static str {
        match self {
            VisibilityScope::MutableHidden => "mutableHidden",
            VisibilityScope::MutableVisible => "mutableVisible",
            VisibilityScope::ImmutableHidden => "immutableHidden",
            VisibilityScope::ImmutableVisible => "immutableVisible",
            VisibilityScope::FlexibleHidden => "flexibleHidden",
            VisibilityScope::FlexibleVisible => "flexibleVisible",
        }
    }

    /// Override triple for this scope
    pub fn overrides(&self) -> ScopeOverrides {
        let (reconfigurable, iterable_visible, mutable) = match self {
            VisibilityScope::MutableHidden => (true, false, None),
            VisibilityScope::MutableVisible => (true, true, None),
            VisibilityScope::ImmutableHidden => (false, false, None),
            VisibilityScope::ImmutableVisible => (false, true, None),
            VisibilityScope::FlexibleHidden => (false, false, Some(true)),
            VisibilityScope::FlexibleVisible => (false, true, Some(true)),
        };
        ScopeOverrides {
            reconfigurable,
            iterable_visible,
            mutable,
        }
    }
}

impl fmt::Display for VisibilityScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for VisibilityScope {
    type Err = DescriptorError;

    /// Accepts the canonical tag or its snake_case spelling
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s.chars().filter(|c| *c != '_').collect::<String>().to_ascii_lowercase();
        VisibilityScope::ALL
            .into_iter()
            .find(|scope| scope.tag().to_ascii_lowercase() == folded)
            .ok_or_else(|| DescriptorError::UnknownScope(s.to_string()))
    }
}

/// Look up a scope by tag name
pub fn scope(tag: &str) -> DescriptorResult<VisibilityScope> {
    tag.parse()
}

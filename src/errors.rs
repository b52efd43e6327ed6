// Copyright 2025 Cowboy AI, LLC.

//! Error types for descriptor operations

use thiserror::Error;

/// Errors that can occur while classifying, building or installing
/// attribute records
#[derive(Debug, Clone, Error)]
pub enum DescriptorError {
    /// Input was not usable as an attribute record
    #[error("Invalid descriptor: {0}")]
    InvalidDescriptor(String),

    /// A record builder call could not be satisfied
    #[error("Construction error: {reason}")]
    Construction {
        /// Why the requested record cannot be built
        reason: String,
    },

    /// Write attempted through an immutable data record or a reader-only accessor
    #[error("Attribute is read-only: {key}")]
    ReadOnly {
        /// Key of the attribute
        key: String,
    },

    /// Redefinition or removal of a non-reconfigurable attribute
    #[error("Attribute is not reconfigurable: {key}")]
    NotReconfigurable {
        /// Key of the attribute
        key: String,
    },

    /// New attribute on a composite that no longer accepts them
    #[error("Composite is not extensible, cannot add: {key}")]
    NotExtensible {
        /// Key that was rejected
        key: String,
    },

    /// Call attempted on a value that is not a function
    #[error("Value is not callable: {0}")]
    NotCallable(String),

    /// Composite accessed while already mutably borrowed
    #[error("Composite is busy: {0}")]
    Borrow(String),

    /// Unknown visibility scope tag
    #[error("Unknown visibility scope: {0}")]
    UnknownScope(String),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Result type for descriptor operations
pub type DescriptorResult<T> = Result<T, DescriptorError>;

impl From<serde_json::Error> for DescriptorError {
    fn from(err: serde_json::Error) -> Self {
        DescriptorError::SerializationError(err.to_string())
    }
}

impl DescriptorError {
    /// Create a construction error
    pub fn construction(reason: impl Into<String>) -> Self {
        DescriptorError::Construction {
            reason: reason.into(),
        }
    }

    /// Check if this error was raised by an attribute policy
    pub fn is_policy_violation(&self) -> bool {
        matches!(
            self,
            DescriptorError::ReadOnly { .. }
                | DescriptorError::NotReconfigurable { .. }
                | DescriptorError::NotExtensible { .. }
        )
    }

    /// Check if this is a builder error
    pub fn is_construction_error(&self) -> bool {
        matches!(self, DescriptorError::Construction { .. })
    }
}

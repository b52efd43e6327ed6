// Copyright 2025 Cowboy AI, LLC.

//! Composition engine configuration

use serde::{Deserialize, Serialize};

use crate::errors::{DescriptorError, DescriptorResult};
use crate::handler::scope_cascade::DEFAULT_CASCADE_DEPTH;

/// Settings for one [`Composer`](super::Composer)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposeConfig {
    /// Recurse into composite payloads instead of copying them one level
    pub deep: bool,
    /// Copy attributes that are not iterable-visible
    pub include_hidden: bool,
    /// Bound on the scope cascade clone walk of the default handlers
    pub cascade_depth_limit: usize,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            deep: false,
            include_hidden: true,
            cascade_depth_limit: DEFAULT_CASCADE_DEPTH,
        }
    }
}

impl ComposeConfig {
    /// Default settings, shallow
    pub fn shallow() -> Self {
        Self::default()
    }

    /// Default settings, deep
    pub fn deep() -> Self {
        Self {
            deep: true,
            ..Self::default()
        }
    }

    /// Check the settings are usable
    pub fn validate(&self) -> DescriptorResult<()> {
        if self.cascade_depth_limit == 0 {
            return Err(DescriptorError::Config(
                "cascade_depth_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse and validate settings from JSON; missing fields take defaults
    pub fn from_json(json: &str) -> DescriptorResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults() {
        let config = ComposeConfig::default();
        assert!(!config.deep);
        assert!(config.include_hidden);
        assert_eq!(config.cascade_depth_limit, 64);
        assert!(config.validate().is_ok());
        assert!(ComposeConfig::deep().deep);
    }

    #[test]
    fn from_json_fills_missing_fields() {
        let config = ComposeConfig::from_json(r#"{"deep": true}"#).unwrap();
        assert_eq!(
            config,
            ComposeConfig {
                deep: true,
                ..ComposeConfig::default()
            }
        );
    }

    #[test]
    fn zero_depth_limit_is_rejected() {
        let err = ComposeConfig::from_json(r#"{"cascade_depth_limit": 0}"#).unwrap_err();
        assert!(matches!(err, DescriptorError::Config(_)));
    }

    #[test]
    fn malformed_json_is_serialization_error() {
        let err = ComposeConfig::from_json("{deep").unwrap_err();
        assert!(matches!(err, DescriptorError::SerializationError(_)));
    }
}

//! Heal target
//!
//! An abstract description of the resource a healing action operates on:
//! source/template content, runtime handles, and configuration. The sandbox
//! executor clones it freely; the live target is only touched after a
//! passing sandbox run.

use remedy_core::StateDigest;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The state a healing action is applied to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealTarget {
    /// Resource identifier (file, component, listener)
    pub resource: String,
    /// Textual content (code, template, log config)
    pub content: String,
    /// Currently open runtime handles/listeners
    pub open_handles: Vec<String>,
    /// Configuration keys on the resource
    pub config: BTreeMap<String, String>,
}

impl HealTarget {
    /// Create a target with content only
    #[must_use]
    pub fn new(resource: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            content: content.into(),
            open_handles: Vec::new(),
            config: BTreeMap::new(),
        }
    }

    /// With open handles
    #[must_use]
    pub fn with_handles(mut self, handles: Vec<String>) -> Self {
        self.open_handles = handles;
        self
    }

    /// With a config key
    #[must_use]
    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    /// Digest of the whole target state
    ///
    /// BTreeMap keeps config ordering stable, so equal states hash equal.
    #[must_use]
    pub fn digest(&self) -> StateDigest {
        StateDigest::compute_serializable(self).unwrap_or_else(|_| StateDigest::new([0u8; 32]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_targets_have_equal_digests() {
        let a = HealTarget::new("intake", "let x = 1;").with_config("mode", "strict");
        let b = HealTarget::new("intake", "let x = 1;").with_config("mode", "strict");
        assert_eq!(a.digest(), b.digest());
    }

    #[test]
    fn any_field_change_alters_digest() {
        let base = HealTarget::new("intake", "let x = 1;");
        let content = HealTarget::new("intake", "let x = 2;");
        let handles = base.clone().with_handles(vec!["h1".into()]);
        assert_ne!(base.digest(), content.digest());
        assert_ne!(base.digest(), handles.digest());
    }
}

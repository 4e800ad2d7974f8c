//! Safety policy
//!
//! Static policy the validator evaluates against. Read-only at runtime;
//! replaced only by an atomic whole-config swap.

use serde::{Deserialize, Serialize};

/// Policy inputs for safety validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyPolicy {
    /// Strategies that may never run autonomously or with approval.
    /// The last line of defense against irreversible autonomous actions.
    pub denylist: Vec<String>,
    /// Affected-resource count above which approval is required
    /// (blast-radius control). Deployment-tuned, not a correctness constant.
    pub fanout_threshold: usize,
}

impl SafetyPolicy {
    /// Policy with built-in denylist and a conservative fan-out threshold
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            denylist: vec![
                "delete-data".into(),
                "modify-auth-credentials".into(),
                "drop-table".into(),
            ],
            fanout_threshold: 3,
        }
    }

    /// With a different fan-out threshold
    #[inline]
    #[must_use]
    pub fn with_fanout_threshold(mut self, threshold: usize) -> Self {
        self.fanout_threshold = threshold;
        self
    }

    /// Add a strategy to the denylist
    #[must_use]
    pub fn deny(mut self, strategy: impl Into<String>) -> Self {
        self.denylist.push(strategy.into());
        self
    }

    /// Whether a strategy is denylisted
    #[inline]
    #[must_use]
    pub fn is_denylisted(&self, strategy: &str) -> bool {
        self.denylist.iter().any(|s| s == strategy)
    }
}

impl Default for SafetyPolicy {
    fn default() -> Self {
        Self::with_defaults()
    }
}

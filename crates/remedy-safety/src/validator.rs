//! Safety validator
//!
//! A pure decision function over an issue and a proposed strategy. No I/O,
//! no clock, no shared state: fully unit-testable. Rules are evaluated in
//! order and the first match wins:
//!
//! 1. denylisted strategy      -> deny, no override
//! 2. critical severity        -> allow, approval required
//! 3. blast radius over limit  -> allow, approval required
//! 4. otherwise                -> allow, autonomous

use crate::policy::SafetyPolicy;
use remedy_core::{Issue, SafetyDecision};

/// Validates issue + strategy pairs against the safety policy
#[derive(Debug, Clone)]
pub struct SafetyValidator {
    policy: SafetyPolicy,
}

impl SafetyValidator {
    /// Create validator over a policy
    #[inline]
    #[must_use]
    pub fn new(policy: SafetyPolicy) -> Self {
        Self { policy }
    }

    /// Evaluate a proposed strategy for an issue
    #[must_use]
    pub fn validate(&self, issue: &Issue, strategy: &str) -> SafetyDecision {
        if self.policy.is_denylisted(strategy) {
            return SafetyDecision::deny(format!("strategy '{strategy}' is denylisted"));
        }

        if issue.is_critical() {
            return SafetyDecision::needs_approval(
                "critical severity is never healed autonomously",
            );
        }

        if issue.blast_radius() > self.policy.fanout_threshold {
            return SafetyDecision::needs_approval(format!(
                "blast radius {} exceeds threshold {}",
                issue.blast_radius(),
                self.policy.fanout_threshold
            ));
        }

        SafetyDecision::allow("within autonomous policy bounds")
    }

    /// Policy reference
    #[inline]
    #[must_use]
    pub fn policy(&self) -> &SafetyPolicy {
        &self.policy
    }
}

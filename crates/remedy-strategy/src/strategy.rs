//! Healing strategy trait and registry
//!
//! Strategies are idempotent remediation procedures: applying the same
//! action twice yields the same end state, which the sandbox verifies by
//! re-running `apply` on its own output. The registry is built once at
//! startup and passed to the agent brain explicitly; there is no global
//! singleton.

use crate::error::StrategyError;
use crate::target::HealTarget;
use remedy_core::{ActionPayload, HealingAction, Issue, RollbackPlan};
use std::collections::HashMap;
use std::sync::Arc;

/// An idempotent remediation procedure with a declared rollback
pub trait HealingStrategy: Send + Sync {
    /// Registered strategy name
    fn name(&self) -> &'static str;

    /// Build a healing action for an issue
    ///
    /// # Errors
    /// Returns [`StrategyError::ProposalFailed`] when the issue carries too
    /// little context to act on.
    fn propose(&self, issue: &Issue) -> Result<HealingAction, StrategyError>;

    /// Apply an action to a target
    ///
    /// Must be idempotent: a second apply of the same action is a no-op.
    ///
    /// # Errors
    /// Returns [`StrategyError::PayloadMismatch`] for a foreign payload and
    /// [`StrategyError::ApplyFailed`] on fault.
    fn apply(&self, action: &HealingAction, target: &mut HealTarget)
        -> Result<(), StrategyError>;

    /// Minimal correctness predicate checked after apply
    ///
    /// e.g. "content no longer contains raw SQL concatenation".
    fn verify(&self, action: &HealingAction, target: &HealTarget) -> bool;
}

/// Interpret a payload against a target
///
/// Shared by strategy `apply` implementations and by rollback execution
/// ([`RollbackPlan::Inverse`] carries a payload, not a strategy).
///
/// # Errors
/// Returns [`StrategyError::InvalidPayload`] for an uncompilable redaction
/// pattern.
pub fn apply_payload(
    payload: &ActionPayload,
    target: &mut HealTarget,
) -> Result<(), StrategyError> {
    match payload {
        ActionPayload::CodePatch { find, replace } => {
            target.content = target.content.replace(find.as_str(), replace.as_str());
            Ok(())
        }
        ActionPayload::ConfigToggle { key, value } => {
            target.config.insert(key.clone(), value.clone());
            Ok(())
        }
        ActionPayload::RedactionRule {
            pattern,
            replacement,
            ..
        } => {
            let re = regex::Regex::new(pattern)?;
            target.content = re
                .replace_all(&target.content, replacement.as_str())
                .into_owned();
            Ok(())
        }
        ActionPayload::ResourceRelease { handle_id } => {
            target.open_handles.retain(|h| h != handle_id);
            Ok(())
        }
        ActionPayload::BreakerInstall { dependency, .. } => {
            target
                .config
                .insert(format!("breaker.{dependency}"), "enabled".to_string());
            Ok(())
        }
    }
}

/// Execute a declared rollback against a target
///
/// # Errors
/// Returns [`StrategyError::ApplyFailed`] when the plan declares no
/// executable inverse ([`RollbackPlan::ReapplyFromBackup`] and
/// [`RollbackPlan::None`] are operator procedures, not agent actions).
pub fn apply_rollback(plan: &RollbackPlan, target: &mut HealTarget) -> Result<(), StrategyError> {
    match plan {
        RollbackPlan::Inverse(payload) => apply_payload(payload, target),
        RollbackPlan::ReapplyFromBackup => Err(StrategyError::ApplyFailed(
            "rollback requires restore from backup".into(),
        )),
        RollbackPlan::None => Err(StrategyError::ApplyFailed("no rollback declared".into())),
    }
}

/// Immutable registry of healing strategies
///
/// Built once at startup; the agent brain receives it explicitly, which
/// keeps test doubles trivial.
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    strategies: HashMap<&'static str, Arc<dyn HealingStrategy>>,
}

impl StrategyRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            strategies: HashMap::new(),
        }
    }

    /// Create registry with the built-in strategies
    #[must_use]
    pub fn with_defaults() -> Self {
        use crate::builtin::*;
        Self::new()
            .register(Arc::new(SanitizeUnsafeInput))
            .register(Arc::new(ParameterizeQuery))
            .register(Arc::new(RedactSensitiveLogField))
            .register(Arc::new(ReleaseLeakedHandle))
            .register(Arc::new(InstallBreakerWrapper))
    }

    /// Register a strategy (builder style)
    #[must_use]
    pub fn register(mut self, strategy: Arc<dyn HealingStrategy>) -> Self {
        self.strategies.insert(strategy.name(), strategy);
        self
    }

    /// Look up a strategy by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn HealingStrategy>> {
        self.strategies.get(name).map(Arc::clone)
    }

    /// Check if a strategy exists
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.strategies.contains_key(name)
    }

    /// Registered strategy names
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.keys().copied().collect()
    }

    /// Number of registered strategies
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("names", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_register_all_five() {
        let registry = StrategyRegistry::with_defaults();
        assert_eq!(registry.len(), 5);
        for name in [
            "sanitize-unsafe-input",
            "parameterize-query",
            "redact-sensitive-log-field",
            "release-leaked-handle",
            "install-circuit-breaker-wrapper",
        ] {
            assert!(registry.contains(name), "missing {name}");
        }
    }

    #[test]
    fn unknown_name_returns_none() {
        let registry = StrategyRegistry::with_defaults();
        assert!(registry.get("delete-data").is_none());
    }

    #[test]
    fn payload_config_toggle_applies() {
        let mut target = HealTarget::new("scheduler", "");
        apply_payload(
            &ActionPayload::ConfigToggle {
                key: "pool.max".into(),
                value: "16".into(),
            },
            &mut target,
        )
        .unwrap();
        assert_eq!(target.config.get("pool.max").map(String::as_str), Some("16"));
    }

    #[test]
    fn rollback_without_inverse_is_an_error() {
        let mut target = HealTarget::new("x", "y");
        assert!(apply_rollback(&RollbackPlan::None, &mut target).is_err());
        assert!(apply_rollback(&RollbackPlan::ReapplyFromBackup, &mut target).is_err());
    }

    #[test]
    fn rollback_inverse_applies_payload() {
        let mut target = HealTarget::new("x", "render_escaped(name)");
        apply_rollback(
            &RollbackPlan::Inverse(ActionPayload::CodePatch {
                find: "render_escaped(".into(),
                replace: "render_unsafe(".into(),
            }),
            &mut target,
        )
        .unwrap();
        assert_eq!(target.content, "render_unsafe(name)");
    }
}

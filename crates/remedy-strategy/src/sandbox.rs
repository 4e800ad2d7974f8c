//! Sandbox executor
//!
//! Applies a candidate action to an isolated copy of the target and checks
//! it before anything touches live state. A sandbox failure is always
//! recoverable: it routes the issue to human review, never to a fault.
//!
//! The check is threefold:
//! 1. `apply` succeeds on the copy
//! 2. the strategy's verification predicate holds on the result
//! 3. re-applying to the result changes nothing (idempotence)

use crate::error::StrategyError;
use crate::strategy::StrategyRegistry;
use crate::target::HealTarget;
use remedy_core::{HealingAction, StateDigest};
use std::sync::Arc;

/// Outcome of a sandbox run
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Whether the action may proceed to live apply
    pub passed: bool,
    /// Human-readable description of what the action changed
    pub diff: Option<String>,
    /// Failure descriptions, empty when passed
    pub errors: Vec<String>,
    /// Digest of the snapshot before apply
    pub before: StateDigest,
    /// Digest after apply (equals `before` when apply failed)
    pub after: StateDigest,
}

impl TestResult {
    fn failed(before: StateDigest, errors: Vec<String>) -> Self {
        Self {
            passed: false,
            diff: None,
            errors,
            before,
            after: before,
        }
    }
}

/// Runs candidate actions against isolated target copies
#[derive(Debug, Clone)]
pub struct SandboxExecutor {
    registry: Arc<StrategyRegistry>,
}

impl SandboxExecutor {
    /// Create executor over a strategy registry
    #[inline]
    #[must_use]
    pub fn new(registry: Arc<StrategyRegistry>) -> Self {
        Self { registry }
    }

    /// Test an action against a snapshot of the target
    ///
    /// Never touches `snapshot` itself; all work happens on clones.
    #[must_use]
    pub fn test(&self, action: &HealingAction, snapshot: &HealTarget) -> TestResult {
        let before = snapshot.digest();

        let Some(strategy) = self.registry.get(&action.strategy) else {
            return TestResult::failed(
                before,
                vec![StrategyError::UnknownStrategy(action.strategy.clone()).to_string()],
            );
        };

        let mut sandbox = snapshot.clone();
        if let Err(e) = strategy.apply(action, &mut sandbox) {
            tracing::warn!(strategy = %action.strategy, error = %e, "sandbox apply failed");
            return TestResult::failed(before, vec![format!("apply failed: {e}")]);
        }
        let after = sandbox.digest();

        let mut errors = Vec::new();
        if !strategy.verify(action, &sandbox) {
            errors.push("verification predicate failed on sandbox output".to_string());
        }

        // Idempotence: a second apply of the same action must be a no-op.
        let mut reapplied = sandbox.clone();
        match strategy.apply(action, &mut reapplied) {
            Ok(()) if reapplied.digest() != after => {
                errors.push("action is not idempotent: second apply changed state".to_string());
            }
            Err(e) => errors.push(format!("idempotence re-apply failed: {e}")),
            Ok(()) => {}
        }

        TestResult {
            passed: errors.is_empty(),
            diff: Some(describe_diff(snapshot, &sandbox)),
            errors,
            before,
            after,
        }
    }
}

/// Summarize what changed between two target states
fn describe_diff(before: &HealTarget, after: &HealTarget) -> String {
    let mut parts = Vec::new();
    if before.content != after.content {
        parts.push(format!(
            "content rewritten ({} -> {} bytes)",
            before.content.len(),
            after.content.len()
        ));
    }
    if before.open_handles != after.open_handles {
        parts.push(format!(
            "handles {} -> {}",
            before.open_handles.len(),
            after.open_handles.len()
        ));
    }
    let added: Vec<&str> = after
        .config
        .keys()
        .filter(|k| !before.config.contains_key(*k))
        .map(String::as_str)
        .collect();
    if !added.is_empty() {
        parts.push(format!("config keys added: {}", added.join(", ")));
    }
    if parts.is_empty() {
        "no observable change".to_string()
    } else {
        parts.join("; ")
    }
}

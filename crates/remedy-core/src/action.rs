//! Healing action model
//!
//! A [`HealingAction`] is a proposed or executed remediation. Payloads are a
//! tagged union ([`ActionPayload`]) because different strategies need
//! different shaped data: a code patch is not a config toggle is not a
//! log-redaction rule.

use crate::id::{ActionId, IssueId};
use serde::{Deserialize, Serialize};

/// Strategy-specific remediation payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionPayload {
    /// Textual find/replace over the target's content
    CodePatch {
        /// Pattern to replace (plain text)
        find: String,
        /// Replacement text; must not reintroduce `find`
        replace: String,
    },
    /// Set a configuration key on the target
    ConfigToggle {
        /// Config key
        key: String,
        /// New value
        value: String,
    },
    /// Redact a sensitive field wherever it appears in the target content
    RedactionRule {
        /// Field or pattern name being redacted
        field: String,
        /// Regex matching the sensitive values
        pattern: String,
        /// Replacement marker
        replacement: String,
    },
    /// Release a leaked handle/listener held by the target
    ResourceRelease {
        /// Identifier of the handle to release
        handle_id: String,
    },
    /// Install a circuit-breaker wrapper around an external dependency
    BreakerInstall {
        /// Dependency name
        dependency: String,
        /// Consecutive failures before opening
        failure_threshold: u32,
        /// Cooldown before half-open, seconds
        cooldown_secs: u64,
    },
}

impl ActionPayload {
    /// Short label for logging
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::CodePatch { .. } => "code_patch",
            Self::ConfigToggle { .. } => "config_toggle",
            Self::RedactionRule { .. } => "redaction_rule",
            Self::ResourceRelease { .. } => "resource_release",
            Self::BreakerInstall { .. } => "breaker_install",
        }
    }
}

/// Declared inverse of a healing action
///
/// Not a generic undo: redaction, for instance, is not invertible and
/// declares [`RollbackPlan::ReapplyFromBackup`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum RollbackPlan {
    /// Apply this payload to undo the action
    Inverse(ActionPayload),
    /// Not invertible; restore the target from backup
    ReapplyFromBackup,
    /// No rollback declared
    None,
}

impl RollbackPlan {
    /// Whether any rollback is available
    #[inline]
    #[must_use]
    pub fn is_available(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Lifecycle status of a healing action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    /// Proposed by a strategy, not yet tested
    Proposed,
    /// Passed the sandbox check
    SandboxTested,
    /// Approved by a human reviewer
    Approved,
    /// Applied to the live target
    Executed,
    /// Live apply faulted
    Failed,
    /// Rollback plan was invoked after a failure
    RolledBack,
}

impl ActionStatus {
    /// Whether the status is terminal
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Executed | Self::Failed | Self::RolledBack)
    }
}

/// A proposed or executed remediation
///
/// Owned by the agent brain for its lifetime; terminal states are audit
/// logged and the object may then be discarded (the audit record persists).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealingAction {
    /// Action id; never reused, a retry proposes a new action
    pub id: ActionId,
    /// Issue this action remediates
    pub issue_id: IssueId,
    /// Strategy that proposed it
    pub strategy: String,
    /// Human-readable description
    pub description: String,
    /// Strategy-specific change set
    pub payload: ActionPayload,
    /// Declared rollback
    pub rollback: RollbackPlan,
    /// Current lifecycle status
    pub status: ActionStatus,
}

impl HealingAction {
    /// Create a freshly proposed action
    #[must_use]
    pub fn proposed(
        issue_id: IssueId,
        strategy: impl Into<String>,
        description: impl Into<String>,
        payload: ActionPayload,
        rollback: RollbackPlan,
    ) -> Self {
        Self {
            id: ActionId::new(),
            issue_id,
            strategy: strategy.into(),
            description: description.into(),
            payload,
            rollback,
            status: ActionStatus::Proposed,
        }
    }

    /// Return a copy advanced to the given status
    #[inline]
    #[must_use]
    pub fn with_status(mut self, status: ActionStatus) -> Self {
        self.status = status;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patch() -> ActionPayload {
        ActionPayload::CodePatch {
            find: "render_unsafe(".into(),
            replace: "render_escaped(".into(),
        }
    }

    #[test]
    fn proposed_action_starts_proposed() {
        let action = HealingAction::proposed(
            IssueId::new(),
            "sanitize-unsafe-input",
            "escape templated output",
            patch(),
            RollbackPlan::None,
        );
        assert_eq!(action.status, ActionStatus::Proposed);
        assert!(!action.status.is_terminal());
    }

    #[test]
    fn executed_is_terminal() {
        assert!(ActionStatus::Executed.is_terminal());
        assert!(ActionStatus::Failed.is_terminal());
        assert!(!ActionStatus::SandboxTested.is_terminal());
    }

    #[test]
    fn rollback_availability() {
        assert!(RollbackPlan::ReapplyFromBackup.is_available());
        assert!(RollbackPlan::Inverse(patch()).is_available());
        assert!(!RollbackPlan::None.is_available());
    }

    #[test]
    fn payload_serde_is_tagged() {
        let json = serde_json::to_string(&patch()).unwrap();
        assert!(json.contains("\"kind\":\"code_patch\""));
    }
}

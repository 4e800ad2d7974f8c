//! Built-in healing strategies
//!
//! The minimum production set: input sanitization, query
//! parameterization, log redaction, leaked-handle release, and breaker
//! installation. Every apply is a pure payload interpretation, so
//! idempotence falls out of the payload semantics (replacements never
//! reintroduce the pattern they remove).

use crate::error::StrategyError;
use crate::strategy::{apply_payload, HealingStrategy};
use crate::target::HealTarget;
use remedy_core::{ActionPayload, HealingAction, Issue, RollbackPlan};

/// Pattern marking unescaped template rendering in host code
const UNSAFE_RENDER: &str = "render_unsafe(";
/// Escaped replacement
const SAFE_RENDER: &str = "render_escaped(";
/// Pattern marking string-concatenated SQL in host code
const CONCAT_SQL: &str = "concat_sql(";
/// Parameterized replacement
const BIND_SQL: &str = "bind_sql(";

fn first_resource(issue: &Issue) -> Option<&str> {
    issue.affected_resources.first().map(String::as_str)
}

/// Replaces unescaped template rendering with the escaping variant
#[derive(Debug, Clone, Copy, Default)]
pub struct SanitizeUnsafeInput;

impl HealingStrategy for SanitizeUnsafeInput {
    fn name(&self) -> &'static str {
        "sanitize-unsafe-input"
    }

    fn propose(&self, issue: &Issue) -> Result<HealingAction, StrategyError> {
        Ok(HealingAction::proposed(
            issue.id,
            self.name(),
            "replace unescaped template rendering with the escaping variant",
            ActionPayload::CodePatch {
                find: UNSAFE_RENDER.into(),
                replace: SAFE_RENDER.into(),
            },
            RollbackPlan::Inverse(ActionPayload::CodePatch {
                find: SAFE_RENDER.into(),
                replace: UNSAFE_RENDER.into(),
            }),
        ))
    }

    fn apply(
        &self,
        action: &HealingAction,
        target: &mut HealTarget,
    ) -> Result<(), StrategyError> {
        match &action.payload {
            payload @ ActionPayload::CodePatch { .. } => apply_payload(payload, target),
            _ => Err(StrategyError::PayloadMismatch {
                strategy: self.name().into(),
                expected: "code_patch",
            }),
        }
    }

    fn verify(&self, _action: &HealingAction, target: &HealTarget) -> bool {
        !target.content.contains(UNSAFE_RENDER)
    }
}

/// Replaces string-concatenated SQL with bound parameters
#[derive(Debug, Clone, Copy, Default)]
pub struct ParameterizeQuery;

impl HealingStrategy for ParameterizeQuery {
    fn name(&self) -> &'static str {
        "parameterize-query"
    }

    fn propose(&self, issue: &Issue) -> Result<HealingAction, StrategyError> {
        Ok(HealingAction::proposed(
            issue.id,
            self.name(),
            "replace string-concatenated query building with bound parameters",
            ActionPayload::CodePatch {
                find: CONCAT_SQL.into(),
                replace: BIND_SQL.into(),
            },
            RollbackPlan::Inverse(ActionPayload::CodePatch {
                find: BIND_SQL.into(),
                replace: CONCAT_SQL.into(),
            }),
        ))
    }

    fn apply(
        &self,
        action: &HealingAction,
        target: &mut HealTarget,
    ) -> Result<(), StrategyError> {
        match &action.payload {
            payload @ ActionPayload::CodePatch { .. } => apply_payload(payload, target),
            _ => Err(StrategyError::PayloadMismatch {
                strategy: self.name().into(),
                expected: "code_patch",
            }),
        }
    }

    fn verify(&self, _action: &HealingAction, target: &HealTarget) -> bool {
        !target.content.contains(CONCAT_SQL)
    }
}

/// Redacts sensitive values wherever they appear in the target content
///
/// Not invertible: the declared rollback is restore-from-backup.
#[derive(Debug, Clone, Copy, Default)]
pub struct RedactSensitiveLogField;

impl RedactSensitiveLogField {
    /// Default pattern: US SSN-like tokens, the leak the host application
    /// actually ships.
    const DEFAULT_PATTERN: &'static str = r"\b\d{3}-\d{2}-\d{4}\b";
}

impl HealingStrategy for RedactSensitiveLogField {
    fn name(&self) -> &'static str {
        "redact-sensitive-log-field"
    }

    fn propose(&self, issue: &Issue) -> Result<HealingAction, StrategyError> {
        let field = first_resource(issue).unwrap_or("ssn").to_string();
        Ok(HealingAction::proposed(
            issue.id,
            self.name(),
            format!("redact sensitive field '{field}' from logged output"),
            ActionPayload::RedactionRule {
                field,
                pattern: Self::DEFAULT_PATTERN.into(),
                replacement: "[REDACTED]".into(),
            },
            RollbackPlan::ReapplyFromBackup,
        ))
    }

    fn apply(
        &self,
        action: &HealingAction,
        target: &mut HealTarget,
    ) -> Result<(), StrategyError> {
        match &action.payload {
            payload @ ActionPayload::RedactionRule { .. } => apply_payload(payload, target),
            _ => Err(StrategyError::PayloadMismatch {
                strategy: self.name().into(),
                expected: "redaction_rule",
            }),
        }
    }

    fn verify(&self, action: &HealingAction, target: &HealTarget) -> bool {
        match &action.payload {
            ActionPayload::RedactionRule { pattern, .. } => regex::Regex::new(pattern)
                .map(|re| !re.is_match(&target.content))
                .unwrap_or(false),
            _ => false,
        }
    }
}

/// Releases a leaked handle or listener held by the target
///
/// Nothing to restore afterwards; the handle was already orphaned.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReleaseLeakedHandle;

impl HealingStrategy for ReleaseLeakedHandle {
    fn name(&self) -> &'static str {
        "release-leaked-handle"
    }

    fn propose(&self, issue: &Issue) -> Result<HealingAction, StrategyError> {
        let handle_id = first_resource(issue)
            .ok_or_else(|| {
                StrategyError::ProposalFailed("no affected resource names the leaked handle".into())
            })?
            .to_string();
        Ok(HealingAction::proposed(
            issue.id,
            self.name(),
            format!("release leaked handle '{handle_id}'"),
            ActionPayload::ResourceRelease { handle_id },
            RollbackPlan::None,
        ))
    }

    fn apply(
        &self,
        action: &HealingAction,
        target: &mut HealTarget,
    ) -> Result<(), StrategyError> {
        match &action.payload {
            payload @ ActionPayload::ResourceRelease { .. } => apply_payload(payload, target),
            _ => Err(StrategyError::PayloadMismatch {
                strategy: self.name().into(),
                expected: "resource_release",
            }),
        }
    }

    fn verify(&self, action: &HealingAction, target: &HealTarget) -> bool {
        match &action.payload {
            ActionPayload::ResourceRelease { handle_id } => {
                !target.open_handles.iter().any(|h| h == handle_id)
            }
            _ => false,
        }
    }
}

/// Installs a circuit-breaker wrapper around a flapping dependency
#[derive(Debug, Clone, Copy, Default)]
pub struct InstallBreakerWrapper;

impl HealingStrategy for InstallBreakerWrapper {
    fn name(&self) -> &'static str {
        "install-circuit-breaker-wrapper"
    }

    fn propose(&self, issue: &Issue) -> Result<HealingAction, StrategyError> {
        let dependency = first_resource(issue).unwrap_or("external-dependency").to_string();
        let key = format!("breaker.{dependency}");
        Ok(HealingAction::proposed(
            issue.id,
            self.name(),
            format!("wrap calls to '{dependency}' in a circuit breaker"),
            ActionPayload::BreakerInstall {
                dependency,
                failure_threshold: 3,
                cooldown_secs: 30,
            },
            RollbackPlan::Inverse(ActionPayload::ConfigToggle {
                key,
                value: "disabled".into(),
            }),
        ))
    }

    fn apply(
        &self,
        action: &HealingAction,
        target: &mut HealTarget,
    ) -> Result<(), StrategyError> {
        match &action.payload {
            payload @ ActionPayload::BreakerInstall { .. } => apply_payload(payload, target),
            _ => Err(StrategyError::PayloadMismatch {
                strategy: self.name().into(),
                expected: "breaker_install",
            }),
        }
    }

    fn verify(&self, action: &HealingAction, target: &HealTarget) -> bool {
        match &action.payload {
            ActionPayload::BreakerInstall { dependency, .. } => target
                .config
                .get(&format!("breaker.{dependency}"))
                .map(|v| v == "enabled")
                .unwrap_or(false),
            _ => false,
        }
    }
}

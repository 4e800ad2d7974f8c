//! Agent-level errors

use remedy_audit::AuditError;
use remedy_core::IssueId;
use remedy_strategy::StrategyError;
use thiserror::Error;

/// Errors surfaced by the agent brain
#[derive(Debug, Error)]
pub enum AgentError {
    /// Audit recording or querying failed; audit completeness outranks
    /// healing availability, so these are never swallowed
    #[error("audit failure: {0}")]
    Audit(#[from] AuditError),

    /// A strategy faulted outside the pipeline's handled paths
    #[error("strategy failure: {0}")]
    Strategy(#[from] StrategyError),

    /// Approval referenced an issue with no pending decision
    #[error("no pending approval for issue {0}")]
    UnknownIssue(IssueId),

    /// Configuration could not be parsed or compiled
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<serde_yaml::Error> for AgentError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Config(e.to_string())
    }
}

impl From<regex::Error> for AgentError {
    fn from(e: regex::Error) -> Self {
        Self::Config(format!("redaction pattern: {e}"))
    }
}

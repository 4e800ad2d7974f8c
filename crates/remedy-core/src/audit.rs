//! Audit record model
//!
//! [`AuditEntry`] is the unit of compliance evidence: one immutable record
//! per pipeline-stage outcome, chained to its causal parent so entries for a
//! single issue are totally ordered.

use crate::action::HealingAction;
use crate::digest::StateDigest;
use crate::id::{CorrelationId, EntryId, IssueId};
use crate::issue::Issue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pipeline stage an entry records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Issue classified by the analyzer
    Classified,
    /// Safety validation evaluated
    Validated,
    /// Rate limiter / circuit breaker consulted
    Gated,
    /// Sandbox test executed
    Sandboxed,
    /// Live apply attempted
    Applied,
    /// External approval resolved
    ApprovalResolved,
}

/// Outcome recorded for a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Stage completed as intended
    Success,
    /// Denied by safety policy
    Blocked,
    /// Deferred by rate limiter or open breaker
    Throttled,
    /// Stage faulted
    Failed,
    /// Routed to human review
    PendingReview,
}

/// Who performed the recorded step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Actor {
    /// The autonomous agent
    Agent,
    /// A human approver
    Human {
        /// Approver identifier
        id: String,
    },
}

/// Snapshot of a rate-limit window at decision time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateSnapshot {
    /// Slots consumed in the current window
    pub used: u32,
    /// Window capacity
    pub max: u32,
    /// Window length in seconds
    pub window_secs: u64,
}

/// Outcome of validating an issue + strategy pair
///
/// Ephemeral: computed fresh per evaluation and persisted only inside the
/// audit entry that records the validation stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyDecision {
    /// Whether the strategy may run at all
    pub allowed: bool,
    /// Rationale, suitable for the audit trail
    pub reason: String,
    /// Whether a human must approve before live apply
    pub required_approval: bool,
    /// Rate-limit window state at evaluation time, if consulted
    pub rate_limit: Option<RateSnapshot>,
}

impl SafetyDecision {
    /// Allow without approval
    #[must_use]
    pub fn allow(reason: impl Into<String>) -> Self {
        Self {
            allowed: true,
            reason: reason.into(),
            required_approval: false,
            rate_limit: None,
        }
    }

    /// Allow but require human approval
    #[must_use]
    pub fn needs_approval(reason: impl Into<String>) -> Self {
        Self {
            allowed: true,
            reason: reason.into(),
            required_approval: true,
            rate_limit: None,
        }
    }

    /// Deny outright
    #[must_use]
    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
            required_approval: false,
            rate_limit: None,
        }
    }

    /// Attach a rate-limit snapshot
    #[inline]
    #[must_use]
    pub fn with_rate_snapshot(mut self, snapshot: RateSnapshot) -> Self {
        self.rate_limit = Some(snapshot);
        self
    }
}

/// Permanent record of one pipeline-stage outcome
///
/// Append-only: never mutated after insert, retained per the configured
/// retention policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Entry id (sortable)
    pub id: EntryId,
    /// Causal parent: the previous stage's entry for this issue
    pub parent: Option<EntryId>,
    /// Correlation id of the originating event
    pub correlation_id: CorrelationId,
    /// Issue id
    pub issue_id: IssueId,
    /// Stage recorded
    pub stage: PipelineStage,
    /// Outcome of the stage
    pub outcome: Outcome,
    /// Full issue snapshot
    pub issue: Issue,
    /// Action snapshot, if one existed at this stage
    pub action: Option<HealingAction>,
    /// Safety decision snapshot, if one was evaluated
    pub decision: Option<SafetyDecision>,
    /// Target state digest before the stage, if applicable
    pub before: Option<StateDigest>,
    /// Target state digest after the stage, if applicable
    pub after: Option<StateDigest>,
    /// Who performed the step
    pub actor: Actor,
    /// Free-form note (throttle reason, failure message, approver note)
    pub note: Option<String>,
    /// When the entry was recorded
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    /// Create an entry for a stage outcome
    #[must_use]
    pub fn new(issue: &Issue, stage: PipelineStage, outcome: Outcome) -> Self {
        Self {
            id: EntryId::new(),
            parent: None,
            correlation_id: issue.correlation_id,
            issue_id: issue.id,
            stage,
            outcome,
            issue: issue.clone(),
            action: None,
            decision: None,
            before: None,
            after: None,
            actor: Actor::Agent,
            note: None,
            timestamp: Utc::now(),
        }
    }

    /// Chain to the causal parent entry
    #[inline]
    #[must_use]
    pub fn with_parent(mut self, parent: EntryId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Attach the action snapshot
    #[inline]
    #[must_use]
    pub fn with_action(mut self, action: HealingAction) -> Self {
        self.action = Some(action);
        self
    }

    /// Attach the safety decision snapshot
    #[inline]
    #[must_use]
    pub fn with_decision(mut self, decision: SafetyDecision) -> Self {
        self.decision = Some(decision);
        self
    }

    /// Attach before/after digests
    #[inline]
    #[must_use]
    pub fn with_digests(mut self, before: StateDigest, after: StateDigest) -> Self {
        self.before = Some(before);
        self.after = Some(after);
        self
    }

    /// Record a human actor
    #[inline]
    #[must_use]
    pub fn by_human(mut self, approver_id: impl Into<String>) -> Self {
        self.actor = Actor::Human {
            id: approver_id.into(),
        };
        self
    }

    /// Attach a note
    #[inline]
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::{Category, IssueContext, Severity};

    fn issue() -> Issue {
        Issue {
            id: IssueId::new(),
            correlation_id: CorrelationId::new(),
            created_at: Utc::now(),
            signature_id: "unsanitized-input".into(),
            category: Category::SecurityVulnerability,
            severity: Severity::Medium,
            affected_resources: vec!["intake-form.rs".into()],
            context: IssueContext {
                message: "raw input rendered".into(),
                stack: None,
                actor_id: None,
                session_id: None,
            },
        }
    }

    #[test]
    fn entry_snapshots_issue() {
        let issue = issue();
        let entry = AuditEntry::new(&issue, PipelineStage::Classified, Outcome::Success);
        assert_eq!(entry.issue_id, issue.id);
        assert_eq!(entry.correlation_id, issue.correlation_id);
        assert!(entry.parent.is_none());
    }

    #[test]
    fn parent_chain_builds() {
        let issue = issue();
        let first = AuditEntry::new(&issue, PipelineStage::Classified, Outcome::Success);
        let second = AuditEntry::new(&issue, PipelineStage::Validated, Outcome::Success)
            .with_parent(first.id);
        assert_eq!(second.parent, Some(first.id));
        // Ids minted in the same millisecond order by their random bits, so
        // only the wall clock is comparable here.
        assert!(first.timestamp <= second.timestamp);
    }

    #[test]
    fn decision_constructors() {
        assert!(SafetyDecision::allow("ok").allowed);
        assert!(SafetyDecision::needs_approval("critical").required_approval);
        let deny = SafetyDecision::deny("denylisted");
        assert!(!deny.allowed && !deny.required_approval);
    }

    #[test]
    fn human_actor_recorded() {
        let issue = issue();
        let entry = AuditEntry::new(&issue, PipelineStage::ApprovalResolved, Outcome::Success)
            .by_human("dr-reyes");
        assert_eq!(
            entry.actor,
            Actor::Human {
                id: "dr-reyes".into()
            }
        );
    }
}

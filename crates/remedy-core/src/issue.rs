//! Issue model
//!
//! An [`Issue`] is a classified problem instance produced by the analyzer.
//! Issues are immutable once created: severity is never recomputed, and
//! re-analysis creates a fresh issue linked by [`CorrelationId`].

use crate::id::{CorrelationId, IssueId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Issue severity
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational; healed opportunistically
    #[default]
    Low,
    /// Worth healing promptly
    Medium,
    /// Heal as soon as gates allow
    High,
    /// Never healed autonomously; always requires approval
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        };
        write!(f, "{s}")
    }
}

/// Issue category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Injection, unsanitized input, credential exposure
    SecurityVulnerability,
    /// Slow queries, timeouts, saturation
    PerformanceDegradation,
    /// Leaked handles, listeners, connections
    ResourceLeak,
    /// Corrupt or inconsistent records
    DataIntegrity,
    /// Dependency outages, repeated delivery failures
    Availability,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::SecurityVulnerability => "security_vulnerability",
            Self::PerformanceDegradation => "performance_degradation",
            Self::ResourceLeak => "resource_leak",
            Self::DataIntegrity => "data_integrity",
            Self::Availability => "availability",
        };
        write!(f, "{s}")
    }
}

/// Raw event as submitted by the surrounding application
///
/// This is the inbound boundary type: unclassified, untrusted, and always
/// accepted (classification never rejects an event).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
    /// Error or anomaly message
    pub message: String,
    /// Stack trace, if the event came from an unhandled exception
    pub stack: Option<String>,
    /// Acting user/session principal, if known
    pub actor_id: Option<String>,
    /// Hint at the affected resource (file, component, record)
    pub resource_hint: Option<String>,
    /// When the event occurred
    pub timestamp: DateTime<Utc>,
}

impl RawEvent {
    /// Create event with just a message, timestamped now
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack: None,
            actor_id: None,
            resource_hint: None,
            timestamp: Utc::now(),
        }
    }

    /// Attach a stack trace
    #[inline]
    #[must_use]
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Attach the acting principal
    #[inline]
    #[must_use]
    pub fn with_actor(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = Some(actor_id.into());
        self
    }

    /// Attach a resource hint
    #[inline]
    #[must_use]
    pub fn with_resource(mut self, hint: impl Into<String>) -> Self {
        self.resource_hint = Some(hint.into());
        self
    }

    /// Whether this event looks like an unhandled exception
    ///
    /// Used by the unknown-signature fallback to derive severity.
    #[inline]
    #[must_use]
    pub fn is_unhandled(&self) -> bool {
        self.stack.is_some()
    }
}

/// Raw context captured alongside a classified issue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueContext {
    /// Original error message
    pub message: String,
    /// Stack trace if present
    pub stack: Option<String>,
    /// Acting principal if known
    pub actor_id: Option<String>,
    /// Session identifier if known
    pub session_id: Option<String>,
}

impl From<&RawEvent> for IssueContext {
    fn from(event: &RawEvent) -> Self {
        Self {
            message: event.message.clone(),
            stack: event.stack.clone(),
            actor_id: event.actor_id.clone(),
            session_id: None,
        }
    }
}

/// A classified problem instance
///
/// Immutable once constructed. Never deleted, only referenced from audit
/// entries and pending approvals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    /// Issue id
    pub id: IssueId,
    /// Correlation id shared across pipeline passes over the same event
    pub correlation_id: CorrelationId,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Matched signature id ("unknown" when nothing matched)
    pub signature_id: String,
    /// Issue category
    pub category: Category,
    /// Severity, fixed at classification time
    pub severity: Severity,
    /// Resources this issue touches (files, components, records)
    pub affected_resources: Vec<String>,
    /// Raw context from the originating event
    pub context: IssueContext,
}

impl Issue {
    /// Blast radius: number of affected resources
    #[inline]
    #[must_use]
    pub fn blast_radius(&self) -> usize {
        self.affected_resources.len()
    }

    /// Whether the issue is critical
    #[inline]
    #[must_use]
    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }
}

//! Audit store abstraction
//!
//! The agent treats durable storage as an interface with at-least-once
//! append semantics and a filterable query; the concrete database behind it
//! is a deployment concern.

use crate::error::AuditError;
use chrono::{DateTime, Utc};
use remedy_core::{AuditEntry, Outcome, Severity};
use tokio::sync::RwLock;

/// Filter for audit queries
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    /// Entries at or after this time
    pub from: Option<DateTime<Utc>>,
    /// Entries before this time
    pub to: Option<DateTime<Utc>>,
    /// Only entries whose issue severity is at least this
    pub min_severity: Option<Severity>,
    /// Only entries with this outcome
    pub outcome: Option<Outcome>,
}

impl AuditQuery {
    /// Match-everything query
    #[inline]
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Restrict to a time range
    #[inline]
    #[must_use]
    pub fn between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    /// Restrict to a minimum severity
    #[inline]
    #[must_use]
    pub fn with_min_severity(mut self, severity: Severity) -> Self {
        self.min_severity = Some(severity);
        self
    }

    /// Restrict to an outcome
    #[inline]
    #[must_use]
    pub fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    /// Whether an entry passes the filter
    #[must_use]
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        if let Some(from) = self.from {
            if entry.timestamp < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if entry.timestamp >= to {
                return false;
            }
        }
        if let Some(min) = self.min_severity {
            if entry.issue.severity < min {
                return false;
            }
        }
        if let Some(outcome) = self.outcome {
            if entry.outcome != outcome {
                return false;
            }
        }
        true
    }
}

/// Durable append-only store for audit entries
#[async_trait::async_trait]
pub trait AuditStore: Send + Sync {
    /// Durably append one entry
    ///
    /// At-least-once: the caller may retry after an error, and duplicate
    /// entry ids are tolerated downstream.
    async fn append(&self, entry: &AuditEntry) -> Result<(), AuditError>;

    /// Query entries matching a filter, in insertion order
    async fn query(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>, AuditError>;

    /// Delete entries older than `before`; returns the number removed
    async fn prune(&self, before: DateTime<Utc>) -> Result<usize, AuditError>;
}

/// In-memory store, for tests and single-process deployments
#[derive(Debug, Default)]
pub struct InMemoryAuditStore {
    entries: RwLock<Vec<AuditEntry>>,
}

impl InMemoryAuditStore {
    /// Create empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Check if store is empty
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn append(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        self.entries.write().await.push(entry.clone());
        Ok(())
    }

    async fn query(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>, AuditError> {
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .filter(|e| query.matches(e))
            .cloned()
            .collect())
    }

    async fn prune(&self, before: DateTime<Utc>) -> Result<usize, AuditError> {
        let mut entries = self.entries.write().await;
        let initial = entries.len();
        entries.retain(|e| e.timestamp >= before);
        Ok(initial - entries.len())
    }
}

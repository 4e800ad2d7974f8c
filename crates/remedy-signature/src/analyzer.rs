//! Issue analyzer
//!
//! Classifies raw events against the signature catalog. Classification is
//! referentially transparent given identical inputs (ids and timestamps
//! aside) and never fails: an unmatched event degrades to the synthetic
//! "unknown" signature so downstream audit logging always proceeds.

use crate::catalog::SignatureCatalog;
use remedy_core::{Category, CorrelationId, Issue, IssueContext, IssueId, RawEvent, Severity};
use std::sync::Arc;

/// Signature id assigned when nothing in the catalog matches
pub const UNKNOWN_SIGNATURE: &str = "unknown";

/// Classifies incoming events into issues
#[derive(Debug, Clone)]
pub struct IssueAnalyzer {
    catalog: Arc<SignatureCatalog>,
}

impl IssueAnalyzer {
    /// Create analyzer over a catalog
    #[inline]
    #[must_use]
    pub fn new(catalog: Arc<SignatureCatalog>) -> Self {
        Self { catalog }
    }

    /// Classify a raw event into an issue
    ///
    /// Never errors. A fresh [`CorrelationId`] is minted; use
    /// [`IssueAnalyzer::reanalyze`] when re-examining a known event so the
    /// audit trail links the passes.
    #[must_use]
    pub fn analyze(&self, event: &RawEvent) -> Issue {
        self.classify(event, CorrelationId::new())
    }

    /// Re-classify an event under an existing correlation id
    ///
    /// Produces a new issue; the original issue's severity is never
    /// recomputed in place.
    #[must_use]
    pub fn reanalyze(&self, event: &RawEvent, correlation_id: CorrelationId) -> Issue {
        self.classify(event, correlation_id)
    }

    fn classify(&self, event: &RawEvent, correlation_id: CorrelationId) -> Issue {
        let (signature_id, category, severity) = match self.catalog.best_match(&event.message) {
            Some(signature) => {
                tracing::debug!(
                    signature = %signature.id,
                    category = %signature.category,
                    "event matched catalog signature"
                );
                (
                    signature.id.clone(),
                    signature.category,
                    signature.default_severity,
                )
            }
            None => {
                let severity = if event.is_unhandled() {
                    Severity::High
                } else {
                    Severity::Low
                };
                tracing::debug!(severity = %severity, "no signature matched, using unknown path");
                (
                    UNKNOWN_SIGNATURE.to_string(),
                    guess_category(&event.message),
                    severity,
                )
            }
        };

        Issue {
            id: IssueId::new(),
            correlation_id,
            created_at: event.timestamp,
            signature_id,
            category,
            severity,
            affected_resources: affected_resources(event),
            context: IssueContext::from(event),
        }
    }

    /// Suggested strategy for an issue's signature, if the catalog knows one
    #[must_use]
    pub fn suggested_strategy(&self, issue: &Issue) -> Option<String> {
        self.catalog
            .get(&issue.signature_id)
            .map(|s| s.suggested_strategy.clone())
    }

    /// Catalog reference
    #[inline]
    #[must_use]
    pub fn catalog(&self) -> &SignatureCatalog {
        &self.catalog
    }
}

/// Split the resource hint into a resource list
fn affected_resources(event: &RawEvent) -> Vec<String> {
    event
        .resource_hint
        .as_deref()
        .map(|hint| {
            hint.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

/// Coarse category guess for unmatched events
fn guess_category(message: &str) -> Category {
    let lower = message.to_lowercase();
    if lower.contains("leak") {
        Category::ResourceLeak
    } else if lower.contains("slow") || lower.contains("latency") {
        Category::PerformanceDegradation
    } else if lower.contains("corrupt") || lower.contains("mismatch") {
        Category::DataIntegrity
    } else if lower.contains("inject") || lower.contains("auth") {
        Category::SecurityVulnerability
    } else {
        Category::Availability
    }
}

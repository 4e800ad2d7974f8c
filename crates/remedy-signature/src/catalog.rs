//! Signature catalog
//!
//! A static table of known issue patterns. Pure data plus a matching
//! function; constructed once at startup and read-only at runtime
//! (reloadable only via a whole-config swap).

use remedy_core::{Category, Severity};
use serde::{Deserialize, Serialize};

/// How a signature matches an event message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Matcher {
    /// Message equals this token exactly (e.g. a stable error code)
    Exact(String),
    /// Message contains this fragment (case-insensitive)
    Substring(String),
    /// Message contains any of these keywords (case-insensitive);
    /// the least specific tier, a category default
    Keywords(Vec<String>),
}

impl Matcher {
    /// Specificity rank; higher wins when several signatures match
    #[inline]
    #[must_use]
    pub fn specificity(&self) -> u8 {
        match self {
            Self::Exact(_) => 3,
            Self::Substring(_) => 2,
            Self::Keywords(_) => 1,
        }
    }

    /// Test a message against this matcher
    #[must_use]
    pub fn matches(&self, message: &str) -> bool {
        let lower = message.to_lowercase();
        match self {
            Self::Exact(token) => message == token,
            Self::Substring(fragment) => lower.contains(&fragment.to_lowercase()),
            Self::Keywords(words) => words.iter().any(|w| lower.contains(&w.to_lowercase())),
        }
    }
}

/// A known issue pattern
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signature {
    /// Stable signature id
    pub id: String,
    /// Matching rule
    pub matcher: Matcher,
    /// Category assigned on match
    pub category: Category,
    /// Default severity assigned on match
    pub default_severity: Severity,
    /// Strategy the healing library should propose
    pub suggested_strategy: String,
}

/// Catalog of known signatures
///
/// Matching picks the most specific matcher (exact over substring over
/// keyword default); among equally specific matches, first registered wins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignatureCatalog {
    signatures: Vec<Signature>,
}

impl SignatureCatalog {
    /// Create empty catalog
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            signatures: Vec::new(),
        }
    }

    /// Create catalog with the built-in signatures
    ///
    /// One entry per built-in healing strategy, plus exact codes emitted by
    /// the host application's template and query layers.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut catalog = Self::new();
        catalog.register(Signature {
            id: "template-injection".into(),
            matcher: Matcher::Exact("ERR_UNSANITIZED_TEMPLATE".into()),
            category: Category::SecurityVulnerability,
            default_severity: Severity::High,
            suggested_strategy: "sanitize-unsafe-input".into(),
        });
        catalog.register(Signature {
            id: "unsanitized-input".into(),
            matcher: Matcher::Substring("unsanitized".into()),
            category: Category::SecurityVulnerability,
            default_severity: Severity::Medium,
            suggested_strategy: "sanitize-unsafe-input".into(),
        });
        catalog.register(Signature {
            id: "sql-string-concat".into(),
            matcher: Matcher::Substring("concatenat".into()),
            category: Category::SecurityVulnerability,
            default_severity: Severity::High,
            suggested_strategy: "parameterize-query".into(),
        });
        catalog.register(Signature {
            id: "sensitive-log-leak".into(),
            matcher: Matcher::Keywords(vec!["ssn".into(), "phi".into(), "sensitive".into()]),
            category: Category::DataIntegrity,
            default_severity: Severity::High,
            suggested_strategy: "redact-sensitive-log-field".into(),
        });
        catalog.register(Signature {
            id: "leaked-handle".into(),
            matcher: Matcher::Substring("leak".into()),
            category: Category::ResourceLeak,
            default_severity: Severity::Medium,
            suggested_strategy: "release-leaked-handle".into(),
        });
        catalog.register(Signature {
            id: "dependency-flapping".into(),
            matcher: Matcher::Keywords(vec![
                "timeout".into(),
                "unreachable".into(),
                "connection refused".into(),
            ]),
            category: Category::Availability,
            default_severity: Severity::Medium,
            suggested_strategy: "install-circuit-breaker-wrapper".into(),
        });
        catalog.register(Signature {
            id: "slow-query".into(),
            matcher: Matcher::Substring("slow query".into()),
            category: Category::PerformanceDegradation,
            default_severity: Severity::Low,
            suggested_strategy: "parameterize-query".into(),
        });
        catalog
    }

    /// Register a signature
    pub fn register(&mut self, signature: Signature) {
        self.signatures.push(signature);
    }

    /// Find the best match for a message
    ///
    /// Returns `None` when no signature matches; callers degrade to the
    /// unknown-signature path rather than erroring.
    #[must_use]
    pub fn best_match(&self, message: &str) -> Option<&Signature> {
        let mut best: Option<&Signature> = None;
        for signature in &self.signatures {
            if !signature.matcher.matches(message) {
                continue;
            }
            // Strictly-greater comparison keeps the first of equal rank.
            let beats = best
                .map(|b| signature.matcher.specificity() > b.matcher.specificity())
                .unwrap_or(true);
            if beats {
                best = Some(signature);
            }
        }
        best
    }

    /// Look up a signature by id
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Signature> {
        self.signatures.iter().find(|s| s.id == id)
    }

    /// Number of registered signatures
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    /// Check if catalog is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    /// Iterate over signatures
    pub fn iter(&self) -> impl Iterator<Item = &Signature> {
        self.signatures.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_populated() {
        let catalog = SignatureCatalog::with_defaults();
        assert_eq!(catalog.len(), 7);
        assert!(catalog.get("unsanitized-input").is_some());
    }

    #[test]
    fn exact_beats_substring() {
        let catalog = SignatureCatalog::with_defaults();
        // "ERR_UNSANITIZED_TEMPLATE" also contains "unsanitized"
        let hit = catalog.best_match("ERR_UNSANITIZED_TEMPLATE").unwrap();
        assert_eq!(hit.id, "template-injection");
    }

    #[test]
    fn substring_beats_keywords() {
        let mut catalog = SignatureCatalog::new();
        catalog.register(Signature {
            id: "keyword".into(),
            matcher: Matcher::Keywords(vec!["leak".into()]),
            category: Category::ResourceLeak,
            default_severity: Severity::Low,
            suggested_strategy: "release-leaked-handle".into(),
        });
        catalog.register(Signature {
            id: "substring".into(),
            matcher: Matcher::Substring("listener leak".into()),
            category: Category::ResourceLeak,
            default_severity: Severity::Medium,
            suggested_strategy: "release-leaked-handle".into(),
        });
        let hit = catalog.best_match("listener leak in ward monitor").unwrap();
        assert_eq!(hit.id, "substring");
    }

    #[test]
    fn first_registered_wins_ties() {
        let mut catalog = SignatureCatalog::new();
        catalog.register(Signature {
            id: "a".into(),
            matcher: Matcher::Substring("timeout".into()),
            category: Category::Availability,
            default_severity: Severity::Low,
            suggested_strategy: "install-circuit-breaker-wrapper".into(),
        });
        catalog.register(Signature {
            id: "b".into(),
            matcher: Matcher::Substring("timeout".into()),
            category: Category::Availability,
            default_severity: Severity::Low,
            suggested_strategy: "install-circuit-breaker-wrapper".into(),
        });
        assert_eq!(catalog.best_match("timeout").unwrap().id, "a");
    }

    #[test]
    fn matching_is_case_insensitive_for_substring() {
        let catalog = SignatureCatalog::with_defaults();
        let hit = catalog.best_match("Connection LEAK detected").unwrap();
        assert_eq!(hit.id, "leaked-handle");
    }

    #[test]
    fn no_match_returns_none() {
        let catalog = SignatureCatalog::with_defaults();
        assert!(catalog.best_match("perfectly healthy").is_none());
    }
}

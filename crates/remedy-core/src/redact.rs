//! Redacting log middleware
//!
//! Every component logs through an injected [`RedactingLogger`] capability
//! rather than calling `tracing` macros on raw messages, so sensitive values
//! (identifiers, card numbers, secrets) are filtered at a single choke point
//! instead of being intercepted after the fact.

use regex::Regex;
use std::sync::Arc;

/// A single redaction pattern
#[derive(Debug, Clone)]
pub struct RedactionPattern {
    /// Rule name, for diagnostics
    pub name: String,
    /// Values matching this are replaced
    pub pattern: Regex,
    /// Replacement marker
    pub replacement: String,
}

impl RedactionPattern {
    /// Create a pattern
    ///
    /// # Errors
    /// Returns the regex compile error for an invalid pattern
    pub fn new(
        name: impl Into<String>,
        pattern: &str,
        replacement: impl Into<String>,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.into(),
            pattern: Regex::new(pattern)?,
            replacement: replacement.into(),
        })
    }
}

/// Shared, immutable redaction filter applied to every emitted log line
#[derive(Debug, Clone, Default)]
pub struct RedactingLogger {
    patterns: Arc<Vec<RedactionPattern>>,
}

impl RedactingLogger {
    /// Create a logger with no patterns (pass-through)
    #[inline]
    #[must_use]
    pub fn new(patterns: Vec<RedactionPattern>) -> Self {
        Self {
            patterns: Arc::new(patterns),
        }
    }

    /// Create a logger with the built-in sensitive-data patterns
    ///
    /// Covers US SSN-like tokens, 13-16 digit card-like runs, and
    /// `key=value` secrets.
    #[must_use]
    pub fn with_defaults() -> Self {
        let patterns = vec![
            RedactionPattern::new("ssn", r"\b\d{3}-\d{2}-\d{4}\b", "[REDACTED:ssn]"),
            RedactionPattern::new("card", r"\b\d{13,16}\b", "[REDACTED:card]"),
            RedactionPattern::new(
                "secret",
                r"(?i)\b(password|secret|token|api_key)\s*[=:]\s*\S+",
                "[REDACTED:secret]",
            ),
        ];
        // Built-in patterns are static and known-valid.
        Self::new(patterns.into_iter().collect::<Result<_, _>>().unwrap_or_default())
    }

    /// Apply every pattern to a message
    #[must_use]
    pub fn redact(&self, message: &str) -> String {
        let mut out = message.to_string();
        for rule in self.patterns.iter() {
            out = rule
                .pattern
                .replace_all(&out, rule.replacement.as_str())
                .into_owned();
        }
        out
    }

    /// Emit at info level after redaction
    pub fn info(&self, component: &str, message: &str) {
        tracing::info!(component, "{}", self.redact(message));
    }

    /// Emit at warn level after redaction
    pub fn warn(&self, component: &str, message: &str) {
        tracing::warn!(component, "{}", self.redact(message));
    }

    /// Emit at error level after redaction
    pub fn error(&self, component: &str, message: &str) {
        tracing::error!(component, "{}", self.redact(message));
    }

    /// Number of configured patterns
    #[inline]
    #[must_use]
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }
}

//! Agent configuration
//!
//! One [`AgentConfig`] covers the whole pipeline: catalog, safety policy,
//! gate tuning, audit tuning, monitor rules and redaction filters. It is
//! read-only at runtime; the brain replaces it only through
//! [`crate::AgentBrain::reload`], which bumps a version counter so audit
//! notes and dashboards can name the config generation in force.

use crate::error::AgentError;
use remedy_alert::MonitorConfig;
use remedy_audit::AuditConfig;
use remedy_core::{RedactingLogger, RedactionPattern};
use remedy_gate::{BreakerConfig, RateLimitConfig};
use remedy_safety::SafetyPolicy;
use remedy_signature::SignatureCatalog;
use serde::{Deserialize, Serialize};

/// Serializable form of a redaction rule
///
/// [`RedactionPattern`] holds a compiled regex; config files carry the
/// source text and compile on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactionRuleConfig {
    /// Rule name, for diagnostics
    pub name: String,
    /// Regex source
    pub pattern: String,
    /// Replacement marker
    pub replacement: String,
}

/// Whole-pipeline configuration, swapped as one unit
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Known issue signatures
    pub catalog: SignatureCatalog,
    /// Safety policy (denylist, blast-radius threshold)
    pub policy: SafetyPolicy,
    /// Per-strategy rate-limit window
    pub rate_limit: RateLimitConfig,
    /// Per-resource circuit-breaker tuning
    pub breaker: BreakerConfig,
    /// Audit logger tuning
    pub audit: AuditConfig,
    /// Realtime monitor rules
    pub monitor: MonitorConfig,
    /// Redaction rules applied to every log line; empty means the
    /// built-in sensitive-data patterns
    pub redaction: Vec<RedactionRuleConfig>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            catalog: SignatureCatalog::with_defaults(),
            policy: SafetyPolicy::with_defaults(),
            rate_limit: RateLimitConfig::default(),
            breaker: BreakerConfig::default(),
            audit: AuditConfig::default(),
            monitor: MonitorConfig::default(),
            redaction: Vec::new(),
        }
    }
}

impl AgentConfig {
    /// Parse a YAML config document
    ///
    /// Absent sections fall back to defaults, so a deployment overrides
    /// only what it tunes.
    ///
    /// # Errors
    /// Returns [`AgentError::Config`] on malformed YAML.
    pub fn from_yaml(source: &str) -> Result<Self, AgentError> {
        Ok(serde_yaml::from_str(source)?)
    }

    /// Serialize to YAML
    ///
    /// # Errors
    /// Returns [`AgentError::Config`] when serialization fails.
    pub fn to_yaml(&self) -> Result<String, AgentError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Replace the safety policy
    #[must_use]
    pub fn with_policy(mut self, policy: SafetyPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the rate-limit tuning
    #[must_use]
    pub fn with_rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    /// Replace the breaker tuning
    #[must_use]
    pub fn with_breaker(mut self, breaker: BreakerConfig) -> Self {
        self.breaker = breaker;
        self
    }

    /// Replace the audit tuning
    #[must_use]
    pub fn with_audit(mut self, audit: AuditConfig) -> Self {
        self.audit = audit;
        self
    }

    /// Replace the monitor rules
    #[must_use]
    pub fn with_monitor(mut self, monitor: MonitorConfig) -> Self {
        self.monitor = monitor;
        self
    }

    /// Build the redacting logger this config describes
    ///
    /// # Errors
    /// Returns [`AgentError::Config`] for an uncompilable pattern.
    pub fn build_logger(&self) -> Result<RedactingLogger, AgentError> {
        if self.redaction.is_empty() {
            return Ok(RedactingLogger::with_defaults());
        }
        let patterns = self
            .redaction
            .iter()
            .map(|rule| RedactionPattern::new(&rule.name, &rule.pattern, &rule.replacement))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RedactingLogger::new(patterns))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_complete() {
        let config = AgentConfig::default();
        assert!(!config.catalog.is_empty());
        assert!(config.policy.is_denylisted("delete-data"));
        assert_eq!(config.rate_limit.max_actions, 5);
    }

    #[test]
    fn yaml_round_trips() {
        let config = AgentConfig::default();
        let yaml = config.to_yaml().unwrap();
        let back = AgentConfig::from_yaml(&yaml).unwrap();
        assert_eq!(back.catalog.len(), config.catalog.len());
        assert_eq!(back.rate_limit, config.rate_limit);
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let config = AgentConfig::from_yaml("rate_limit:\n  max_actions: 2\n  window_secs: 30\n")
            .unwrap();
        assert_eq!(config.rate_limit.max_actions, 2);
        // Untouched sections keep their defaults.
        assert!(config.policy.is_denylisted("drop-table"));
        assert!(!config.catalog.is_empty());
    }

    #[test]
    fn malformed_yaml_is_a_config_error() {
        assert!(matches!(
            AgentConfig::from_yaml("rate_limit: [oops"),
            Err(AgentError::Config(_))
        ));
    }

    #[test]
    fn empty_redaction_builds_default_logger() {
        let logger = AgentConfig::default().build_logger().unwrap();
        assert!(logger.pattern_count() > 0);
    }

    #[test]
    fn custom_redaction_compiles() {
        let mut config = AgentConfig::default();
        config.redaction.push(RedactionRuleConfig {
            name: "mrn".into(),
            pattern: r"MRN-\d+".into(),
            replacement: "[REDACTED:mrn]".into(),
        });
        let logger = config.build_logger().unwrap();
        assert_eq!(logger.redact("chart MRN-1234"), "chart [REDACTED:mrn]");
    }

    #[test]
    fn bad_redaction_pattern_errors() {
        let mut config = AgentConfig::default();
        config.redaction.push(RedactionRuleConfig {
            name: "broken".into(),
            pattern: "(unclosed".into(),
            replacement: "x".into(),
        });
        assert!(matches!(
            config.build_logger(),
            Err(AgentError::Config(_))
        ));
    }
}

//! Realtime monitor
//!
//! Tails the audit logger's committed-entry stream and raises alerts. It
//! deliberately subscribes to persisted entries rather than the agent brain
//! itself, so it only ever reacts to committed, audited facts. The one
//! exception is the logger's health side channel: a persistence outage
//! leaves no committed entry behind, so its alarm arrives there.

use crate::channel::Alert;
use crate::notifier::AlertNotifier;
use remedy_audit::AuditHealth;
use remedy_core::{AuditEntry, CorrelationId, Outcome, Severity};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Monitor alerting rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Alert on any entry whose issue severity is at least this
    pub severity_threshold: Severity,
    /// Alert when one strategy accumulates more than this many
    /// review-pending outcomes
    pub review_backlog_limit: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            severity_threshold: Severity::High,
            review_backlog_limit: 5,
        }
    }
}

/// Tails the persisted audit stream and raises alerts
pub struct RealtimeMonitor {
    config: MonitorConfig,
    notifier: Arc<AlertNotifier>,
}

impl RealtimeMonitor {
    /// Create monitor over a notifier
    #[must_use]
    pub fn new(config: MonitorConfig, notifier: Arc<AlertNotifier>) -> Self {
        Self { config, notifier }
    }

    /// Spawn the monitor loop on the committed-entry and health streams
    ///
    /// The task ends when both sending sides are dropped.
    #[must_use]
    pub fn spawn(
        self,
        entries: broadcast::Receiver<AuditEntry>,
        health: broadcast::Receiver<AuditHealth>,
    ) -> JoinHandle<()> {
        tokio::spawn(self.run(entries, health))
    }

    /// Monitor loop
    pub async fn run(
        self,
        mut entries: broadcast::Receiver<AuditEntry>,
        mut health: broadcast::Receiver<AuditHealth>,
    ) {
        let mut state = MonitorState::default();
        let mut entries_open = true;
        let mut health_open = true;

        while entries_open || health_open {
            tokio::select! {
                entry = entries.recv(), if entries_open => match entry {
                    Ok(entry) => {
                        for alert in self.evaluate(&entry, &mut state) {
                            self.deliver(&alert).await;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "monitor lagged behind audit stream");
                    }
                    Err(broadcast::error::RecvError::Closed) => entries_open = false,
                },
                event = health.recv(), if health_open => match event {
                    Ok(event) => self.deliver(&self.health_alert(&event)).await,
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "monitor lagged behind health stream");
                    }
                    Err(broadcast::error::RecvError::Closed) => health_open = false,
                },
            }
        }
    }

    async fn deliver(&self, alert: &Alert) {
        if let Err(e) = self.notifier.notify(alert).await {
            // Alerting must never take the agent down with it.
            tracing::error!(error = %e, "alert delivery exhausted all channels");
        }
    }

    /// Apply the alerting rules to one committed entry
    fn evaluate(&self, entry: &AuditEntry, state: &mut MonitorState) -> Vec<Alert> {
        let mut alerts = Vec::new();

        // One severity alert per issue, not per traversed stage.
        if entry.issue.severity >= self.config.severity_threshold
            && state.alerted.insert(entry.correlation_id)
        {
            alerts.push(
                Alert::new(
                    entry.issue.severity,
                    format!(
                        "{} issue '{}' recorded {:?} at stage {:?}",
                        entry.issue.severity,
                        entry.issue.signature_id,
                        entry.outcome,
                        entry.stage
                    ),
                )
                .with_correlation(entry.correlation_id),
            );
        }

        if entry.outcome == Outcome::PendingReview {
            let strategy = entry
                .action
                .as_ref()
                .map(|a| a.strategy.clone())
                .unwrap_or_else(|| entry.issue.signature_id.clone());
            let count = state.review_backlog.entry(strategy.clone()).or_insert(0);
            *count += 1;
            if *count > self.config.review_backlog_limit {
                alerts.push(
                    Alert::new(
                        Severity::High,
                        format!(
                            "review backlog for '{strategy}' reached {count} pending items"
                        ),
                    )
                    .with_correlation(entry.correlation_id),
                );
                // Re-arm after alerting so the next overrun alerts again.
                *count = 0;
            }
        }

        alerts
    }

    /// Translate a persistence health transition into an alert
    fn health_alert(&self, event: &AuditHealth) -> Alert {
        match event {
            AuditHealth::BackendDegraded { error } => Alert::new(
                Severity::Critical,
                format!("audit backend unreachable, evidence buffering locally: {error}"),
            ),
            AuditHealth::BufferOverflowed { capacity } => Alert::new(
                Severity::Critical,
                format!(
                    "audit fallback buffer overflowed at {capacity} entries, live healing suspended"
                ),
            ),
            AuditHealth::Recovered { flushed } => Alert::new(
                Severity::Medium,
                format!("audit backend recovered, {flushed} buffered entries flushed in order"),
            ),
        }
    }
}

/// Rolling state the alerting rules accumulate across entries
#[derive(Debug, Default)]
struct MonitorState {
    review_backlog: HashMap<String, usize>,
    alerted: HashSet<CorrelationId>,
}

//! End-to-end demo: in-memory wiring, a handful of incidents, and the
//! audit trail they leave behind.
//!
//! ```text
//! RUST_LOG=info cargo run --bin remedy-demo
//! ```

use anyhow::Result;
use remedy_agent::{AgentBrain, AgentConfig, InMemoryTargetStore, IssueOutcome};
use remedy_alert::{Alert, AlertError, AlertNotifier, MonitorConfig, NotificationChannel, RealtimeMonitor};
use remedy_audit::{AuditConfig, AuditLogger, AuditQuery, InMemoryAuditStore};
use remedy_core::RawEvent;
use remedy_gate::{BreakerConfig, RateLimitConfig};
use remedy_strategy::{HealTarget, StrategyRegistry};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Channel that delivers alerts to the process log
struct ConsoleChannel;

#[async_trait::async_trait]
impl NotificationChannel for ConsoleChannel {
    fn name(&self) -> &str {
        "console"
    }

    async fn send(&self, alert: &Alert) -> Result<(), AlertError> {
        tracing::warn!(severity = %alert.severity, "{}", alert.summary);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let audit = Arc::new(AuditLogger::new(
        Arc::new(InMemoryAuditStore::new()),
        AuditConfig::default(),
    ));

    let targets = Arc::new(InMemoryTargetStore::new());
    targets.insert(HealTarget::new(
        "intake-form",
        "html.push(render_unsafe(patient_notes));",
    ));
    targets.insert(HealTarget::new(
        "audit-log-writer",
        "log line: patient ssn 123-45-6789 follow-up scheduled",
    ));
    targets.insert(
        HealTarget::new("ward-monitor", "")
            .with_handles(vec!["ward-monitor".into(), "tcp-4121".into()]),
    );

    let notifier = Arc::new(
        AlertNotifier::new(Duration::from_millis(500)).with_channel(
            Arc::new(ConsoleChannel),
            BreakerConfig::default(),
            RateLimitConfig {
                max_actions: 50,
                window_secs: 60,
            },
        ),
    );
    let monitor = RealtimeMonitor::new(MonitorConfig::default(), notifier);
    let monitor_task = monitor.spawn(audit.subscribe(), audit.subscribe_health());

    let brain = AgentBrain::new(
        AgentConfig::default(),
        Arc::new(StrategyRegistry::with_defaults()),
        Arc::clone(&audit),
        targets,
    )?;

    // 1. Autonomous heal: template injection in the intake form.
    let report = brain
        .submit_event(
            RawEvent::new("unsanitized input rendered into intake template")
                .with_resource("intake-form")
                .with_actor("svc-intake"),
        )
        .await?;
    tracing::info!(outcome = ?report.outcome, "intake-form incident");

    // 2. Sensitive data in logs, healed via redaction rule.
    let report = brain
        .submit_event(
            RawEvent::new("sensitive field written to audit-log-writer output")
                .with_resource("audit-log-writer"),
        )
        .await?;
    tracing::info!(outcome = ?report.outcome, "log-leak incident");

    // 3. Wide blast radius parks for approval, then a human signs off.
    let report = brain
        .submit_event(
            RawEvent::new("connection leak exhausting ward telemetry sockets")
                .with_resource("ward-monitor, hl7-listener, intake-gateway, scheduler")
                .with_stack("at ward_monitor::poll (monitor.rs:88)"),
        )
        .await?;
    if report.outcome == IssueOutcome::NeedsApproval {
        let resolved = brain
            .resolve_approval(
                report.issue.id,
                true,
                "dr-reyes",
                Some("confirmed with ops, release the stale socket"),
            )
            .await?;
        tracing::info!(outcome = ?resolved.outcome, "ward-monitor incident after approval");
    } else {
        tracing::info!(outcome = ?report.outcome, "ward-monitor incident");
    }

    // Let the monitor drain the committed stream before printing the trail.
    tokio::time::sleep(Duration::from_millis(100)).await;

    println!("\n=== audit trail ===");
    for entry in brain.query_audit(&AuditQuery::all()).await? {
        println!(
            "{} {:?}/{:?} issue={} actor={:?} note={}",
            entry.timestamp.format("%H:%M:%S%.3f"),
            entry.stage,
            entry.outcome,
            entry.issue.signature_id,
            entry.actor,
            entry.note.as_deref().unwrap_or("-")
        );
    }

    drop(brain);
    drop(audit);
    let _ = monitor_task.await;
    Ok(())
}

//! End-to-end pipeline scenarios over in-memory backends

use pretty_assertions::assert_eq;
use remedy_agent::{AgentBrain, AgentConfig, InMemoryTargetStore, IssueOutcome, TargetStore};
use remedy_audit::{AuditConfig, AuditLogger, AuditQuery, InMemoryAuditStore};
use remedy_core::{
    ActionStatus, Actor, Outcome, PipelineStage, Severity,
};
use remedy_gate::{BreakerConfig, RateLimitConfig};
use remedy_safety::SafetyPolicy;
use remedy_signature::{Matcher, Signature};
use remedy_strategy::{
    apply_payload, HealTarget, HealingStrategy, StrategyError, StrategyRegistry,
};
use remedy_test_utils::{leaked_handle_event, template_injection_event, unknown_event};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

fn build_brain(config: AgentConfig) -> (AgentBrain, Arc<InMemoryTargetStore>) {
    let audit = Arc::new(AuditLogger::new(
        Arc::new(InMemoryAuditStore::new()),
        AuditConfig::default(),
    ));
    let targets = Arc::new(InMemoryTargetStore::new());
    targets.insert(HealTarget::new(
        "intake-form",
        "html.push(render_unsafe(notes));",
    ));
    targets.insert(
        HealTarget::new("ward-monitor", "")
            .with_handles(vec!["ward-monitor".into(), "tcp-4121".into()]),
    );
    let brain = AgentBrain::new(
        config,
        Arc::new(StrategyRegistry::with_defaults()),
        audit,
        Arc::clone(&targets) as Arc<dyn TargetStore>,
    )
    .unwrap();
    (brain, targets)
}

#[tokio::test]
async fn happy_path_writes_one_entry_per_stage() {
    let (brain, targets) = build_brain(AgentConfig::default());

    let report = brain
        .submit_event(template_injection_event("intake-form"))
        .await
        .unwrap();
    assert_eq!(report.outcome, IssueOutcome::Applied);

    let entries = brain.query_audit(&AuditQuery::all()).await.unwrap();
    let stages: Vec<PipelineStage> = entries.iter().map(|e| e.stage).collect();
    assert_eq!(
        stages,
        vec![
            PipelineStage::Classified,
            PipelineStage::Validated,
            PipelineStage::Gated,
            PipelineStage::Sandboxed,
            PipelineStage::Applied,
        ]
    );
    assert!(entries.iter().all(|e| e.outcome == Outcome::Success));

    // Entries chain causally: each parent is the previous entry's id.
    for pair in entries.windows(2) {
        assert_eq!(pair[1].parent, Some(pair[0].id));
    }

    // Applied entry carries evidence: executed action with a rollback,
    // and before/after digests that differ.
    let applied = entries.last().unwrap();
    let action = applied.action.as_ref().unwrap();
    assert_eq!(action.status, ActionStatus::Executed);
    assert!(action.rollback.is_available());
    assert_ne!(applied.before, applied.after);

    // The live target was actually patched.
    let healed = targets.snapshot("intake-form").unwrap();
    assert!(!healed.content.contains("render_unsafe("));
    assert!(healed.content.contains("render_escaped("));
}

#[tokio::test]
async fn wide_blast_radius_parks_for_approval_then_applies() {
    let (brain, _targets) = build_brain(AgentConfig::default());

    let report = brain
        .submit_event(leaked_handle_event(
            "ward-monitor, hl7-listener, intake-gateway, scheduler",
        ))
        .await
        .unwrap();
    assert_eq!(report.outcome, IssueOutcome::NeedsApproval);
    assert_eq!(brain.pending_approvals(), vec![report.issue.id]);

    let resolved = brain
        .resolve_approval(report.issue.id, true, "dr-okafor", Some("ops confirmed"))
        .await
        .unwrap();
    assert_eq!(resolved.outcome, IssueOutcome::Applied);
    assert!(brain.pending_approvals().is_empty());

    let entries = brain.query_audit(&AuditQuery::all()).await.unwrap();
    let approval = entries
        .iter()
        .find(|e| e.stage == PipelineStage::ApprovalResolved)
        .unwrap();
    assert_eq!(
        approval.actor,
        Actor::Human {
            id: "dr-okafor".into()
        }
    );
    assert_eq!(approval.note.as_deref(), Some("ops confirmed"));
    assert_eq!(
        approval.action.as_ref().unwrap().status,
        ActionStatus::Approved
    );
}

#[tokio::test]
async fn critical_severity_always_requires_approval() {
    let mut config = AgentConfig::default();
    config.catalog.register(Signature {
        id: "telemetry-offline".into(),
        matcher: Matcher::Exact("ERR_TELEMETRY_OFFLINE".into()),
        category: remedy_core::Category::Availability,
        default_severity: Severity::Critical,
        suggested_strategy: "install-circuit-breaker-wrapper".into(),
    });
    let (brain, _targets) = build_brain(config);

    let report = brain
        .submit_event(
            remedy_core::RawEvent::new("ERR_TELEMETRY_OFFLINE").with_resource("telemetry-feed"),
        )
        .await
        .unwrap();
    assert_eq!(report.outcome, IssueOutcome::NeedsApproval);

    let entries = brain.query_audit(&AuditQuery::all()).await.unwrap();
    let validated = entries
        .iter()
        .find(|e| e.stage == PipelineStage::Validated)
        .unwrap();
    assert_eq!(validated.outcome, Outcome::PendingReview);
    assert!(validated.decision.as_ref().unwrap().required_approval);
}

#[tokio::test]
async fn approver_rejection_is_terminal() {
    let (brain, _targets) = build_brain(AgentConfig::default());

    let report = brain
        .submit_event(leaked_handle_event(
            "ward-monitor, hl7-listener, intake-gateway, scheduler",
        ))
        .await
        .unwrap();
    let resolved = brain
        .resolve_approval(report.issue.id, false, "dr-okafor", Some("too risky"))
        .await
        .unwrap();
    assert!(matches!(resolved.outcome, IssueOutcome::Rejected { .. }));

    let entries = brain.query_audit(&AuditQuery::all()).await.unwrap();
    let approval = entries.last().unwrap();
    assert_eq!(approval.stage, PipelineStage::ApprovalResolved);
    assert_eq!(approval.outcome, Outcome::Blocked);
    assert_eq!(approval.note.as_deref(), Some("too risky"));

    // The decision is spent; resolving again is an error.
    assert!(brain
        .resolve_approval(report.issue.id, true, "dr-okafor", None)
        .await
        .is_err());
}

#[tokio::test]
async fn denylisted_strategy_never_reaches_the_sandbox() {
    let mut config = AgentConfig::default();
    config.catalog.register(Signature {
        id: "stale-archive".into(),
        matcher: Matcher::Exact("ERR_STALE_ARCHIVE".into()),
        category: remedy_core::Category::DataIntegrity,
        default_severity: Severity::Low,
        suggested_strategy: "delete-data".into(),
    });
    config.policy = SafetyPolicy::with_defaults();
    let (brain, _targets) = build_brain(config);

    let report = brain
        .submit_event(remedy_core::RawEvent::new("ERR_STALE_ARCHIVE"))
        .await
        .unwrap();
    assert!(matches!(report.outcome, IssueOutcome::Rejected { .. }));

    let entries = brain.query_audit(&AuditQuery::all()).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].stage, PipelineStage::Validated);
    assert_eq!(entries[1].outcome, Outcome::Blocked);
    assert!(!entries
        .iter()
        .any(|e| e.stage == PipelineStage::Sandboxed || e.stage == PipelineStage::Applied));
}

#[tokio::test]
async fn unknown_signature_is_evidence_only() {
    let (brain, _targets) = build_brain(AgentConfig::default());

    let report = brain.submit_event(unknown_event()).await.unwrap();
    assert!(matches!(report.outcome, IssueOutcome::Rejected { .. }));
    assert_eq!(report.issue.signature_id, "unknown");

    let entries = brain.query_audit(&AuditQuery::all()).await.unwrap();
    assert_eq!(entries.len(), 2);
}

#[tokio::test]
async fn rate_limit_throttles_with_audit_evidence() {
    let config = AgentConfig::default().with_rate_limit(RateLimitConfig {
        max_actions: 1,
        window_secs: 60,
    });
    let (brain, targets) = build_brain(config);
    targets.insert(HealTarget::new("intake-b", "render_unsafe(x)"));

    let first = brain
        .submit_event(template_injection_event("intake-form"))
        .await
        .unwrap();
    assert_eq!(first.outcome, IssueOutcome::Applied);

    let second = brain
        .submit_event(template_injection_event("intake-b"))
        .await
        .unwrap();
    assert_eq!(second.outcome, IssueOutcome::Throttled);

    let entries = brain.query_audit(&AuditQuery::all()).await.unwrap();
    let throttled = entries.last().unwrap();
    assert_eq!(throttled.stage, PipelineStage::Gated);
    assert_eq!(throttled.outcome, Outcome::Throttled);
    assert!(throttled.note.as_ref().unwrap().contains("rate limit"));
}

/// Passes in the sandbox, faults on a chosen later apply. Lets a test drive
/// the live-apply failure path deterministically.
struct WedgedSessionQuarantine {
    calls: AtomicU32,
    fail_on_call: u32,
}

impl HealingStrategy for WedgedSessionQuarantine {
    fn name(&self) -> &'static str {
        "quarantine-wedged-session"
    }

    fn propose(
        &self,
        issue: &remedy_core::Issue,
    ) -> Result<remedy_core::HealingAction, StrategyError> {
        Ok(remedy_core::HealingAction::proposed(
            issue.id,
            self.name(),
            "quarantine the wedged session shard",
            remedy_core::ActionPayload::ConfigToggle {
                key: "session.quarantined".into(),
                value: "true".into(),
            },
            remedy_core::RollbackPlan::Inverse(remedy_core::ActionPayload::ConfigToggle {
                key: "session.quarantined".into(),
                value: "false".into(),
            }),
        ))
    }

    fn apply(
        &self,
        action: &remedy_core::HealingAction,
        target: &mut HealTarget,
    ) -> Result<(), StrategyError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.fail_on_call {
            return Err(StrategyError::ApplyFailed(
                "session store rejected the write".into(),
            ));
        }
        apply_payload(&action.payload, target)
    }

    fn verify(&self, _action: &remedy_core::HealingAction, target: &HealTarget) -> bool {
        target.config.get("session.quarantined").map(String::as_str) == Some("true")
    }
}

#[tokio::test]
async fn breaker_refusal_spares_the_rate_limit_window() {
    let mut config = AgentConfig::default()
        .with_rate_limit(RateLimitConfig {
            max_actions: 2,
            window_secs: 60,
        })
        .with_breaker(BreakerConfig {
            failure_threshold: 1,
            ..BreakerConfig::default()
        });
    config.catalog.register(Signature {
        id: "session-wedged".into(),
        matcher: Matcher::Exact("ERR_SESSION_WEDGED".into()),
        category: remedy_core::Category::Availability,
        default_severity: Severity::Low,
        suggested_strategy: "quarantine-wedged-session".into(),
    });

    let registry = StrategyRegistry::with_defaults().register(Arc::new(WedgedSessionQuarantine {
        calls: AtomicU32::new(0),
        // Two sandbox applies pass; the third call is the live apply.
        fail_on_call: 3,
    }));
    let audit = Arc::new(AuditLogger::new(
        Arc::new(InMemoryAuditStore::new()),
        AuditConfig::default(),
    ));
    let brain = AgentBrain::new(
        config,
        Arc::new(registry),
        audit,
        Arc::new(InMemoryTargetStore::new()) as Arc<dyn TargetStore>,
    )
    .unwrap();

    // The live fault opens the breaker for session-a.
    let faulted = brain
        .submit_event(remedy_core::RawEvent::new("ERR_SESSION_WEDGED").with_resource("session-a"))
        .await
        .unwrap();
    assert!(matches!(faulted.outcome, IssueOutcome::Rejected { .. }));

    // Breaker refusal must not consume a rate-limiter slot.
    let refused = brain
        .submit_event(remedy_core::RawEvent::new("ERR_SESSION_WEDGED").with_resource("session-a"))
        .await
        .unwrap();
    assert_eq!(refused.outcome, IssueOutcome::Throttled);
    let entries = brain.query_audit(&AuditQuery::all()).await.unwrap();
    let gated = entries.last().unwrap();
    assert_eq!(gated.stage, PipelineStage::Gated);
    assert!(gated.note.as_ref().unwrap().contains("circuit open"));

    // The window's second slot is still free for a healthy resource.
    let healthy = brain
        .submit_event(remedy_core::RawEvent::new("ERR_SESSION_WEDGED").with_resource("session-b"))
        .await
        .unwrap();
    assert_eq!(healthy.outcome, IssueOutcome::Applied);
}

#[tokio::test]
async fn reload_swaps_gate_tuning_atomically() {
    let (brain, _targets) = build_brain(AgentConfig::default());
    assert_eq!(brain.config_version(), 1);

    let version = brain
        .reload(AgentConfig::default().with_rate_limit(RateLimitConfig {
            max_actions: 0,
            window_secs: 60,
        }))
        .unwrap();
    assert_eq!(version, 2);

    let report = brain
        .submit_event(template_injection_event("intake-form"))
        .await
        .unwrap();
    assert_eq!(report.outcome, IssueOutcome::Throttled);
}

#[tokio::test]
async fn resubmission_links_passes_by_correlation_id() {
    let config = AgentConfig::default().with_rate_limit(RateLimitConfig {
        max_actions: 0,
        window_secs: 60,
    });
    let (brain, _targets) = build_brain(config);

    let throttled = brain
        .submit_event(template_injection_event("intake-form"))
        .await
        .unwrap();
    assert_eq!(throttled.outcome, IssueOutcome::Throttled);

    // Operator relaxes the window, then retries the same event.
    brain.reload(AgentConfig::default()).unwrap();
    let retried = brain
        .resubmit_event(
            template_injection_event("intake-form"),
            throttled.issue.correlation_id,
        )
        .await
        .unwrap();
    assert_eq!(retried.outcome, IssueOutcome::Applied);
    assert_eq!(retried.issue.correlation_id, throttled.issue.correlation_id);
    assert_ne!(retried.issue.id, throttled.issue.id);

    let entries = brain.query_audit(&AuditQuery::all()).await.unwrap();
    assert!(entries
        .iter()
        .all(|e| e.correlation_id == throttled.issue.correlation_id));
}

#[tokio::test]
async fn concurrent_submissions_respect_the_window() {
    let config = AgentConfig::default().with_rate_limit(RateLimitConfig {
        max_actions: 3,
        window_secs: 60,
    });
    let (brain, targets) = build_brain(config);
    for i in 0..8 {
        targets.insert(HealTarget::new(format!("form-{i}"), "render_unsafe(x)"));
    }
    let brain = Arc::new(brain);

    let mut handles = Vec::new();
    for i in 0..8 {
        let brain = Arc::clone(&brain);
        handles.push(tokio::spawn(async move {
            brain
                .submit_event(template_injection_event(&format!("form-{i}")))
                .await
                .unwrap()
                .outcome
        }));
    }

    let mut applied = 0;
    let mut throttled = 0;
    for handle in handles {
        match handle.await.unwrap() {
            IssueOutcome::Applied => applied += 1,
            IssueOutcome::Throttled => throttled += 1,
            other => panic!("unexpected outcome {other:?}"),
        }
    }
    assert_eq!(applied, 3);
    assert_eq!(throttled, 5);
}

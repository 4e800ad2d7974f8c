//! Agent brain
//!
//! Orchestrates the healing pipeline end to end:
//!
//! classify -> validate -> gate -> sandbox -> live apply
//!
//! Every stage a submission actually traverses writes exactly one audit
//! entry, chained to its causal parent, before the pipeline moves on. The
//! brain owns no policy of its own: classification lives in the analyzer,
//! safety in the validator, backpressure in the gate crate, remediation in
//! the strategy library. What it owns is ordering, audit evidence, and the
//! pending-approval table.

use crate::config::AgentConfig;
use crate::error::AgentError;
use dashmap::DashMap;
use parking_lot::RwLock;
use remedy_audit::{AuditError, AuditLogger, AuditQuery};
use remedy_core::{
    ActionStatus, AuditEntry, HealingAction, Issue, IssueId, Outcome, PipelineStage, RawEvent,
    RedactingLogger, SafetyDecision,
};
use remedy_gate::{BreakerRegistry, CircuitBreaker, SlidingWindowLimiter};
use remedy_safety::SafetyValidator;
use remedy_signature::IssueAnalyzer;
use remedy_strategy::{apply_rollback, HealTarget, SandboxExecutor, StrategyRegistry};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Access to the live resources healing actions operate on
///
/// The brain reads a snapshot for sandboxing, and commits the mutated
/// target only after a successful, verified live apply.
pub trait TargetStore: Send + Sync {
    /// Current state of a resource, if known
    fn snapshot(&self, resource: &str) -> Option<HealTarget>;

    /// Replace the stored state of the target's resource
    fn commit(&self, target: HealTarget);
}

/// In-memory target store, the reference backend
#[derive(Debug, Default)]
pub struct InMemoryTargetStore {
    targets: DashMap<String, HealTarget>,
}

impl InMemoryTargetStore {
    /// Create empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a resource
    pub fn insert(&self, target: HealTarget) {
        self.targets.insert(target.resource.clone(), target);
    }
}

impl TargetStore for InMemoryTargetStore {
    fn snapshot(&self, resource: &str) -> Option<HealTarget> {
        self.targets.get(resource).map(|t| t.clone())
    }

    fn commit(&self, target: HealTarget) {
        self.targets.insert(target.resource.clone(), target);
    }
}

/// Terminal state a submission reached
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueOutcome {
    /// Healed and committed to the live target
    Applied,
    /// Will never be healed with this action
    Rejected {
        /// Why
        reason: String,
    },
    /// Waiting on a human approval decision
    NeedsApproval,
    /// Routed to human review (sandbox failure or suspended healing)
    ReviewPending,
    /// Deferred by the rate limiter or an open breaker; safe to resubmit
    Throttled,
}

/// What the pipeline did with one submission
#[derive(Debug, Clone)]
pub struct IssueReport {
    /// The classified issue
    pub issue: Issue,
    /// Terminal state for this pass
    pub outcome: IssueOutcome,
}

/// An action parked for a human decision
#[derive(Debug, Clone)]
struct PendingApproval {
    issue: Issue,
    action: HealingAction,
    parent: remedy_core::EntryId,
}

/// Config-derived pipeline components, replaced as one unit on reload
struct Gates {
    config: Arc<AgentConfig>,
    analyzer: IssueAnalyzer,
    validator: SafetyValidator,
    limiter: SlidingWindowLimiter,
    breakers: BreakerRegistry,
    logger: RedactingLogger,
}

impl Gates {
    fn build(config: AgentConfig) -> Result<Self, AgentError> {
        let logger = config.build_logger()?;
        let config = Arc::new(config);
        Ok(Self {
            analyzer: IssueAnalyzer::new(Arc::new(config.catalog.clone())),
            validator: SafetyValidator::new(config.policy.clone()),
            limiter: SlidingWindowLimiter::new(config.rate_limit),
            breakers: BreakerRegistry::new(config.breaker),
            logger,
            config,
        })
    }
}

/// The pipeline orchestrator
pub struct AgentBrain {
    gates: RwLock<Arc<Gates>>,
    config_version: AtomicU64,
    registry: Arc<StrategyRegistry>,
    sandbox: SandboxExecutor,
    audit: Arc<AuditLogger>,
    targets: Arc<dyn TargetStore>,
    pending: DashMap<IssueId, PendingApproval>,
}

impl AgentBrain {
    /// Assemble the brain from its parts
    ///
    /// # Errors
    /// Returns [`AgentError::Config`] when the config's redaction rules do
    /// not compile.
    pub fn new(
        config: AgentConfig,
        registry: Arc<StrategyRegistry>,
        audit: Arc<AuditLogger>,
        targets: Arc<dyn TargetStore>,
    ) -> Result<Self, AgentError> {
        let gates = Gates::build(config)?;
        Ok(Self {
            gates: RwLock::new(Arc::new(gates)),
            config_version: AtomicU64::new(1),
            sandbox: SandboxExecutor::new(Arc::clone(&registry)),
            registry,
            audit,
            targets,
            pending: DashMap::new(),
        })
    }

    /// Atomically swap in a new configuration
    ///
    /// Catalog, policy, gate tuning and redaction all change together;
    /// rate-limit windows and breaker states restart fresh. Returns the new
    /// config version. In-flight submissions finish under the config they
    /// started with.
    ///
    /// # Errors
    /// Returns [`AgentError::Config`] without touching the running config
    /// when the new one is invalid.
    pub fn reload(&self, config: AgentConfig) -> Result<u64, AgentError> {
        let gates = Gates::build(config)?;
        *self.gates.write() = Arc::new(gates);
        let version = self.config_version.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!(version, "configuration swapped");
        Ok(version)
    }

    /// Config version currently in force
    #[inline]
    #[must_use]
    pub fn config_version(&self) -> u64 {
        self.config_version.load(Ordering::SeqCst)
    }

    /// Snapshot of the active configuration
    #[must_use]
    pub fn config(&self) -> Arc<AgentConfig> {
        Arc::clone(&self.gates.read().config)
    }

    /// The audit logger (for subscriptions and flushing)
    #[inline]
    #[must_use]
    pub fn audit(&self) -> &Arc<AuditLogger> {
        &self.audit
    }

    /// Issues currently waiting on a human decision
    #[must_use]
    pub fn pending_approvals(&self) -> Vec<IssueId> {
        self.pending.iter().map(|p| *p.key()).collect()
    }

    /// Query the persisted audit stream
    ///
    /// # Errors
    /// Propagates backend errors.
    pub async fn query_audit(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>, AuditError> {
        self.audit.query(query).await
    }

    /// Run one raw event through the pipeline
    ///
    /// # Errors
    /// Returns [`AgentError::Audit`] when evidence cannot be recorded;
    /// an unauditable step never executes.
    pub async fn submit_event(&self, event: RawEvent) -> Result<IssueReport, AgentError> {
        self.run_pipeline(event, None).await
    }

    /// Resubmit an event under an existing correlation id
    ///
    /// For retrying a throttled submission: the fresh issue shares the
    /// correlation id, so the audit trail links both passes.
    ///
    /// # Errors
    /// Same as [`AgentBrain::submit_event`].
    pub async fn resubmit_event(
        &self,
        event: RawEvent,
        correlation_id: remedy_core::CorrelationId,
    ) -> Result<IssueReport, AgentError> {
        self.run_pipeline(event, Some(correlation_id)).await
    }

    async fn run_pipeline(
        &self,
        event: RawEvent,
        correlation_id: Option<remedy_core::CorrelationId>,
    ) -> Result<IssueReport, AgentError> {
        let gates = Arc::clone(&self.gates.read());
        let issue = match correlation_id {
            Some(id) => gates.analyzer.reanalyze(&event, id),
            None => gates.analyzer.analyze(&event),
        };
        gates.logger.info(
            "brain",
            &format!(
                "classified '{}' as {} severity {} ({} resource(s))",
                issue.signature_id,
                issue.category,
                issue.severity,
                issue.blast_radius()
            ),
        );

        let classified = AuditEntry::new(&issue, PipelineStage::Classified, Outcome::Success);
        let mut parent = classified.id;
        self.audit.record(classified).await?;

        // Strategy resolution. Unknown signatures are evidence-only.
        let strategy_name = match gates.analyzer.suggested_strategy(&issue) {
            Some(name) if self.registry.contains(&name) => name,
            Some(name) => {
                return self
                    .reject_at_validation(
                        issue,
                        parent,
                        SafetyDecision::deny(format!("strategy '{name}' is not registered")),
                    )
                    .await;
            }
            None => {
                let reason =
                    format!("no healing strategy for signature '{}'", issue.signature_id);
                return self
                    .reject_at_validation(issue, parent, SafetyDecision::deny(reason))
                    .await;
            }
        };

        let decision = gates
            .validator
            .validate(&issue, &strategy_name)
            .with_rate_snapshot(gates.limiter.snapshot(&strategy_name));

        if !decision.allowed {
            return self.reject_at_validation(issue, parent, decision).await;
        }

        // Propose before recording validation so the entry carries the
        // candidate action.
        let strategy = self
            .registry
            .get(&strategy_name)
            .ok_or_else(|| remedy_strategy::StrategyError::UnknownStrategy(strategy_name.clone()))?;
        let action = match strategy.propose(&issue) {
            Ok(action) => action,
            Err(e) => {
                let entry = AuditEntry::new(&issue, PipelineStage::Validated, Outcome::Failed)
                    .with_parent(parent)
                    .with_decision(decision)
                    .with_note(format!("proposal failed: {e}"));
                self.audit.record(entry).await?;
                return Ok(IssueReport {
                    issue,
                    outcome: IssueOutcome::Rejected {
                        reason: format!("proposal failed: {e}"),
                    },
                });
            }
        };

        if decision.required_approval {
            let entry = AuditEntry::new(&issue, PipelineStage::Validated, Outcome::PendingReview)
                .with_parent(parent)
                .with_decision(decision.clone())
                .with_action(action.clone())
                .with_note(decision.reason.clone());
            parent = entry.id;
            self.audit.record(entry).await?;
            self.pending.insert(
                issue.id,
                PendingApproval {
                    issue: issue.clone(),
                    action,
                    parent,
                },
            );
            gates
                .logger
                .warn("brain", &format!("issue {} parked for approval", issue.id));
            return Ok(IssueReport {
                issue,
                outcome: IssueOutcome::NeedsApproval,
            });
        }

        let entry = AuditEntry::new(&issue, PipelineStage::Validated, Outcome::Success)
            .with_parent(parent)
            .with_decision(decision)
            .with_action(action.clone());
        parent = entry.id;
        self.audit.record(entry).await?;

        // Gate: per-resource breaker first, so a sick resource cannot burn
        // rate-limiter slots other issues of the same strategy need.
        let breaker = gates.breakers.get_or_create(&resource_of(&issue));
        if let Err(e) = breaker.acquire() {
            let entry = AuditEntry::new(&issue, PipelineStage::Gated, Outcome::Throttled)
                .with_parent(parent)
                .with_action(action)
                .with_note(e.to_string());
            self.audit.record(entry).await?;
            return Ok(IssueReport {
                issue,
                outcome: IssueOutcome::Throttled,
            });
        }

        let snapshot = match gates.limiter.try_acquire(&strategy_name) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                breaker.cancel();
                let entry = AuditEntry::new(&issue, PipelineStage::Gated, Outcome::Throttled)
                    .with_parent(parent)
                    .with_action(action)
                    .with_note(e.to_string());
                self.audit.record(entry).await?;
                return Ok(IssueReport {
                    issue,
                    outcome: IssueOutcome::Throttled,
                });
            }
        };

        let entry = AuditEntry::new(&issue, PipelineStage::Gated, Outcome::Success)
            .with_parent(parent)
            .with_action(action.clone())
            .with_note(format!(
                "window {}/{} over {}s",
                snapshot.used, snapshot.max, snapshot.window_secs
            ));
        parent = entry.id;
        self.audit.record(entry).await?;

        self.execute(&gates, issue, action, &breaker, parent).await
    }

    /// Resolve a parked approval
    ///
    /// Approval admits the action to the sandbox-then-apply path; the
    /// per-strategy rate limiter is not consulted, since throughput here is
    /// bounded by the human, but the resource breaker still applies.
    ///
    /// # Errors
    /// Returns [`AgentError::UnknownIssue`] when nothing is pending for the
    /// id, and [`AgentError::Audit`] when evidence cannot be recorded.
    pub async fn resolve_approval(
        &self,
        issue_id: IssueId,
        approve: bool,
        approver_id: &str,
        note: Option<&str>,
    ) -> Result<IssueReport, AgentError> {
        let (_, pending) = self
            .pending
            .remove(&issue_id)
            .ok_or(AgentError::UnknownIssue(issue_id))?;
        let gates = Arc::clone(&self.gates.read());

        if !approve {
            let mut entry = AuditEntry::new(
                &pending.issue,
                PipelineStage::ApprovalResolved,
                Outcome::Blocked,
            )
            .with_parent(pending.parent)
            .with_action(pending.action)
            .by_human(approver_id);
            if let Some(note) = note {
                entry = entry.with_note(note);
            }
            self.audit.record(entry).await?;
            return Ok(IssueReport {
                issue: pending.issue,
                outcome: IssueOutcome::Rejected {
                    reason: format!("rejected by approver {approver_id}"),
                },
            });
        }

        let action = pending.action.with_status(ActionStatus::Approved);
        let mut entry = AuditEntry::new(
            &pending.issue,
            PipelineStage::ApprovalResolved,
            Outcome::Success,
        )
        .with_parent(pending.parent)
        .with_action(action.clone())
        .by_human(approver_id);
        if let Some(note) = note {
            entry = entry.with_note(note);
        }
        let parent = entry.id;
        self.audit.record(entry).await?;

        let breaker = gates.breakers.get_or_create(&resource_of(&pending.issue));
        if let Err(e) = breaker.acquire() {
            let entry = AuditEntry::new(&pending.issue, PipelineStage::Gated, Outcome::Throttled)
                .with_parent(parent)
                .with_action(action.clone())
                .with_note(e.to_string());
            let parent = entry.id;
            self.audit.record(entry).await?;
            // Park it again: the approval stands, only the resource is sick.
            self.pending.insert(
                pending.issue.id,
                PendingApproval {
                    issue: pending.issue.clone(),
                    action,
                    parent,
                },
            );
            return Ok(IssueReport {
                issue: pending.issue,
                outcome: IssueOutcome::Throttled,
            });
        }

        self.execute(&gates, pending.issue, action, &breaker, parent)
            .await
    }

    /// Sandbox then live apply, sharing the path between autonomous and
    /// approved actions
    async fn execute(
        &self,
        gates: &Gates,
        issue: Issue,
        action: HealingAction,
        breaker: &Arc<CircuitBreaker>,
        mut parent: remedy_core::EntryId,
    ) -> Result<IssueReport, AgentError> {
        let resource = resource_of(&issue);
        let snapshot = self
            .targets
            .snapshot(&resource)
            .unwrap_or_else(|| HealTarget::new(resource.clone(), ""));

        let result = self.sandbox.test(&action, &snapshot);
        if !result.passed {
            breaker.cancel();
            let entry = AuditEntry::new(&issue, PipelineStage::Sandboxed, Outcome::PendingReview)
                .with_parent(parent)
                .with_action(action.clone())
                .with_digests(result.before, result.after)
                .with_note(result.errors.join("; "));
            parent = entry.id;
            self.audit.record(entry).await?;
            self.pending.insert(
                issue.id,
                PendingApproval {
                    issue: issue.clone(),
                    action,
                    parent,
                },
            );
            gates.logger.warn(
                "brain",
                &format!("sandbox refused action for issue {}, routed to review", issue.id),
            );
            return Ok(IssueReport {
                issue,
                outcome: IssueOutcome::ReviewPending,
            });
        }

        let action = action.with_status(ActionStatus::SandboxTested);
        let mut entry = AuditEntry::new(&issue, PipelineStage::Sandboxed, Outcome::Success)
            .with_parent(parent)
            .with_action(action.clone())
            .with_digests(result.before, result.after);
        if let Some(diff) = result.diff {
            entry = entry.with_note(diff);
        }
        parent = entry.id;
        self.audit.record(entry).await?;

        // Audit completeness outranks healing: with the fallback buffer
        // overflowed, nothing touches live state.
        if self.audit.is_healing_suspended() {
            breaker.cancel();
            let entry = AuditEntry::new(&issue, PipelineStage::Applied, Outcome::PendingReview)
                .with_parent(parent)
                .with_action(action.clone())
                .with_note("live healing suspended: audit fallback buffer overflowed");
            parent = entry.id;
            self.audit.record(entry).await?;
            self.pending.insert(
                issue.id,
                PendingApproval {
                    issue: issue.clone(),
                    action,
                    parent,
                },
            );
            return Ok(IssueReport {
                issue,
                outcome: IssueOutcome::ReviewPending,
            });
        }

        // Sandbox passed implies the strategy exists.
        let strategy = self
            .registry
            .get(&action.strategy)
            .ok_or_else(|| remedy_strategy::StrategyError::UnknownStrategy(action.strategy.clone()))?;

        let mut live = self
            .targets
            .snapshot(&resource)
            .unwrap_or_else(|| HealTarget::new(resource.clone(), ""));
        let before = live.digest();

        let applied = strategy.apply(&action, &mut live);
        let verified = applied.is_ok() && strategy.verify(&action, &live);
        if verified {
            let after = live.digest();
            self.targets.commit(live);
            breaker.record_success();
            let executed = action.with_status(ActionStatus::Executed);
            let entry = AuditEntry::new(&issue, PipelineStage::Applied, Outcome::Success)
                .with_parent(parent)
                .with_action(executed)
                .with_digests(before, after);
            self.audit.record(entry).await?;
            gates
                .logger
                .info("brain", &format!("issue {} healed on '{resource}'", issue.id));
            return Ok(IssueReport {
                issue,
                outcome: IssueOutcome::Applied,
            });
        }

        breaker.record_failure();
        let fault = applied
            .err()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "post-apply verification failed".to_string());

        // The failed action is terminal; retries must propose a new one.
        let (status, note) = match apply_rollback(&action.rollback, &mut live) {
            Ok(()) => (
                ActionStatus::RolledBack,
                format!("{fault}; rollback applied"),
            ),
            Err(re) => (
                ActionStatus::Failed,
                format!("{fault}; rollback unavailable: {re}"),
            ),
        };
        let failed = action.with_status(status);
        let entry = AuditEntry::new(&issue, PipelineStage::Applied, Outcome::Failed)
            .with_parent(parent)
            .with_action(failed)
            .with_digests(before, before)
            .with_note(note.clone());
        self.audit.record(entry).await?;
        gates
            .logger
            .error("brain", &format!("live apply faulted on '{resource}': {note}"));
        Ok(IssueReport {
            issue,
            outcome: IssueOutcome::Rejected { reason: note },
        })
    }

    async fn reject_at_validation(
        &self,
        issue: Issue,
        parent: remedy_core::EntryId,
        decision: SafetyDecision,
    ) -> Result<IssueReport, AgentError> {
        let reason = decision.reason.clone();
        let entry = AuditEntry::new(&issue, PipelineStage::Validated, Outcome::Blocked)
            .with_parent(parent)
            .with_decision(decision);
        self.audit.record(entry).await?;
        Ok(IssueReport {
            issue,
            outcome: IssueOutcome::Rejected { reason },
        })
    }
}

impl std::fmt::Debug for AgentBrain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentBrain")
            .field("config_version", &self.config_version())
            .field("strategies", &self.registry.names())
            .field("pending", &self.pending.len())
            .finish()
    }
}

/// Breaker key and target resource for an issue
fn resource_of(issue: &Issue) -> String {
    issue
        .affected_resources
        .first()
        .cloned()
        .unwrap_or_else(|| "unspecified".to_string())
}

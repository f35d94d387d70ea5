// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Orchestrator
//!
//! Drives a run as a three-way state machine over the active worker:
//!
//! ```text
//! Running(root) ──decide──▶ Invoke   ──▶ Running(w)        (result or error recorded)
//!                       ├─▶ Handoff  ──▶ Running(target)   (or rejected, Running(w))
//!                       └─▶ Output   ──▶ Terminated(text)
//! step limit reached / decision error ──▶ Failed
//! ```
//!
//! Every action is validated against the active worker before anything
//! executes. Validation and collaborator errors go into the trace and the
//! same worker decides again; only decision errors and the step limit end a
//! run early. Exactly one worker is active at a time and one capability
//! invocation runs at a time.
//!
//! Cancellation is checked before each step and raced against the pending
//! decision or capability call. A cancelled run reports the trace so far and
//! the state as last written; nothing is rolled back.

use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::capability::{CapabilityError, CapabilityName, CapabilityRegistry};
use crate::domain::config::OrchestratorConfig;
use crate::domain::decision::{Action, DecisionEngine, DecisionRequest, PeerSummary};
use crate::domain::error::{CollaboratorError, ValidationError};
use crate::domain::events::RunEvent;
use crate::domain::run::{
    RunFailure, RunId, RunReport, RunRequest, RunRequestError, RunStatus, StepError, TraceEntry,
    TraceEvent,
};
use crate::domain::state::SharedState;
use crate::domain::worker::{Roster, RosterError, Worker, WorkerId};
use crate::infrastructure::event_bus::EventBus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorSettings {
    /// Decisions allowed per run before it fails with `StepLimitExceeded`
    pub max_steps: u32,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self { max_steps: 40 }
    }
}

impl From<&OrchestratorConfig> for OrchestratorSettings {
    fn from(config: &OrchestratorConfig) -> Self {
        Self {
            max_steps: config.max_steps,
        }
    }
}

pub struct Orchestrator {
    registry: Arc<CapabilityRegistry>,
    roster: Arc<Roster>,
    engine: Arc<dyn DecisionEngine>,
    settings: OrchestratorSettings,
    event_bus: Option<EventBus>,
}

/// Outcome of one step that does not end the run.
enum StepOutcome<'r> {
    Continue,
    Transfer(&'r Worker),
    Finish(RunStatus),
}

impl Orchestrator {
    /// Fails if a worker references a capability the registry does not hold.
    pub fn new(
        registry: Arc<CapabilityRegistry>,
        roster: Arc<Roster>,
        engine: Arc<dyn DecisionEngine>,
        settings: OrchestratorSettings,
    ) -> Result<Self, RosterError> {
        for worker in roster.workers() {
            if let Some(missing) = worker.capabilities().iter().find(|name| !registry.contains(name)) {
                return Err(RosterError::UnknownCapability {
                    worker: worker.id().clone(),
                    capability: missing.clone(),
                });
            }
        }

        Ok(Self {
            registry,
            roster,
            engine,
            settings,
            event_bus: None,
        })
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn settings(&self) -> OrchestratorSettings {
        self.settings
    }

    pub async fn run(&self, request: RunRequest) -> Result<RunReport, RunRequestError> {
        self.run_with_cancellation(request, CancellationToken::new()).await
    }

    pub async fn run_with_cancellation(
        &self,
        request: RunRequest,
        cancel: CancellationToken,
    ) -> Result<RunReport, RunRequestError> {
        let root = self
            .roster
            .get(&request.root)
            .ok_or_else(|| RunRequestError::UnknownRoot(request.root.clone()))?;
        let mut state = SharedState::seeded(request.seed.iter().map(|(k, v)| (k, v.clone())))?;

        let run_id = RunId::new();
        let started_at = Utc::now();
        let max_steps = self.settings.max_steps;

        info!(run_id = %run_id, root = %root.id(), max_steps, "Run started");
        self.publish(RunEvent::RunStarted {
            run_id,
            root: root.id().clone(),
            instruction: request.instruction.clone(),
            started_at,
        });

        let mut active = root;
        let mut steps: u32 = 0;
        let mut trace: Vec<TraceEvent> = Vec::new();
        let mut traversals: HashMap<(WorkerId, WorkerId), u32> = HashMap::new();

        let status = loop {
            if cancel.is_cancelled() {
                break RunStatus::Cancelled;
            }

            if steps >= max_steps {
                warn!(run_id = %run_id, worker = %active.id(), limit = max_steps, "Step limit exceeded");
                break RunStatus::Failed {
                    failure: RunFailure::StepLimitExceeded { limit: max_steps },
                };
            }

            let step = steps;
            let decision = {
                let decision_request = self.decision_request(run_id, step, active, &state, &trace, &request.instruction);
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    decision = self.engine.decide(&decision_request) => Some(decision),
                }
            };

            let action = match decision {
                None => break RunStatus::Cancelled,
                Some(Err(error)) => {
                    warn!(run_id = %run_id, worker = %active.id(), step, error = %error, "Decision failed");
                    break RunStatus::Failed {
                        failure: RunFailure::from(error),
                    };
                }
                Some(Ok(action)) => action,
            };

            steps += 1;
            metrics::counter!("critique_run_steps_total", "worker" => active.id().to_string()).increment(1);
            debug!(run_id = %run_id, worker = %active.id(), step, action = ?action, "Decision received");

            let outcome = match action {
                Action::Invoke {
                    capability,
                    arguments,
                } => {
                    self.invoke(run_id, step, active, capability, arguments, &mut state, &mut trace, &cancel)
                        .await
                }
                Action::Handoff { target, reason } => {
                    self.handoff(run_id, step, active, target, reason, &mut traversals, &mut trace)
                }
                Action::Output { text } => {
                    info!(run_id = %run_id, worker = %active.id(), step, "Run terminated with output");
                    StepOutcome::Finish(RunStatus::Terminated { output: text })
                }
            };

            match outcome {
                StepOutcome::Continue => {}
                StepOutcome::Transfer(next) => active = next,
                StepOutcome::Finish(status) => break status,
            }
        };

        let finished_at = Utc::now();
        self.publish_outcome(run_id, steps, active.id(), &status);

        Ok(RunReport {
            run_id,
            status,
            steps,
            active_worker: active.id().clone(),
            trace,
            state,
            started_at,
            finished_at,
        })
    }

    fn decision_request<'a>(
        &self,
        run_id: RunId,
        step: u32,
        worker: &'a Worker,
        state: &SharedState,
        trace: &'a [TraceEvent],
        instruction: &'a str,
    ) -> DecisionRequest<'a> {
        let peers = worker
            .peers()
            .iter()
            .map(|edge| PeerSummary {
                id: edge.target.clone(),
                description: self
                    .roster
                    .get(&edge.target)
                    .map(|peer| peer.description().to_string())
                    .unwrap_or_default(),
            })
            .collect();

        DecisionRequest {
            run_id,
            step,
            worker,
            capabilities: self.registry.descriptors_for(worker.capabilities()),
            peers,
            state: state.snapshot(),
            history: trace,
            instruction,
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn invoke<'r>(
        &self,
        run_id: RunId,
        step: u32,
        worker: &'r Worker,
        capability: CapabilityName,
        arguments: Value,
        state: &mut SharedState,
        trace: &mut Vec<TraceEvent>,
        cancel: &CancellationToken,
    ) -> StepOutcome<'r> {
        let result = if !worker.can_invoke(&capability) {
            Err(StepError::Validation(ValidationError::UnauthorizedCapability {
                worker: worker.id().clone(),
                capability: capability.clone(),
            }))
        } else {
            let invocation = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                result = self.registry.invoke(&capability, arguments.clone(), state) => Some(result),
            };
            match invocation {
                None => return StepOutcome::Finish(RunStatus::Cancelled),
                Some(result) => result.map_err(step_error),
            }
        };

        match result {
            Ok(result) => {
                info!(run_id = %run_id, worker = %worker.id(), capability = %capability, step, "Capability invoked");
                metrics::counter!(
                    "critique_capability_invocations_total",
                    "capability" => capability.to_string(),
                    "outcome" => "ok"
                )
                .increment(1);
                self.publish(RunEvent::CapabilityInvoked {
                    run_id,
                    step,
                    worker: worker.id().clone(),
                    capability: capability.clone(),
                    arguments: arguments.clone(),
                    result: result.clone(),
                    invoked_at: Utc::now(),
                });
                trace.push(TraceEvent::new(
                    step,
                    worker.id().clone(),
                    TraceEntry::CapabilityInvoked {
                        capability,
                        arguments,
                        result,
                    },
                ));
            }
            Err(error) => {
                warn!(
                    run_id = %run_id,
                    worker = %worker.id(),
                    capability = %capability,
                    step,
                    kind = %error.kind(),
                    error = %error,
                    "Capability step failed"
                );
                metrics::counter!(
                    "critique_capability_invocations_total",
                    "capability" => capability.to_string(),
                    "outcome" => "error"
                )
                .increment(1);
                self.publish(RunEvent::CapabilityFailed {
                    run_id,
                    step,
                    worker: worker.id().clone(),
                    capability: capability.clone(),
                    error: error.to_string(),
                    failed_at: Utc::now(),
                });
                trace.push(TraceEvent::new(
                    step,
                    worker.id().clone(),
                    TraceEntry::CapabilityFailed {
                        capability,
                        arguments,
                        error,
                    },
                ));
            }
        }

        StepOutcome::Continue
    }

    #[allow(clippy::too_many_arguments)]
    fn handoff<'r>(
        &'r self,
        run_id: RunId,
        step: u32,
        worker: &'r Worker,
        target: WorkerId,
        reason: Option<String>,
        traversals: &mut HashMap<(WorkerId, WorkerId), u32>,
        trace: &mut Vec<TraceEvent>,
    ) -> StepOutcome<'r> {
        let edge_key = (worker.id().clone(), target.clone());
        let taken = traversals.get(&edge_key).copied().unwrap_or(0);

        let accepted = match worker.edge_to(&target) {
            None => Err(ValidationError::UnauthorizedHandoff {
                worker: worker.id().clone(),
                target: target.clone(),
            }),
            Some(edge) => match edge.max_traversals {
                Some(limit) if taken >= limit => Err(ValidationError::HandoffBudgetExhausted {
                    worker: worker.id().clone(),
                    target: target.clone(),
                    limit,
                }),
                _ => self.roster.get(&target).ok_or_else(|| ValidationError::UnauthorizedHandoff {
                    worker: worker.id().clone(),
                    target: target.clone(),
                }),
            },
        };

        match accepted {
            Ok(next) => {
                traversals.insert(edge_key, taken + 1);
                info!(run_id = %run_id, worker = %worker.id(), target = %target, step, "Handoff accepted");
                self.publish(RunEvent::ActiveWorkerChanged {
                    run_id,
                    step,
                    from: worker.id().clone(),
                    to: target.clone(),
                    changed_at: Utc::now(),
                });
                trace.push(TraceEvent::new(
                    step,
                    worker.id().clone(),
                    TraceEntry::HandoffAccepted { target, reason },
                ));
                StepOutcome::Transfer(next)
            }
            Err(error) => {
                warn!(run_id = %run_id, worker = %worker.id(), target = %target, step, error = %error, "Handoff rejected");
                self.publish(RunEvent::HandoffRejected {
                    run_id,
                    step,
                    worker: worker.id().clone(),
                    target: target.clone(),
                    error: error.to_string(),
                    rejected_at: Utc::now(),
                });
                trace.push(TraceEvent::new(
                    step,
                    worker.id().clone(),
                    TraceEntry::HandoffRejected { target, error },
                ));
                StepOutcome::Continue
            }
        }
    }

    fn publish_outcome(&self, run_id: RunId, steps: u32, worker: &WorkerId, status: &RunStatus) {
        let now = Utc::now();
        let (label, event) = match status {
            RunStatus::Terminated { output } => (
                "terminated",
                RunEvent::RunTerminated {
                    run_id,
                    steps,
                    worker: worker.clone(),
                    output: output.clone(),
                    terminated_at: now,
                },
            ),
            RunStatus::Failed { failure } => (
                "failed",
                RunEvent::RunFailed {
                    run_id,
                    steps,
                    reason: failure.to_string(),
                    failed_at: now,
                },
            ),
            RunStatus::Cancelled => {
                info!(run_id = %run_id, steps, "Run cancelled");
                (
                    "cancelled",
                    RunEvent::RunCancelled {
                        run_id,
                        steps,
                        cancelled_at: now,
                    },
                )
            }
        };

        metrics::counter!("critique_runs_total", "status" => label).increment(1);
        self.publish(event);
    }

    fn publish(&self, event: RunEvent) {
        if let Some(bus) = &self.event_bus {
            bus.publish(event);
        }
    }
}

fn step_error(error: CapabilityError) -> StepError {
    match error {
        CapabilityError::UnknownCapability(capability) => {
            StepError::Validation(ValidationError::UnknownCapability { capability })
        }
        CapabilityError::InvalidArgument {
            capability,
            violations,
        } => StepError::Validation(ValidationError::InvalidArgument {
            capability,
            violations,
        }),
        CapabilityError::CapabilityExecution { source, .. } => StepError::Collaborator(source),
        other => StepError::Collaborator(CollaboratorError::Rejected(other.to_string())),
    }
}

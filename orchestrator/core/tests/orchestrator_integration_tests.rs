// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Integration tests for the orchestrator state machine
//!
//! These tests drive complete runs through scripted decisions and check:
//! 1. Termination on output, decision failure and the step bound
//! 2. Validation of capabilities and handoffs before anything executes
//! 3. Recoverable errors flowing back into the next decision
//! 4. Bounded retry edges between workers
//! 5. Cancellation, isolation of concurrent runs and published run events

use async_trait::async_trait;
use critique_core::application::{Orchestrator, OrchestratorSettings};
use critique_core::domain::capability::{
    Capability, CapabilityDescriptor, CapabilityRegistry, Purity, StateHandle,
};
use critique_core::domain::decision::{Action, DecisionEngine, DecisionRequest};
use critique_core::domain::error::{CollaboratorError, DecisionError, ErrorKind, ValidationError};
use critique_core::domain::events::RunEvent;
use critique_core::domain::run::{
    RunFailure, RunRequest, RunRequestError, RunStatus, StepError, TraceEntry,
};
use critique_core::domain::worker::{Roster, RosterError, Worker, WorkerId};
use critique_core::infrastructure::event_bus::EventBus;
use critique_core::infrastructure::ScriptedDecisionEngine;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Fixtures
// ============================================================================

fn id(name: &str) -> WorkerId {
    WorkerId::new(name).unwrap()
}

struct SaveDraft {
    descriptor: CapabilityDescriptor,
}

impl SaveDraft {
    fn new() -> Self {
        Self {
            descriptor: CapabilityDescriptor::new("save_draft", "Save the draft review", Purity::Write)
                .with_input_schema(json!({
                    "type": "object",
                    "properties": { "text": { "type": "string" } },
                    "required": ["text"]
                }))
                .with_output_schema(json!({
                    "type": "object",
                    "required": ["saved"]
                })),
        }
    }
}

#[async_trait]
impl Capability for SaveDraft {
    fn descriptor(&self) -> &CapabilityDescriptor {
        &self.descriptor
    }

    async fn invoke(&self, arguments: Value, mut state: StateHandle<'_>) -> Result<Value, CollaboratorError> {
        state.set("draft_artifact", arguments["text"].clone())?;
        Ok(json!({ "saved": true }))
    }
}

/// Write capability that counts how often it actually ran.
struct Publish {
    descriptor: CapabilityDescriptor,
    calls: AtomicUsize,
}

impl Publish {
    fn new() -> Self {
        Self {
            descriptor: CapabilityDescriptor::new("publish_review", "Publish the review", Purity::Write),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Capability for Publish {
    fn descriptor(&self) -> &CapabilityDescriptor {
        &self.descriptor
    }

    async fn invoke(&self, _arguments: Value, _state: StateHandle<'_>) -> Result<Value, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!({ "published": true }))
    }
}

/// Read capability that misbehaves by trying to write.
struct SneakyRead {
    descriptor: CapabilityDescriptor,
}

#[async_trait]
impl Capability for SneakyRead {
    fn descriptor(&self) -> &CapabilityDescriptor {
        &self.descriptor
    }

    async fn invoke(&self, _arguments: Value, mut state: StateHandle<'_>) -> Result<Value, CollaboratorError> {
        state.set("final_artifact", json!("overwritten"))?;
        Ok(Value::Null)
    }
}

struct Unreachable {
    descriptor: CapabilityDescriptor,
}

#[async_trait]
impl Capability for Unreachable {
    fn descriptor(&self) -> &CapabilityDescriptor {
        &self.descriptor
    }

    async fn invoke(&self, _arguments: Value, _state: StateHandle<'_>) -> Result<Value, CollaboratorError> {
        Err(CollaboratorError::Unavailable("connection refused".to_string()))
    }
}

struct Fixture {
    registry: Arc<CapabilityRegistry>,
    publish: Arc<Publish>,
}

fn fixture() -> Fixture {
    let publish = Arc::new(Publish::new());
    let mut registry = CapabilityRegistry::new();
    registry.register(Arc::new(SaveDraft::new())).unwrap();
    registry.register(publish.clone()).unwrap();
    registry
        .register(Arc::new(SneakyRead {
            descriptor: CapabilityDescriptor::new("peek", "Read-only lookup", Purity::Read),
        }))
        .unwrap();
    registry
        .register(Arc::new(Unreachable {
            descriptor: CapabilityDescriptor::new("fetch_file_content", "Fetch a file", Purity::Read),
        }))
        .unwrap();
    Fixture {
        registry: Arc::new(registry),
        publish,
    }
}

/// Reviewer (root) <-> Drafter, plus an Outsider nobody may hand off to.
fn review_roster(rewrite_budget: Option<u32>) -> Roster {
    let reviewer = Worker::builder(id("Reviewer"))
        .description("Checks drafts against the rubric")
        .role("Review the draft and send it back if it is too short.")
        .capability("peek");
    let reviewer = match rewrite_budget {
        Some(limit) => reviewer.bounded_peer(id("Drafter"), limit),
        None => reviewer.peer(id("Drafter")),
    };

    let drafter = Worker::builder(id("Drafter"))
        .description("Writes review drafts")
        .role("Write the draft review.")
        .capability("save_draft")
        .capability("fetch_file_content")
        .peer(id("Reviewer"))
        .build();

    let outsider = Worker::builder(id("Outsider"))
        .description("Publishes reviews")
        .capability("publish_review")
        .build();

    Roster::new(id("Reviewer"), vec![reviewer.build(), drafter, outsider]).unwrap()
}

fn orchestrator(fixture: &Fixture, roster: Roster, engine: Arc<dyn DecisionEngine>, max_steps: u32) -> Orchestrator {
    Orchestrator::new(
        fixture.registry.clone(),
        Arc::new(roster),
        engine,
        OrchestratorSettings { max_steps },
    )
    .unwrap()
}

// ============================================================================
// Termination
// ============================================================================

#[tokio::test]
async fn test_output_only_run_terminates_in_one_step() {
    let fixture = fixture();
    let engine = Arc::new(ScriptedDecisionEngine::new().script(&id("Reviewer"), [Action::output("done")]));
    let orchestrator = orchestrator(&fixture, review_roster(None), engine.clone(), 10);

    let report = orchestrator
        .run(RunRequest::new(id("Reviewer"), "Write a review for PR: 1"))
        .await
        .unwrap();

    assert_eq!(report.output(), Some("done"));
    assert_eq!(report.steps, 1);
    assert!(report.trace.is_empty());
    assert_eq!(report.active_worker, id("Reviewer"));

    let observed = engine.observed().await;
    assert_eq!(observed.len(), 1);
    assert_eq!(observed[0].worker, id("Reviewer"));
    assert_eq!(observed[0].step, 0);
}

#[tokio::test]
async fn test_reviewer_drafter_retry_scenario() {
    let fixture = fixture();
    let engine = Arc::new(
        ScriptedDecisionEngine::new()
            .script(
                &id("Reviewer"),
                [Action::handoff(id("Drafter")), Action::handoff(id("Drafter"))],
            )
            .script(
                &id("Drafter"),
                [
                    Action::invoke("save_draft", json!({ "text": "LGTM" })),
                    Action::handoff(id("Reviewer")),
                    Action::output("Final review: LGTM, approved."),
                ],
            ),
    );
    let orchestrator = orchestrator(&fixture, review_roster(None), engine.clone(), 20);

    let report = orchestrator
        .run(RunRequest::new(id("Reviewer"), "Write a review for PR: 7"))
        .await
        .unwrap();

    assert_eq!(report.output(), Some("Final review: LGTM, approved."));
    assert_eq!(report.trace.len(), 4);
    assert_eq!(report.steps, 5);
    assert_eq!(report.state.draft_artifact(), "LGTM");
    assert_eq!(report.active_worker, id("Drafter"));
    assert!(report.step_errors().is_empty());

    let workers: Vec<_> = report.trace.iter().map(|event| event.worker.as_str().to_string()).collect();
    assert_eq!(workers, ["Reviewer", "Drafter", "Drafter", "Reviewer"]);
    assert!(matches!(report.trace[1].entry, TraceEntry::CapabilityInvoked { .. }));

    // The reviewer's second decision saw the saved draft
    let observed = engine.observed().await;
    let reviewer_second = observed
        .iter()
        .filter(|decision| decision.worker == id("Reviewer"))
        .nth(1)
        .unwrap();
    assert_eq!(reviewer_second.state["draft_artifact"], "LGTM");
    assert_eq!(engine.remaining().await, 0);
}

#[tokio::test]
async fn test_ping_pong_stops_at_step_limit() {
    let fixture = fixture();
    let engine = Arc::new(
        ScriptedDecisionEngine::new()
            .script(&id("Reviewer"), std::iter::repeat(Action::handoff(id("Drafter"))).take(50))
            .script(&id("Drafter"), std::iter::repeat(Action::handoff(id("Reviewer"))).take(50)),
    );
    let orchestrator = orchestrator(&fixture, review_roster(None), engine.clone(), 7);

    let report = orchestrator
        .run(RunRequest::new(id("Reviewer"), "loop forever"))
        .await
        .unwrap();

    assert_eq!(
        report.status,
        RunStatus::Failed {
            failure: RunFailure::StepLimitExceeded { limit: 7 }
        }
    );
    assert_eq!(report.failure().unwrap().kind(), ErrorKind::StepLimit);
    assert_eq!(report.steps, 7);
    assert_eq!(report.trace.len(), 7);
    assert_eq!(engine.observed().await.len(), 7);
    assert_eq!(engine.remaining().await, 100 - 7);
    assert!(report.output().is_none());
}

#[tokio::test]
async fn test_decision_error_fails_run() {
    let fixture = fixture();
    let engine = Arc::new(ScriptedDecisionEngine::new().script(&id("Reviewer"), [Action::handoff(id("Drafter"))]));
    let orchestrator = orchestrator(&fixture, review_roster(None), engine, 10);

    let report = orchestrator.run(RunRequest::new(id("Reviewer"), "go")).await.unwrap();

    match report.status {
        RunStatus::Failed {
            failure: RunFailure::Decision { error },
        } => {
            assert_eq!(error, DecisionError::ScriptExhausted("Drafter".to_string()));
            assert_eq!(error.kind(), ErrorKind::Decision);
        }
        other => panic!("expected decision failure, got {:?}", other),
    }
    assert_eq!(report.steps, 1);
    assert_eq!(report.trace.len(), 1);
    assert_eq!(report.active_worker, id("Drafter"));
}

// ============================================================================
// Validation
// ============================================================================

#[tokio::test]
async fn test_unauthorized_handoff_keeps_active_worker() {
    let fixture = fixture();
    let engine = Arc::new(
        ScriptedDecisionEngine::new().script(
            &id("Reviewer"),
            [Action::handoff(id("Outsider")), Action::output("stayed")],
        ),
    );
    let orchestrator = orchestrator(&fixture, review_roster(None), engine.clone(), 10);

    let report = orchestrator.run(RunRequest::new(id("Reviewer"), "go")).await.unwrap();

    assert_eq!(report.output(), Some("stayed"));
    assert_eq!(report.active_worker, id("Reviewer"));
    assert_eq!(
        report.step_errors(),
        vec![StepError::Validation(ValidationError::UnauthorizedHandoff {
            worker: id("Reviewer"),
            target: id("Outsider"),
        })]
    );

    let observed = engine.observed().await;
    assert!(observed.iter().all(|decision| decision.worker == id("Reviewer")));
    assert_eq!(observed[1].last_error.as_ref().map(StepError::kind), Some(ErrorKind::Validation));
}

#[tokio::test]
async fn test_unauthorized_capability_never_executes() {
    let fixture = fixture();
    let engine = Arc::new(
        ScriptedDecisionEngine::new().script(
            &id("Reviewer"),
            [Action::invoke("publish_review", json!({})), Action::output("gave up")],
        ),
    );
    let orchestrator = orchestrator(&fixture, review_roster(None), engine, 10);

    let report = orchestrator.run(RunRequest::new(id("Reviewer"), "go")).await.unwrap();

    assert_eq!(fixture.publish.calls.load(Ordering::SeqCst), 0);
    assert_eq!(report.output(), Some("gave up"));
    match &report.trace[0].entry {
        TraceEntry::CapabilityFailed { capability, error, .. } => {
            assert_eq!(capability.as_str(), "publish_review");
            assert!(matches!(
                error,
                StepError::Validation(ValidationError::UnauthorizedCapability { .. })
            ));
        }
        other => panic!("unexpected trace entry {:?}", other),
    }
}

#[tokio::test]
async fn test_invalid_arguments_are_recoverable() {
    let fixture = fixture();
    let engine = Arc::new(
        ScriptedDecisionEngine::new()
            .script(&id("Reviewer"), [Action::handoff(id("Drafter"))])
            .script(
                &id("Drafter"),
                [
                    Action::invoke("save_draft", json!({ "text": 5 })),
                    Action::invoke("save_draft", json!({ "text": "fixed" })),
                    Action::output("ok"),
                ],
            ),
    );
    let orchestrator = orchestrator(&fixture, review_roster(None), engine.clone(), 10);

    let report = orchestrator.run(RunRequest::new(id("Reviewer"), "go")).await.unwrap();

    assert_eq!(report.output(), Some("ok"));
    assert_eq!(report.state.draft_artifact(), "fixed");
    assert!(matches!(
        report.step_errors().as_slice(),
        [StepError::Validation(ValidationError::InvalidArgument { .. })]
    ));

    let observed = engine.observed().await;
    assert!(matches!(
        observed[2].last_error,
        Some(StepError::Validation(ValidationError::InvalidArgument { .. }))
    ));
}

#[tokio::test]
async fn test_collaborator_failure_is_recorded_and_run_continues() {
    let fixture = fixture();
    let engine = Arc::new(
        ScriptedDecisionEngine::new()
            .script(&id("Reviewer"), [Action::handoff(id("Drafter"))])
            .script(
                &id("Drafter"),
                [
                    Action::invoke("fetch_file_content", json!({ "path": "README.md" })),
                    Action::output("drafted without the file"),
                ],
            ),
    );
    let orchestrator = orchestrator(&fixture, review_roster(None), engine, 10);

    let report = orchestrator.run(RunRequest::new(id("Reviewer"), "go")).await.unwrap();

    assert_eq!(report.output(), Some("drafted without the file"));
    assert_eq!(
        report.step_errors(),
        vec![StepError::Collaborator(CollaboratorError::Unavailable(
            "connection refused".to_string()
        ))]
    );
}

#[tokio::test]
async fn test_read_capability_cannot_mutate_state() {
    let fixture = fixture();
    let engine = Arc::new(
        ScriptedDecisionEngine::new()
            .script(&id("Reviewer"), [Action::invoke("peek", json!({})), Action::output("done")]),
    );
    let orchestrator = orchestrator(&fixture, review_roster(None), engine, 10);

    let report = orchestrator
        .run(RunRequest::new(id("Reviewer"), "go").with_seed("final_artifact", json!("original")))
        .await
        .unwrap();

    assert_eq!(report.state.final_artifact(), "original");
    assert!(matches!(
        report.step_errors().as_slice(),
        [StepError::Collaborator(CollaboratorError::State(_))]
    ));
}

// ============================================================================
// Bounded retry edge
// ============================================================================

#[tokio::test]
async fn test_rewrite_budget_is_independent_of_step_limit() {
    let fixture = fixture();
    let engine = Arc::new(
        ScriptedDecisionEngine::new()
            .script(
                &id("Reviewer"),
                [
                    Action::handoff(id("Drafter")),
                    Action::handoff(id("Drafter")),
                    Action::output("accepting what we have"),
                ],
            )
            .script(&id("Drafter"), [Action::handoff(id("Reviewer"))]),
    );
    let orchestrator = orchestrator(&fixture, review_roster(Some(1)), engine, 100);

    let report = orchestrator.run(RunRequest::new(id("Reviewer"), "go")).await.unwrap();

    assert_eq!(report.output(), Some("accepting what we have"));
    assert_eq!(report.active_worker, id("Reviewer"));
    assert_eq!(report.steps, 4);
    assert_eq!(
        report.step_errors(),
        vec![StepError::Validation(ValidationError::HandoffBudgetExhausted {
            worker: id("Reviewer"),
            target: id("Drafter"),
            limit: 1,
        })]
    );
}

// ============================================================================
// Request validation
// ============================================================================

#[tokio::test]
async fn test_request_errors_rejected_before_any_step() {
    let fixture = fixture();
    let engine = Arc::new(ScriptedDecisionEngine::new());
    let orchestrator = orchestrator(&fixture, review_roster(None), engine.clone(), 10);

    let result = orchestrator.run(RunRequest::new(id("Nobody"), "go")).await;
    assert!(matches!(result, Err(RunRequestError::UnknownRoot(_))));

    let result = orchestrator
        .run(RunRequest::new(id("Reviewer"), "go").with_seed("draft_artifact", json!(["not", "text"])))
        .await;
    assert!(matches!(result, Err(RunRequestError::InvalidSeed(_))));

    assert!(engine.observed().await.is_empty());
}

#[test]
fn test_roster_must_reference_registered_capabilities() {
    let fixture = fixture();
    let roster = Roster::new(
        id("Solo"),
        vec![Worker::builder(id("Solo")).capability("launch_rockets").build()],
    )
    .unwrap();

    let result = Orchestrator::new(
        fixture.registry.clone(),
        Arc::new(roster),
        Arc::new(ScriptedDecisionEngine::new()),
        OrchestratorSettings::default(),
    );

    assert!(matches!(result, Err(RosterError::UnknownCapability { .. })));
}

#[tokio::test]
async fn test_any_declared_worker_may_start_a_run() {
    let fixture = fixture();
    let engine = Arc::new(ScriptedDecisionEngine::new().script(&id("Drafter"), [Action::output("drafter first")]));
    let orchestrator = orchestrator(&fixture, review_roster(None), engine, 10);

    let report = orchestrator.run(RunRequest::new(id("Drafter"), "go")).await.unwrap();
    assert_eq!(report.output(), Some("drafter first"));
    assert_eq!(report.active_worker, id("Drafter"));
}

// ============================================================================
// Cancellation
// ============================================================================

/// Never answers.
struct Stalled;

#[async_trait]
impl DecisionEngine for Stalled {
    async fn decide(&self, _request: &DecisionRequest<'_>) -> Result<Action, DecisionError> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let fixture = fixture();
    let engine = Arc::new(ScriptedDecisionEngine::new().script(&id("Reviewer"), [Action::output("done")]));
    let orchestrator = orchestrator(&fixture, review_roster(None), engine.clone(), 10);

    let token = CancellationToken::new();
    token.cancel();

    let report = orchestrator
        .run_with_cancellation(RunRequest::new(id("Reviewer"), "go"), token)
        .await
        .unwrap();

    assert!(report.is_cancelled());
    assert_eq!(report.steps, 0);
    assert!(engine.observed().await.is_empty());
}

#[tokio::test]
async fn test_cancel_while_awaiting_decision_keeps_state() {
    let fixture = fixture();
    let orchestrator = orchestrator(&fixture, review_roster(None), Arc::new(Stalled), 10);

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let report = tokio::time::timeout(
        Duration::from_secs(5),
        orchestrator.run_with_cancellation(
            RunRequest::new(id("Reviewer"), "go").with_seed("gathered_context", json!("diff --git a b")),
            token,
        ),
    )
    .await
    .expect("cancellation should end the run")
    .unwrap();

    assert!(report.is_cancelled());
    assert_eq!(report.steps, 0);
    assert_eq!(report.state.gathered_context(), "diff --git a b");
}

/// Writes half a draft, then hangs on its collaborator.
struct HangingWrite {
    descriptor: CapabilityDescriptor,
}

#[async_trait]
impl Capability for HangingWrite {
    fn descriptor(&self) -> &CapabilityDescriptor {
        &self.descriptor
    }

    async fn invoke(&self, _arguments: Value, mut state: StateHandle<'_>) -> Result<Value, CollaboratorError> {
        state.set("draft_artifact", json!("half"))?;
        std::future::pending().await
    }
}

#[tokio::test]
async fn test_cancel_during_capability_keeps_partial_write() {
    let mut registry = CapabilityRegistry::new();
    registry
        .register(Arc::new(HangingWrite {
            descriptor: CapabilityDescriptor::new("save_draft", "Save the draft review", Purity::Write),
        }))
        .unwrap();
    let drafter = Worker::builder(id("Drafter")).capability("save_draft").build();
    let roster = Roster::new(id("Drafter"), vec![drafter]).unwrap();
    let engine = Arc::new(
        ScriptedDecisionEngine::new().script(&id("Drafter"), [Action::invoke("save_draft", json!({}))]),
    );
    let orchestrator = Orchestrator::new(
        Arc::new(registry),
        Arc::new(roster),
        engine,
        OrchestratorSettings { max_steps: 10 },
    )
    .unwrap();

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let report = tokio::time::timeout(
        Duration::from_secs(5),
        orchestrator.run_with_cancellation(RunRequest::new(id("Drafter"), "go"), token),
    )
    .await
    .expect("cancellation should end the run")
    .unwrap();

    assert!(report.is_cancelled());
    assert_eq!(report.steps, 1);
    assert_eq!(report.state.draft_artifact(), "half");
    assert!(report.trace.is_empty());
}

// ============================================================================
// Isolation
// ============================================================================

/// Saves the seeded `pr` value as the draft, then finishes. Yields between
/// decisions so concurrent runs interleave.
struct CopySeedToDraft;

#[async_trait]
impl DecisionEngine for CopySeedToDraft {
    async fn decide(&self, request: &DecisionRequest<'_>) -> Result<Action, DecisionError> {
        tokio::time::sleep(Duration::from_millis(5)).await;
        let draft = request.state["draft_artifact"].as_str().unwrap_or_default();
        if draft.is_empty() {
            let pr = request.state["pr"].to_string();
            Ok(Action::invoke("save_draft", json!({ "text": format!("review of #{}", pr) })))
        } else {
            Ok(Action::output(draft))
        }
    }
}

#[tokio::test]
async fn test_concurrent_runs_have_separate_state() {
    let fixture = fixture();
    let drafter = Worker::builder(id("Drafter")).capability("save_draft").build();
    let roster = Roster::new(id("Drafter"), vec![drafter]).unwrap();
    let orchestrator = orchestrator(&fixture, roster, Arc::new(CopySeedToDraft), 10);

    let (first, second) = tokio::join!(
        orchestrator.run(RunRequest::new(id("Drafter"), "go").with_seed("pr", json!(7))),
        orchestrator.run(RunRequest::new(id("Drafter"), "go").with_seed("pr", json!(9))),
    );
    let (first, second) = (first.unwrap(), second.unwrap());

    assert_ne!(first.run_id, second.run_id);
    assert_eq!(first.output(), Some("review of #7"));
    assert_eq!(second.output(), Some("review of #9"));
    assert_eq!(first.state.draft_artifact(), "review of #7");
    assert_eq!(second.state.draft_artifact(), "review of #9");
    assert_eq!(first.state.get("pr"), json!(7));
    assert_eq!(second.state.get("pr"), json!(9));
    assert_eq!(first.trace.len(), 1);
    assert_eq!(second.trace.len(), 1);
}

// ============================================================================
// Events
// ============================================================================

#[tokio::test]
async fn test_run_events_published_in_order() {
    let fixture = fixture();
    let engine = Arc::new(
        ScriptedDecisionEngine::new()
            .script(&id("Reviewer"), [Action::handoff(id("Drafter"))])
            .script(
                &id("Drafter"),
                [
                    Action::invoke("save_draft", json!({ "text": "draft" })),
                    Action::output("done"),
                ],
            ),
    );
    let bus = EventBus::new(64);
    let mut receiver = bus.subscribe();
    let orchestrator = orchestrator(&fixture, review_roster(None), engine, 10).with_event_bus(bus);

    let report = orchestrator.run(RunRequest::new(id("Reviewer"), "go")).await.unwrap();

    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        assert_eq!(event.run_id(), report.run_id);
        events.push(event);
    }

    assert_eq!(events.len(), 4);
    assert!(matches!(events[0], RunEvent::RunStarted { .. }));
    assert!(matches!(events[1], RunEvent::ActiveWorkerChanged { ref to, .. } if to == &id("Drafter")));
    assert!(matches!(events[2], RunEvent::CapabilityInvoked { .. }));
    assert!(matches!(events[3], RunEvent::RunTerminated { steps: 3, .. }));
    assert!(events[3].is_final());
}

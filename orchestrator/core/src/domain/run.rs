// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Run
//!
//! One end-to-end orchestration from a root worker to a terminal output or
//! a failure. The run owns its Shared State Store and an ordered trace of
//! every non-terminal step.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::domain::capability::CapabilityName;
use crate::domain::error::{CollaboratorError, DecisionError, ErrorKind, ValidationError};
use crate::domain::state::{SharedState, StateError};
use crate::domain::worker::WorkerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Request
// ============================================================================

/// How a caller starts a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRequest {
    pub root: WorkerId,
    pub instruction: String,
    #[serde(default)]
    pub seed: BTreeMap<String, Value>,
}

impl RunRequest {
    pub fn new(root: WorkerId, instruction: impl Into<String>) -> Self {
        Self {
            root,
            instruction: instruction.into(),
            seed: BTreeMap::new(),
        }
    }

    pub fn with_seed(mut self, key: impl Into<String>, value: Value) -> Self {
        self.seed.insert(key.into(), value);
        self
    }
}

/// The request was refused before any step ran.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RunRequestError {
    #[error("Root worker '{0}' is not in the roster")]
    UnknownRoot(WorkerId),

    #[error("Invalid seed value: {0}")]
    InvalidSeed(#[from] StateError),
}

// ============================================================================
// Trace
// ============================================================================

/// Why a step failed without ending the run.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum StepError {
    #[error(transparent)]
    Validation(ValidationError),

    #[error(transparent)]
    Collaborator(CollaboratorError),
}

impl StepError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StepError::Validation(e) => e.kind(),
            StepError::Collaborator(e) => e.kind(),
        }
    }
}

/// What happened during one non-terminal step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEntry {
    CapabilityInvoked {
        capability: CapabilityName,
        arguments: Value,
        result: Value,
    },
    CapabilityFailed {
        capability: CapabilityName,
        arguments: Value,
        error: StepError,
    },
    HandoffAccepted {
        target: WorkerId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    HandoffRejected {
        target: WorkerId,
        error: ValidationError,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub step: u32,
    pub worker: WorkerId,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub entry: TraceEntry,
}

impl TraceEvent {
    pub fn new(step: u32, worker: WorkerId, entry: TraceEntry) -> Self {
        Self {
            step,
            worker,
            timestamp: Utc::now(),
            entry,
        }
    }

    /// The recoverable error surfaced by this step, if any.
    pub fn error(&self) -> Option<StepError> {
        match &self.entry {
            TraceEntry::CapabilityFailed { error, .. } => Some(error.clone()),
            TraceEntry::HandoffRejected { error, .. } => Some(StepError::Validation(error.clone())),
            _ => None,
        }
    }
}

// ============================================================================
// Outcome
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "failure", rename_all = "snake_case")]
pub enum RunFailure {
    #[error(transparent)]
    Decision { error: DecisionError },

    #[error("Step limit of {limit} exceeded")]
    StepLimitExceeded { limit: u32 },
}

impl RunFailure {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RunFailure::Decision { error } => error.kind(),
            RunFailure::StepLimitExceeded { .. } => ErrorKind::StepLimit,
        }
    }
}

impl From<DecisionError> for RunFailure {
    fn from(error: DecisionError) -> Self {
        RunFailure::Decision { error }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    Terminated { output: String },
    Failed { failure: RunFailure },
    Cancelled,
}

/// What the caller gets back: terminal output or structured failure, with the
/// trace that led there and the state as last written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub status: RunStatus,
    /// Decisions taken, terminal one included.
    pub steps: u32,
    pub active_worker: WorkerId,
    pub trace: Vec<TraceEvent>,
    pub state: SharedState,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    pub fn output(&self) -> Option<&str> {
        match &self.status {
            RunStatus::Terminated { output } => Some(output),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&RunFailure> {
        match &self.status {
            RunStatus::Failed { failure } => Some(failure),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.status, RunStatus::Cancelled)
    }

    /// Recoverable errors surfaced along the way, in order.
    pub fn step_errors(&self) -> Vec<StepError> {
        self.trace.iter().filter_map(TraceEvent::error).collect()
    }
}

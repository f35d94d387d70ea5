// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Error taxonomy shared by every run.
//!
//! | Kind | Raised for | Run outcome |
//! |------|-----------|-------------|
//! | [`ErrorKind::Validation`] | malformed arguments, unauthorized capability or handoff | recorded, run continues |
//! | [`ErrorKind::Collaborator`] | external system failure inside a capability | recorded, run continues |
//! | [`ErrorKind::Decision`] | decision backend produced no usable action | run fails |
//! | [`ErrorKind::StepLimit`] | liveness bound hit | run fails |

use serde::{Deserialize, Serialize};

use crate::domain::capability::CapabilityName;
use crate::domain::state::StateError;
use crate::domain::worker::WorkerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Collaborator,
    Decision,
    StepLimit,
}

impl ErrorKind {
    /// Whether the run survives an error of this kind.
    pub fn is_recoverable(self) -> bool {
        matches!(self, ErrorKind::Validation | ErrorKind::Collaborator)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Collaborator => "collaborator",
            ErrorKind::Decision => "decision",
            ErrorKind::StepLimit => "step_limit",
        };
        f.write_str(name)
    }
}

/// Contract violations by the active worker. Always a logic defect, never transient.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("Worker '{worker}' is not permitted to invoke capability '{capability}'")]
    UnauthorizedCapability {
        worker: WorkerId,
        capability: CapabilityName,
    },

    #[error("Worker '{worker}' is not permitted to hand off to '{target}'")]
    UnauthorizedHandoff { worker: WorkerId, target: WorkerId },

    #[error("Handoff '{worker}' -> '{target}' exhausted its budget of {limit} traversals")]
    HandoffBudgetExhausted {
        worker: WorkerId,
        target: WorkerId,
        limit: u32,
    },

    #[error("Capability '{capability}' is not registered")]
    UnknownCapability { capability: CapabilityName },

    #[error("Invalid arguments for '{capability}': {}", .violations.join("; "))]
    InvalidArgument {
        capability: CapabilityName,
        violations: Vec<String>,
    },
}

impl ValidationError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}

/// Failure of an external system behind a capability.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "error", content = "message", rename_all = "snake_case")]
pub enum CollaboratorError {
    #[error("Collaborator unavailable: {0}")]
    Unavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Result does not match output schema: {0}")]
    InvalidOutput(String),

    #[error("State error: {0}")]
    State(String),
}

impl CollaboratorError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Collaborator
    }
}

impl From<StateError> for CollaboratorError {
    fn from(error: StateError) -> Self {
        CollaboratorError::State(error.to_string())
    }
}

/// The decision backend could not produce a valid action. Fatal to the run.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "error", content = "message", rename_all = "snake_case")]
pub enum DecisionError {
    #[error("Decision backend failed: {0}")]
    Backend(String),

    #[error("Decision backend returned an unparseable action: {0}")]
    MalformedAction(String),

    #[error("No scripted action left for worker '{0}'")]
    ScriptExhausted(String),
}

impl DecisionError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Decision
    }
}

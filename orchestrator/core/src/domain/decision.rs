// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Decision Engine port
//!
//! The orchestrator asks a [`DecisionEngine`] what the active worker does
//! next. The answer is one tagged [`Action`]; the orchestrator validates it
//! before anything executes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::capability::{CapabilityDescriptor, CapabilityName};
use crate::domain::error::DecisionError;
use crate::domain::run::{RunId, TraceEvent};
use crate::domain::worker::{Worker, WorkerId};

/// What the active worker does next.
///
/// Serialized with an `action` tag so backends can answer in JSON:
///
/// ```json
/// { "action": "invoke", "capability": "save_draft", "arguments": { "text": "LGTM" } }
/// { "action": "handoff", "target": "Reviewer" }
/// { "action": "output", "text": "done" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Invoke {
        capability: CapabilityName,
        #[serde(default = "empty_arguments")]
        arguments: Value,
    },
    Handoff {
        target: WorkerId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    Output {
        text: String,
    },
}

fn empty_arguments() -> Value {
    Value::Object(Default::default())
}

impl Action {
    pub fn invoke(capability: impl Into<String>, arguments: Value) -> Self {
        Action::Invoke {
            capability: CapabilityName::new(capability),
            arguments,
        }
    }

    pub fn handoff(target: WorkerId) -> Self {
        Action::Handoff {
            target,
            reason: None,
        }
    }

    pub fn output(text: impl Into<String>) -> Self {
        Action::Output { text: text.into() }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Action::Output { .. })
    }
}

/// A peer as presented to the decision backend.
#[derive(Debug, Clone, Serialize)]
pub struct PeerSummary {
    pub id: WorkerId,
    pub description: String,
}

/// Everything the decision backend sees for one step.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionRequest<'a> {
    pub run_id: RunId,
    pub step: u32,
    pub worker: &'a Worker,
    pub capabilities: Vec<CapabilityDescriptor>,
    pub peers: Vec<PeerSummary>,
    pub state: Value,
    pub history: &'a [TraceEvent],
    pub instruction: &'a str,
}

#[async_trait]
pub trait DecisionEngine: Send + Sync {
    async fn decide(&self, request: &DecisionRequest<'_>) -> Result<Action, DecisionError>;
}

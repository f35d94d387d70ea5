// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::capability::CapabilityName;
use crate::domain::run::RunId;
use crate::domain::worker::WorkerId;

/// Progress of a run, published as it happens.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    RunStarted {
        run_id: RunId,
        root: WorkerId,
        instruction: String,
        started_at: DateTime<Utc>,
    },
    ActiveWorkerChanged {
        run_id: RunId,
        step: u32,
        from: WorkerId,
        to: WorkerId,
        changed_at: DateTime<Utc>,
    },
    CapabilityInvoked {
        run_id: RunId,
        step: u32,
        worker: WorkerId,
        capability: CapabilityName,
        arguments: serde_json::Value,
        result: serde_json::Value,
        invoked_at: DateTime<Utc>,
    },
    CapabilityFailed {
        run_id: RunId,
        step: u32,
        worker: WorkerId,
        capability: CapabilityName,
        error: String,
        failed_at: DateTime<Utc>,
    },
    HandoffRejected {
        run_id: RunId,
        step: u32,
        worker: WorkerId,
        target: WorkerId,
        error: String,
        rejected_at: DateTime<Utc>,
    },
    RunTerminated {
        run_id: RunId,
        steps: u32,
        worker: WorkerId,
        output: String,
        terminated_at: DateTime<Utc>,
    },
    RunFailed {
        run_id: RunId,
        steps: u32,
        reason: String,
        failed_at: DateTime<Utc>,
    },
    RunCancelled {
        run_id: RunId,
        steps: u32,
        cancelled_at: DateTime<Utc>,
    },
}

impl RunEvent {
    pub fn run_id(&self) -> RunId {
        match self {
            RunEvent::RunStarted { run_id, .. }
            | RunEvent::ActiveWorkerChanged { run_id, .. }
            | RunEvent::CapabilityInvoked { run_id, .. }
            | RunEvent::CapabilityFailed { run_id, .. }
            | RunEvent::HandoffRejected { run_id, .. }
            | RunEvent::RunTerminated { run_id, .. }
            | RunEvent::RunFailed { run_id, .. }
            | RunEvent::RunCancelled { run_id, .. } => *run_id,
        }
    }

    /// Whether no further events follow for this run.
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            RunEvent::RunTerminated { .. } | RunEvent::RunFailed { .. } | RunEvent::RunCancelled { .. }
        )
    }
}

// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Scripted Decision Engine
//
// Replays a fixed queue of actions per worker. Used for dry runs and for
// exercising rosters without a text-generation backend.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use tokio::sync::Mutex;

use crate::domain::decision::{Action, DecisionEngine, DecisionRequest};
use crate::domain::error::DecisionError;
use crate::domain::run::StepError;
use crate::domain::worker::WorkerId;

/// What the engine was shown when asked to decide.
#[derive(Debug, Clone)]
pub struct ObservedDecision {
    pub worker: WorkerId,
    pub step: u32,
    pub state: Value,
    pub history_len: usize,
    pub last_error: Option<StepError>,
}

#[derive(Default)]
pub struct ScriptedDecisionEngine {
    scripts: Mutex<HashMap<WorkerId, VecDeque<Action>>>,
    observed: Mutex<Vec<ObservedDecision>>,
}

impl ScriptedDecisionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append actions to a worker's queue.
    pub fn script(mut self, worker: &WorkerId, actions: impl IntoIterator<Item = Action>) -> Self {
        self.scripts
            .get_mut()
            .entry(worker.clone())
            .or_default()
            .extend(actions);
        self
    }

    pub async fn push(&self, worker: &WorkerId, action: Action) {
        self.scripts
            .lock()
            .await
            .entry(worker.clone())
            .or_default()
            .push_back(action);
    }

    /// Actions not consumed yet, across all workers.
    pub async fn remaining(&self) -> usize {
        self.scripts.lock().await.values().map(VecDeque::len).sum()
    }

    pub async fn observed(&self) -> Vec<ObservedDecision> {
        self.observed.lock().await.clone()
    }
}

#[async_trait]
impl DecisionEngine for ScriptedDecisionEngine {
    async fn decide(&self, request: &DecisionRequest<'_>) -> Result<Action, DecisionError> {
        let worker = request.worker.id();

        self.observed.lock().await.push(ObservedDecision {
            worker: worker.clone(),
            step: request.step,
            state: request.state.clone(),
            history_len: request.history.len(),
            last_error: request.history.last().and_then(|event| event.error()),
        });

        self.scripts
            .lock()
            .await
            .get_mut(worker)
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| DecisionError::ScriptExhausted(worker.to_string()))
    }
}

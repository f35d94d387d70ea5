// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Worker
//!
//! Workers are bounded actors: an identity, a role description that biases
//! the decision backend, the capabilities they may invoke and the peers they
//! may hand control to. A [`Roster`] is the validated, immutable set of
//! workers a run executes over.
//!
//! # Invariants
//!
//! - Worker ids are unique within a roster.
//! - The root worker exists.
//! - Every handoff target exists and is not the worker itself.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::domain::capability::CapabilityName;

// ============================================================================
// Value Objects
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WorkerId(String);

impl WorkerId {
    pub fn new(id: impl Into<String>) -> Result<Self, RosterError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(RosterError::EmptyWorkerId);
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for WorkerId {
    type Error = RosterError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<WorkerId> for String {
    fn from(value: WorkerId) -> Self {
        value.0
    }
}

impl std::fmt::Display for WorkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A permitted control transfer. `max_traversals` bounds how often this edge
/// may be taken in a single run (`None` means the step limit is the only bound).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffEdge {
    pub target: WorkerId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_traversals: Option<u32>,
}

impl HandoffEdge {
    pub fn unbounded(target: WorkerId) -> Self {
        Self {
            target,
            max_traversals: None,
        }
    }

    pub fn bounded(target: WorkerId, max_traversals: u32) -> Self {
        Self {
            target,
            max_traversals: Some(max_traversals),
        }
    }
}

// ============================================================================
// Worker
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worker {
    id: WorkerId,
    description: String,
    role: String,
    capabilities: BTreeSet<CapabilityName>,
    peers: Vec<HandoffEdge>,
}

impl Worker {
    pub fn builder(id: WorkerId) -> WorkerBuilder {
        WorkerBuilder {
            id,
            description: String::new(),
            role: String::new(),
            capabilities: BTreeSet::new(),
            peers: Vec::new(),
        }
    }

    pub fn id(&self) -> &WorkerId {
        &self.id
    }

    /// One-line summary shown to peers deciding whether to hand off.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Role prompt used to bias the decision backend.
    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn capabilities(&self) -> &BTreeSet<CapabilityName> {
        &self.capabilities
    }

    pub fn peers(&self) -> &[HandoffEdge] {
        &self.peers
    }

    pub fn can_invoke(&self, capability: &CapabilityName) -> bool {
        self.capabilities.contains(capability)
    }

    pub fn edge_to(&self, target: &WorkerId) -> Option<&HandoffEdge> {
        self.peers.iter().find(|edge| &edge.target == target)
    }

    pub fn can_hand_off_to(&self, target: &WorkerId) -> bool {
        self.edge_to(target).is_some()
    }
}

pub struct WorkerBuilder {
    id: WorkerId,
    description: String,
    role: String,
    capabilities: BTreeSet<CapabilityName>,
    peers: Vec<HandoffEdge>,
}

impl WorkerBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }

    pub fn capability(mut self, name: impl Into<String>) -> Self {
        self.capabilities.insert(CapabilityName::new(name));
        self
    }

    pub fn peer(mut self, target: WorkerId) -> Self {
        self.peers.push(HandoffEdge::unbounded(target));
        self
    }

    pub fn bounded_peer(mut self, target: WorkerId, max_traversals: u32) -> Self {
        self.peers.push(HandoffEdge::bounded(target, max_traversals));
        self
    }

    pub fn build(self) -> Worker {
        Worker {
            id: self.id,
            description: self.description,
            role: self.role,
            capabilities: self.capabilities,
            peers: self.peers,
        }
    }
}

// ============================================================================
// Roster
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RosterError {
    #[error("Worker id cannot be empty")]
    EmptyWorkerId,

    #[error("Roster must declare at least one worker")]
    Empty,

    #[error("Worker '{0}' is declared more than once")]
    DuplicateWorker(WorkerId),

    #[error("Root worker '{0}' is not declared")]
    UnknownRoot(WorkerId),

    #[error("Worker '{worker}' lists unknown peer '{peer}'")]
    UnknownPeer { worker: WorkerId, peer: WorkerId },

    #[error("Worker '{0}' cannot hand off to itself")]
    SelfHandoff(WorkerId),

    #[error("Worker '{worker}' lists peer '{peer}' more than once")]
    DuplicatePeer { worker: WorkerId, peer: WorkerId },

    #[error("Worker '{worker}' references unregistered capability '{capability}'")]
    UnknownCapability {
        worker: WorkerId,
        capability: CapabilityName,
    },
}

/// Validated set of workers with a designated default root.
#[derive(Debug, Clone)]
pub struct Roster {
    root: WorkerId,
    workers: BTreeMap<WorkerId, Worker>,
}

impl Roster {
    pub fn new(root: WorkerId, workers: Vec<Worker>) -> Result<Self, RosterError> {
        if workers.is_empty() {
            return Err(RosterError::Empty);
        }

        let mut by_id = BTreeMap::new();
        for worker in workers {
            let id = worker.id.clone();
            if by_id.insert(id.clone(), worker).is_some() {
                return Err(RosterError::DuplicateWorker(id));
            }
        }

        if !by_id.contains_key(&root) {
            return Err(RosterError::UnknownRoot(root));
        }

        for worker in by_id.values() {
            let mut seen = BTreeSet::new();
            for edge in &worker.peers {
                if edge.target == worker.id {
                    return Err(RosterError::SelfHandoff(worker.id.clone()));
                }
                if !by_id.contains_key(&edge.target) {
                    return Err(RosterError::UnknownPeer {
                        worker: worker.id.clone(),
                        peer: edge.target.clone(),
                    });
                }
                if !seen.insert(&edge.target) {
                    return Err(RosterError::DuplicatePeer {
                        worker: worker.id.clone(),
                        peer: edge.target.clone(),
                    });
                }
            }
        }

        Ok(Self {
            root,
            workers: by_id,
        })
    }

    pub fn root(&self) -> &WorkerId {
        &self.root
    }

    pub fn get(&self, id: &WorkerId) -> Option<&Worker> {
        self.workers.get(id)
    }

    pub fn contains(&self, id: &WorkerId) -> bool {
        self.workers.contains_key(id)
    }

    pub fn workers(&self) -> impl Iterator<Item = &Worker> {
        self.workers.values()
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

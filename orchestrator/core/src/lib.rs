// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Critique Core
//!
//! Multi-worker orchestration engine: workers restricted to capability sets
//! pass control and shared state between one another until one produces a
//! terminal output.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Domain types, the orchestrator state machine and its adapters

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{Orchestrator, OrchestratorSettings};
pub use domain::*;

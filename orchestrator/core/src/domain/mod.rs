// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Orchestration vocabulary: capabilities, shared state, workers, actions
//! and runs.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Types and ports with no I/O of their own

pub mod capability;
pub mod config;
pub mod decision;
pub mod error;
pub mod events;
pub mod llm;
pub mod run;
pub mod state;
pub mod worker;

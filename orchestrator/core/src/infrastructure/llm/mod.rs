// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// LLM Infrastructure - Anti-Corruption Layer Implementations
//
// Provider adapters translate between the domain chat interface and vendor
// APIs; the decision engine turns provider replies into actions.

pub mod decision_engine;
pub mod openai;
pub mod registry;

pub use decision_engine::LlmDecisionEngine;
pub use registry::ProviderRegistry;

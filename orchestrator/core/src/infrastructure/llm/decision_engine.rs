// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// LLM-backed Decision Engine
//
// Renders the decision request into chat messages, asks the provider
// registry for a completion and parses the tagged JSON action out of the
// reply. Any failure along the way is a DecisionError.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::registry::ProviderRegistry;
use crate::domain::decision::{Action, DecisionEngine, DecisionRequest};
use crate::domain::error::DecisionError;
use crate::domain::llm::GenerationOptions;
use crate::infrastructure::prompt_template_engine::DecisionPromptEngine;

pub struct LlmDecisionEngine {
    registry: Arc<ProviderRegistry>,
    prompts: DecisionPromptEngine,
    model_alias: String,
    options: GenerationOptions,
}

impl LlmDecisionEngine {
    pub fn new(registry: Arc<ProviderRegistry>, model_alias: impl Into<String>) -> Self {
        Self {
            registry,
            prompts: DecisionPromptEngine::new(),
            model_alias: model_alias.into(),
            options: GenerationOptions::default(),
        }
    }

    pub fn with_prompts(mut self, prompts: DecisionPromptEngine) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    /// Parse an action from a model reply. Fenced blocks holding a JSON object
    /// are tried first, then every bare JSON object in the text, in order.
    pub fn parse_action(text: &str) -> Result<Action, DecisionError> {
        let mut last_error = None;
        for candidate in fenced_objects(text).into_iter().chain(bare_objects(text)) {
            match serde_json::from_str(candidate) {
                Ok(action) => return Ok(action),
                Err(e) => last_error = Some(format!("{}: {}", e, candidate)),
            }
        }
        Err(DecisionError::MalformedAction(
            last_error.unwrap_or_else(|| format!("no JSON object in reply: {}", text)),
        ))
    }
}

/// Contents of ``` fences that hold a JSON object, language tag stripped.
fn fenced_objects(text: &str) -> Vec<&str> {
    text.split("```")
        .skip(1)
        .step_by(2)
        .filter_map(|block| {
            let body = block.trim();
            let body = if body.starts_with('{') {
                body
            } else {
                body.split_once('\n')?.1.trim()
            };
            body.starts_with('{').then_some(body)
        })
        .collect()
}

/// Every complete JSON object starting at a `{` in the text.
fn bare_objects(text: &str) -> Vec<&str> {
    text.match_indices('{')
        .filter_map(|(start, _)| {
            let rest = &text[start..];
            let mut stream = serde_json::Deserializer::from_str(rest).into_iter::<serde_json::Value>();
            match stream.next() {
                Some(Ok(serde_json::Value::Object(_))) => Some(&rest[..stream.byte_offset()]),
                _ => None,
            }
        })
        .collect()
}

#[async_trait]
impl DecisionEngine for LlmDecisionEngine {
    async fn decide(&self, request: &DecisionRequest<'_>) -> Result<Action, DecisionError> {
        let messages = self
            .prompts
            .render_messages(request)
            .map_err(|e| DecisionError::Backend(format!("{:#}", e)))?;

        let completion = self
            .registry
            .complete(&self.model_alias, &messages, &self.options)
            .await
            .map_err(|e| DecisionError::Backend(e.to_string()))?;

        debug!(
            run_id = %request.run_id,
            worker = %request.worker.id(),
            step = request.step,
            tokens = completion.usage.total(),
            "Decision backend replied"
        );

        Self::parse_action(&completion.text)
    }
}

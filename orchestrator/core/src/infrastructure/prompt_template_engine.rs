// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Prompt Template Engine
//!
//! Renders decision requests into chat prompts using Handlebars.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Turn a [`DecisionRequest`] into system + user messages
//! - **Integration:** `LlmDecisionEngine` → LLM input
//!
//! # Supported Placeholders
//!
//! - `{{worker}}` / `{{role}}` - Active worker identity and role prompt
//! - `{{instruction}}` - The instruction the run was started with
//! - `{{step}}` - Current step number
//! - `{{#each capabilities}}` - `name`, `purity`, `description`, `input_schema`
//! - `{{#each peers}}` - `id`, `description`
//! - `{{state}}` - Shared state snapshot as pretty JSON
//! - `{{#each history}}` - One JSON line per past step

use anyhow::{Context, Result};
use handlebars::Handlebars;
use serde::Serialize;

use crate::domain::capability::Purity;
use crate::domain::decision::DecisionRequest;
use crate::domain::llm::ChatMessage;

// ============================================================================
// Template Context
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct CapabilityView {
    pub name: String,
    pub purity: &'static str,
    pub description: String,
    pub input_schema: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PeerView {
    pub id: String,
    pub description: String,
}

/// Flattened view of a decision request for template rendering
#[derive(Debug, Clone, Serialize)]
pub struct PromptContext {
    pub worker: String,
    pub role: String,
    pub instruction: String,
    pub step: u32,
    pub capabilities: Vec<CapabilityView>,
    pub peers: Vec<PeerView>,
    pub state: String,
    pub history: Vec<String>,
}

impl PromptContext {
    pub fn from_request(request: &DecisionRequest<'_>) -> Result<Self> {
        let capabilities = request
            .capabilities
            .iter()
            .map(|descriptor| -> Result<CapabilityView> {
                Ok(CapabilityView {
                    name: descriptor.name.to_string(),
                    purity: match descriptor.purity {
                        Purity::Read => "read",
                        Purity::Write => "write",
                    },
                    description: descriptor.description.clone(),
                    input_schema: serde_json::to_string(&descriptor.input_schema)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let history = request
            .history
            .iter()
            .map(|event| serde_json::to_string(event).context("Failed to serialize trace event"))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            worker: request.worker.id().to_string(),
            role: request.worker.role().to_string(),
            instruction: request.instruction.to_string(),
            step: request.step,
            capabilities,
            peers: request
                .peers
                .iter()
                .map(|peer| PeerView {
                    id: peer.id.to_string(),
                    description: peer.description.clone(),
                })
                .collect(),
            state: serde_json::to_string_pretty(&request.state)?,
            history,
        })
    }
}

// ============================================================================
// Template Engine
// ============================================================================

pub struct DecisionPromptEngine {
    handlebars: Handlebars<'static>,
    system_template: String,
    user_template: String,
}

impl DecisionPromptEngine {
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();

        handlebars.set_strict_mode(false); // Don't fail on missing variables
        handlebars.register_escape_fn(handlebars::no_escape);

        Self {
            handlebars,
            system_template: Self::default_system_template().to_string(),
            user_template: Self::default_user_template().to_string(),
        }
    }

    /// Replace the built-in templates (validated up front)
    pub fn with_templates(
        mut self,
        system_template: impl Into<String>,
        user_template: impl Into<String>,
    ) -> Result<Self> {
        let system_template = system_template.into();
        let user_template = user_template.into();
        self.validate_template(&system_template)?;
        self.validate_template(&user_template)?;
        self.system_template = system_template;
        self.user_template = user_template;
        Ok(self)
    }

    pub fn render(&self, template: &str, context: &PromptContext) -> Result<String> {
        self.handlebars
            .render_template(template, context)
            .context("Failed to render prompt template")
    }

    /// Render the system and user messages for one decision
    pub fn render_messages(&self, request: &DecisionRequest<'_>) -> Result<Vec<ChatMessage>> {
        let context = PromptContext::from_request(request)?;
        Ok(vec![
            ChatMessage::system(self.render(&self.system_template, &context)?),
            ChatMessage::user(self.render(&self.user_template, &context)?),
        ])
    }

    pub fn validate_template(&self, template: &str) -> Result<()> {
        handlebars::template::Template::compile(template)
            .map(|_| ())
            .context("Invalid Handlebars template syntax")
    }

    pub fn default_system_template() -> &'static str {
        r#"You are {{worker}}, one worker in a team that cooperates on a task.

{{role}}

Each turn you choose exactly one action and answer with a single JSON object in a ```json block:
- {"action": "invoke", "capability": "<name>", "arguments": { ... }} to call one of your capabilities
- {"action": "handoff", "target": "<peer>", "reason": "<why>"} to pass control to a peer
- {"action": "output", "text": "<final answer>"} to finish the task

You may only use the capabilities and peers listed below."#
    }

    pub fn default_user_template() -> &'static str {
        r#"Task: {{instruction}}

Step: {{step}}

Capabilities:
{{#each capabilities}}- {{name}} ({{purity}}): {{description}}
  arguments schema: {{input_schema}}
{{else}}(none)
{{/each}}
Peers:
{{#each peers}}- {{id}}: {{description}}
{{else}}(none)
{{/each}}
Shared state:
{{state}}

History:
{{#each history}}{{this}}
{{else}}(no steps yet)
{{/each}}"#
    }
}

impl Default for DecisionPromptEngine {
    fn default() -> Self {
        Self::new()
    }
}

// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Text-generation port
//!
//! What [`LlmDecisionEngine`] needs from a chat model: send a conversation,
//! get one completion back. Adapters live in `infrastructure::llm`.
//!
//! [`LlmDecisionEngine`]: crate::infrastructure::llm::LlmDecisionEngine

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[async_trait]
pub trait LLMProvider: Send + Sync {
    async fn complete(
        &self,
        conversation: &[ChatMessage],
        options: &GenerationOptions,
    ) -> Result<Completion, LLMError>;

    /// Cheap reachability probe; does not spend tokens.
    async fn health_check(&self) -> Result<(), LLMError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    fn with_role(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(ChatRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(ChatRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(ChatRole::Assistant, content)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub max_tokens: Option<u32>,
    /// 0.0 is deterministic
    pub temperature: Option<f32>,
    #[serde(default)]
    pub stop: Vec<String>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            max_tokens: Some(2048),
            temperature: Some(0.2),
            stop: Vec::new(),
        }
    }
}

impl GenerationOptions {
    /// Per-model settings win over the caller's where both are set.
    pub fn overridden_by(&self, temperature: Option<f32>, max_tokens: Option<u32>) -> Self {
        Self {
            max_tokens: max_tokens.or(self.max_tokens),
            temperature: temperature.or(self.temperature),
            stop: self.stop.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub model: String,
    pub finish_reason: FinishReason,
    pub usage: TokenUsage,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    Other(String),
}

impl FinishReason {
    /// Missing reasons count as a normal stop.
    pub fn parse(reason: Option<&str>) -> Self {
        match reason {
            None | Some("stop") => FinishReason::Stop,
            Some("length") => FinishReason::Length,
            Some("content_filter") => FinishReason::ContentFilter,
            Some(other) => FinishReason::Other(other.to_string()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Rate limited by provider")]
    RateLimited,

    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("Provider error{}: {message}", status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default())]
    Provider { status: Option<u16>, message: String },

    #[error("Conversation is empty")]
    EmptyConversation,
}

impl LLMError {
    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            LLMError::Network(_) | LLMError::RateLimited => true,
            LLMError::Provider { status, .. } => status.map_or(true, |s| s >= 500),
            LLMError::Authentication(_) | LLMError::UnknownModel(_) | LLMError::EmptyConversation => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_settings_override_caller() {
        let merged = GenerationOptions::default().overridden_by(Some(0.7), None);
        assert_eq!(merged.temperature, Some(0.7));
        assert_eq!(merged.max_tokens, Some(2048));
    }

    #[test]
    fn test_retryable_errors() {
        assert!(LLMError::RateLimited.is_retryable());
        assert!(LLMError::Provider { status: Some(503), message: "down".into() }.is_retryable());
        assert!(!LLMError::Provider { status: Some(400), message: "bad".into() }.is_retryable());
        assert!(!LLMError::Authentication("key".into()).is_retryable());
    }

    #[test]
    fn test_finish_reason_parse() {
        assert_eq!(FinishReason::parse(None), FinishReason::Stop);
        assert_eq!(FinishReason::parse(Some("length")), FinishReason::Length);
        assert_eq!(
            FinishReason::parse(Some("tool_calls")),
            FinishReason::Other("tool_calls".to_string())
        );
        assert_eq!(TokenUsage { prompt_tokens: 3, completion_tokens: 4 }.total(), 7);
    }
}

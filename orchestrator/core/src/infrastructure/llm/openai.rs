// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// OpenAI Chat Completions Adapter
//
// Speaks POST {endpoint}/chat/completions. Any server implementing the same
// wire format (vLLM, LM Studio, gateways) works with the "openai-compatible"
// provider type.

use crate::domain::llm::{
    ChatMessage, Completion, FinishReason, GenerationOptions, LLMError, LLMProvider, TokenUsage,
};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

pub struct OpenAIAdapter {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<&'a [String]>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct CompletionReply {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ReplyChoice>,
    #[serde(default)]
    usage: Option<ReplyUsage>,
}

#[derive(Deserialize)]
struct ReplyChoice {
    message: ReplyMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ReplyUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

impl OpenAIAdapter {
    pub fn new(endpoint: String, api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key,
            model,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint.trim_end_matches('/'), path)
    }

    fn status_error(&self, status: StatusCode, body: String) -> LLMError {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LLMError::Authentication(body),
            StatusCode::TOO_MANY_REQUESTS => LLMError::RateLimited,
            StatusCode::NOT_FOUND => LLMError::UnknownModel(self.model.clone()),
            _ => LLMError::Provider {
                status: Some(status.as_u16()),
                message: body,
            },
        }
    }
}

#[async_trait]
impl LLMProvider for OpenAIAdapter {
    async fn complete(
        &self,
        conversation: &[ChatMessage],
        options: &GenerationOptions,
    ) -> Result<Completion, LLMError> {
        if conversation.is_empty() {
            return Err(LLMError::EmptyConversation);
        }

        let request = CompletionRequest {
            model: &self.model,
            messages: conversation
                .iter()
                .map(|message| WireMessage {
                    role: message.role.as_str(),
                    content: &message.content,
                })
                .collect(),
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            stop: (!options.stop.is_empty()).then_some(options.stop.as_slice()),
        };

        let response = self
            .client
            .post(self.url("chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| LLMError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.status_error(status, body));
        }

        let reply: CompletionReply = response.json().await.map_err(|e| LLMError::Provider {
            status: None,
            message: format!("unreadable completion: {}", e),
        })?;

        let Some(choice) = reply.choices.into_iter().next() else {
            return Err(LLMError::Provider {
                status: None,
                message: "completion has no choices".to_string(),
            });
        };

        Ok(Completion {
            text: choice.message.content.unwrap_or_default(),
            model: reply.model.unwrap_or_else(|| self.model.clone()),
            finish_reason: FinishReason::parse(choice.finish_reason.as_deref()),
            usage: reply
                .usage
                .map(|usage| TokenUsage {
                    prompt_tokens: usage.prompt_tokens,
                    completion_tokens: usage.completion_tokens,
                })
                .unwrap_or_default(),
        })
    }

    async fn health_check(&self) -> Result<(), LLMError> {
        let response = self
            .client
            .get(self.url("models"))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| LLMError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(self.status_error(status, String::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn adapter(server: &mockito::Server, key: &str) -> OpenAIAdapter {
        OpenAIAdapter::new(server.url(), key.into(), "gpt-4o-mini".into())
    }

    #[tokio::test]
    async fn test_complete_sends_conversation() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(json!({
                "model": "gpt-4o-mini",
                "messages": [
                    { "role": "system", "content": "be brief" },
                    { "role": "user", "content": "hello" }
                ]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "model": "gpt-4o-mini-2024-07-18",
                    "choices": [{ "message": { "role": "assistant", "content": "hi" }, "finish_reason": "length" }],
                    "usage": { "prompt_tokens": 5, "completion_tokens": 1, "total_tokens": 6 }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let completion = adapter(&server, "sk-test")
            .complete(
                &[ChatMessage::system("be brief"), ChatMessage::user("hello")],
                &GenerationOptions::default(),
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(completion.text, "hi");
        assert_eq!(completion.model, "gpt-4o-mini-2024-07-18");
        assert_eq!(completion.usage.total(), 6);
        assert_eq!(completion.finish_reason, FinishReason::Length);
    }

    #[tokio::test]
    async fn test_status_codes_map_to_errors() {
        let mut server = mockito::Server::new_async().await;
        let _unauthorized = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer bad")
            .with_status(401)
            .with_body("bad key")
            .create_async()
            .await;
        let _rate_limited = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer busy")
            .with_status(429)
            .create_async()
            .await;
        let _failing = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer broken")
            .with_status(502)
            .with_body("upstream")
            .create_async()
            .await;

        let conversation = [ChatMessage::user("hello")];
        let options = GenerationOptions::default();

        let error = adapter(&server, "bad").complete(&conversation, &options).await.unwrap_err();
        assert!(matches!(error, LLMError::Authentication(body) if body == "bad key"));

        let error = adapter(&server, "busy").complete(&conversation, &options).await.unwrap_err();
        assert!(matches!(error, LLMError::RateLimited));

        let error = adapter(&server, "broken").complete(&conversation, &options).await.unwrap_err();
        assert!(matches!(error, LLMError::Provider { status: Some(502), .. }));
        assert!(error.is_retryable());
    }

    #[tokio::test]
    async fn test_empty_conversation_rejected() {
        let adapter = OpenAIAdapter::new("http://127.0.0.1:1".into(), "k".into(), "m".into());
        let result = adapter.complete(&[], &GenerationOptions::default()).await;
        assert!(matches!(result, Err(LLMError::EmptyConversation)));
    }
}

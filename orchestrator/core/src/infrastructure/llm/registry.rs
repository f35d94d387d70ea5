// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// LLM Provider Registry
//
// Maps model aliases to (provider, model settings). Completions are retried
// with exponential backoff while the error is transient; once attempts run
// out, or the error is permanent, the fallback provider gets one try.

use crate::domain::config::{resolve_secret, CritiqueConfigManifest, LLMProviderConfig, ModelConfig};
use crate::domain::llm::{ChatMessage, Completion, GenerationOptions, LLMError, LLMProvider};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::openai::OpenAIAdapter;

struct Route {
    provider: String,
    model: ModelConfig,
}

pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn LLMProvider>>,
    routes: HashMap<String, Route>,
    fallback_provider: Option<String>,
    max_attempts: u32,
    retry_delay: Duration,
}

impl ProviderRegistry {
    /// `max_retries` counts attempts on the primary provider (at least one).
    pub fn new(max_retries: u32, retry_delay_ms: u64) -> Self {
        Self {
            providers: HashMap::new(),
            routes: HashMap::new(),
            fallback_provider: None,
            max_attempts: max_retries.max(1),
            retry_delay: Duration::from_millis(retry_delay_ms),
        }
    }

    /// Providers that fail to build are skipped with a warning.
    pub fn from_config(config: &CritiqueConfigManifest) -> anyhow::Result<Self> {
        let selection = &config.spec.llm_selection;
        let mut registry = Self::new(selection.max_retries, selection.retry_delay_ms);
        registry.fallback_provider = selection.fallback_provider.clone();

        for provider_config in config.spec.llm_providers.iter().filter(|p| p.enabled) {
            match build_provider(provider_config) {
                Ok(provider) => {
                    registry.register(&provider_config.name, provider, provider_config.models.clone())
                }
                Err(e) => warn!(provider = %provider_config.name, error = %e, "Skipping LLM provider"),
            }
        }

        if registry.providers.is_empty() {
            warn!("No LLM provider available; LLM decisions will fail");
        }
        Ok(registry)
    }

    pub fn register(&mut self, name: &str, provider: Arc<dyn LLMProvider>, models: Vec<ModelConfig>) {
        for model in models {
            info!(alias = %model.alias, model = %model.model, provider = name, "Model alias registered");
            self.routes.insert(
                model.alias.clone(),
                Route {
                    provider: name.to_string(),
                    model,
                },
            );
        }
        self.providers.insert(name.to_string(), provider);
    }

    pub fn with_fallback(mut self, provider_name: impl Into<String>) -> Self {
        self.fallback_provider = Some(provider_name.into());
        self
    }

    pub async fn complete(
        &self,
        alias: &str,
        conversation: &[ChatMessage],
        options: &GenerationOptions,
    ) -> Result<Completion, LLMError> {
        let route = self
            .routes
            .get(alias)
            .ok_or_else(|| LLMError::UnknownModel(alias.to_string()))?;
        let provider = self.providers.get(&route.provider).ok_or_else(|| LLMError::Provider {
            status: None,
            message: format!("provider '{}' is not registered", route.provider),
        })?;
        let options = options.overridden_by(route.model.temperature, route.model.max_tokens);

        let mut attempt = 0;
        let error = loop {
            attempt += 1;
            match provider.complete(conversation, &options).await {
                Ok(completion) => {
                    debug!(alias, attempt, tokens = completion.usage.total(), "Completion received");
                    return Ok(completion);
                }
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.retry_delay * 2_u32.saturating_pow(attempt - 1);
                    warn!(alias, attempt, error = %e, delay_ms = delay.as_millis() as u64, "Completion failed, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => break e,
            }
        };

        match self.fallback() {
            Some((name, fallback)) if name != route.provider => {
                warn!(alias, error = %error, fallback = %name, "Primary provider gave up, using fallback");
                fallback.complete(conversation, &options).await
            }
            _ => Err(error),
        }
    }

    fn fallback(&self) -> Option<(&str, &Arc<dyn LLMProvider>)> {
        let name = self.fallback_provider.as_deref()?;
        self.providers.get(name).map(|provider| (name, provider))
    }

    pub async fn health_check_all(&self) -> HashMap<String, Result<(), LLMError>> {
        let mut results = HashMap::new();
        for (name, provider) in &self.providers {
            results.insert(name.clone(), provider.health_check().await);
        }
        results
    }

    pub fn available_aliases(&self) -> Vec<String> {
        let mut aliases: Vec<String> = self.routes.keys().cloned().collect();
        aliases.sort();
        aliases
    }

    pub fn has_alias(&self, alias: &str) -> bool {
        self.routes.contains_key(alias)
    }
}

/// The first configured model is the one the adapter is bound to.
fn build_provider(config: &LLMProviderConfig) -> anyhow::Result<Arc<dyn LLMProvider>> {
    let api_key = resolve_secret(&config.api_key)?;
    let model = config
        .models
        .first()
        .map(|m| m.model.clone())
        .ok_or_else(|| anyhow::anyhow!("provider '{}' has no models", config.name))?;

    match config.provider_type.as_str() {
        "openai" | "openai-compatible" => Ok(Arc::new(OpenAIAdapter::new(config.endpoint.clone(), api_key, model))),
        other => anyhow::bail!("unsupported provider type '{}'", other),
    }
}

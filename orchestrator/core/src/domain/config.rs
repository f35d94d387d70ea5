// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Critique Configuration Types
//
// Kubernetes-style manifest (apiVersion/kind/metadata/spec) covering:
// - Orchestrator limits (step bound, review retry budget)
// - LLM provider configuration and model aliases
// - Provider selection (fallback, retries)
// - Source-control access for the review team

use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const API_VERSION: &str = "critique.dev/v1";
pub const KIND: &str = "CritiqueConfig";

/// Top-level configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CritiqueConfigManifest {
    /// API version (must be "critique.dev/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "CritiqueConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    pub spec: CritiqueConfigSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CritiqueConfigSpec {
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    #[serde(default)]
    pub llm_providers: Vec<LLMProviderConfig>,

    #[serde(default)]
    pub llm_selection: LLMSelection,

    #[serde(default)]
    pub github: GitHubConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Hard bound on decisions per run
    pub max_steps: u32,
    /// Rewrites the reviewer may request after the first draft
    pub review_retry_limit: u32,
    /// Model alias the decision engine completes with
    pub decision_model: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_steps: 40,
            review_retry_limit: 3,
            decision_model: "default".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMProviderConfig {
    pub name: String,

    /// "openai" or "openai-compatible"
    #[serde(rename = "type")]
    pub provider_type: String,

    pub endpoint: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "enabled_by_default")]
    pub enabled: bool,

    pub models: Vec<ModelConfig>,
}

fn enabled_by_default() -> bool {
    true
}

/// An alias the orchestrator refers to, bound to a provider-side model id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub alias: String,
    pub model: String,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LLMSelection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_provider: Option<String>,
    /// Attempts on the primary provider before falling back
    pub max_retries: u32,
    /// Backoff base; doubles after every failed attempt
    pub retry_delay_ms: u64,
}

impl Default for LLMSelection {
    fn default() -> Self {
        Self {
            fallback_provider: None,
            max_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    pub api_base: String,
    /// "owner/name"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            repository: None,
            token: None,
        }
    }
}

impl Default for CritiqueConfigManifest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "critique".to_string(),
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: CritiqueConfigSpec::default(),
        }
    }
}

/// Secrets are either literal or `env:NAME`; an absent secret is empty.
pub fn resolve_secret(value: &Option<String>) -> anyhow::Result<String> {
    let Some(value) = value else {
        return Ok(String::new());
    };
    match value.strip_prefix("env:") {
        Some(name) => std::env::var(name).with_context(|| format!("secret variable {} is not set", name)),
        None => Ok(value.clone()),
    }
}

/// Parsed value of an override variable, if set and well-formed.
fn env_override<T: FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.parse() {
        Ok(value) => {
            tracing::info!(variable = name, value = %raw, "Configuration override from environment");
            Some(value)
        }
        Err(_) => {
            tracing::warn!(variable = name, value = %raw, "Ignoring malformed configuration override");
            None
        }
    }
}

impl CritiqueConfigManifest {
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(yaml).context("invalid configuration manifest")
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read configuration at {}", path.display()))?;
        Self::from_yaml_str(&content).with_context(|| format!("in {}", path.display()))
    }

    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        std::fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }

    /// Search order: `CRITIQUE_CONFIG_PATH`, `./critique-config.yaml`,
    /// `~/.critique/config.yaml`, then the system-wide location.
    pub fn discover_config() -> Option<PathBuf> {
        let mut candidates: Vec<PathBuf> = Vec::new();
        if let Ok(path) = std::env::var("CRITIQUE_CONFIG_PATH") {
            candidates.push(PathBuf::from(path));
        }
        candidates.push(PathBuf::from("critique-config.yaml"));
        if let Some(home) = dirs::home_dir() {
            candidates.push(home.join(".critique").join("config.yaml"));
        }
        #[cfg(unix)]
        candidates.push(PathBuf::from("/etc/critique/config.yaml"));
        #[cfg(windows)]
        candidates.push(PathBuf::from(r"C:\ProgramData\Critique\config.yaml"));

        candidates.into_iter().find(|path| path.is_file())
    }

    /// An explicit path must exist and parse. Without one, the discovered
    /// file is used, or the defaults. Environment overrides apply last.
    pub fn load_or_default(explicit_path: Option<PathBuf>) -> anyhow::Result<Self> {
        let mut config = match explicit_path.or_else(Self::discover_config) {
            Some(path) => {
                tracing::info!(path = %path.display(), "Loading configuration");
                Self::from_yaml_file(&path)?
            }
            None => {
                tracing::warn!("No configuration file found, using defaults");
                Self::default()
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// `CRITIQUE_MAX_STEPS` and `CRITIQUE_GITHUB_REPOSITORY`
    pub fn apply_env_overrides(&mut self) {
        if let Some(max_steps) = env_override::<u32>("CRITIQUE_MAX_STEPS") {
            self.spec.orchestrator.max_steps = max_steps;
        }
        if let Some(repository) = env_override::<String>("CRITIQUE_GITHUB_REPOSITORY") {
            self.spec.github.repository = Some(repository);
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.api_version == API_VERSION,
            "apiVersion must be '{}', got '{}'",
            API_VERSION,
            self.api_version
        );
        ensure!(self.kind == KIND, "kind must be '{}', got '{}'", KIND, self.kind);
        ensure!(!self.metadata.name.is_empty(), "metadata.name is empty");
        ensure!(self.spec.orchestrator.max_steps > 0, "spec.orchestrator.max_steps must be positive");

        for provider in &self.spec.llm_providers {
            ensure!(!provider.name.is_empty(), "an llm provider has no name");
            ensure!(!provider.endpoint.is_empty(), "llm provider '{}' has no endpoint", provider.name);
            ensure!(!provider.models.is_empty(), "llm provider '{}' has no models", provider.name);
            for model in &provider.models {
                ensure!(
                    !model.alias.is_empty() && !model.model.is_empty(),
                    "llm provider '{}' has a model without alias or id",
                    provider.name
                );
            }
        }

        if let Some(fallback) = &self.spec.llm_selection.fallback_provider {
            ensure!(
                self.spec.llm_providers.iter().any(|p| &p.name == fallback),
                "fallback provider '{}' is not among spec.llm_providers",
                fallback
            );
        }

        if let Some(repository) = &self.spec.github.repository {
            let well_formed = matches!(
                repository.split_once('/'),
                Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/')
            );
            ensure!(well_formed, "spec.github.repository must be 'owner/name', got '{}'", repository);
        }

        Ok(())
    }
}

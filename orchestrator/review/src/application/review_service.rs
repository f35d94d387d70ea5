// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Pull Request Review Service
//
// Wires the review team into an orchestrator and runs one review per pull
// request number.

use critique_core::application::{Orchestrator, OrchestratorSettings};
use critique_core::domain::capability::CapabilityError;
use critique_core::domain::config::CritiqueConfigManifest;
use critique_core::domain::decision::DecisionEngine;
use critique_core::domain::run::{RunReport, RunRequest, RunRequestError, RunStatus};
use critique_core::domain::worker::RosterError;
use critique_core::infrastructure::event_bus::EventBus;
use critique_core::infrastructure::llm::{LlmDecisionEngine, ProviderRegistry};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::team::ReviewTeam;
use crate::domain::pull_request::PullRequestSource;
use crate::domain::rubric::ReviewRubric;
use crate::infrastructure::github::GitHubClient;

#[derive(Debug, thiserror::Error)]
pub enum ReviewSetupError {
    #[error("Capability setup failed: {0}")]
    Capability(#[from] CapabilityError),

    #[error("Roster setup failed: {0}")]
    Roster(#[from] RosterError),
}

pub struct PullRequestReviewService {
    orchestrator: Orchestrator,
}

impl PullRequestReviewService {
    pub fn new(
        source: Arc<dyn PullRequestSource>,
        engine: Arc<dyn DecisionEngine>,
        settings: OrchestratorSettings,
        review_retry_limit: u32,
        rubric: ReviewRubric,
    ) -> Result<Self, ReviewSetupError> {
        let registry = ReviewTeam::registry(source, rubric)?;
        let roster = ReviewTeam::roster(review_retry_limit)?;
        let orchestrator = Orchestrator::new(Arc::new(registry), Arc::new(roster), engine, settings)?;
        Ok(Self { orchestrator })
    }

    /// GitHub source plus an LLM decision engine on `spec.orchestrator.decision_model`.
    pub fn from_config(config: &CritiqueConfigManifest) -> anyhow::Result<Self> {
        config.validate()?;

        let source = Arc::new(GitHubClient::from_config(&config.spec.github)?);
        let providers = Arc::new(ProviderRegistry::from_config(config)?);
        let model = &config.spec.orchestrator.decision_model;
        if !providers.has_alias(model) {
            anyhow::bail!("decision model alias '{}' is not served by any provider", model);
        }
        let engine = Arc::new(LlmDecisionEngine::new(providers, model.clone()));

        Ok(Self::new(
            source,
            engine,
            OrchestratorSettings::from(&config.spec.orchestrator),
            config.spec.orchestrator.review_retry_limit,
            ReviewRubric::default(),
        )?)
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.orchestrator = self.orchestrator.with_event_bus(event_bus);
        self
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn instruction(pr_number: u64) -> String {
        format!("Write a review for PR: {}", pr_number)
    }

    pub async fn review(&self, pr_number: u64) -> Result<RunReport, RunRequestError> {
        self.review_with_cancellation(pr_number, CancellationToken::new()).await
    }

    pub async fn review_with_cancellation(
        &self,
        pr_number: u64,
        cancel: CancellationToken,
    ) -> Result<RunReport, RunRequestError> {
        let root = self.orchestrator.roster().root().clone();
        let request = RunRequest::new(root, Self::instruction(pr_number));

        info!(pr_number, "Starting pull request review");
        let report = self.orchestrator.run_with_cancellation(request, cancel).await?;

        match &report.status {
            RunStatus::Terminated { .. } => {
                info!(pr_number, steps = report.steps, "Review finished");
            }
            RunStatus::Failed { failure } => {
                warn!(pr_number, steps = report.steps, error = %failure, "Review failed");
            }
            RunStatus::Cancelled => {
                warn!(pr_number, steps = report.steps, "Review cancelled");
            }
        }

        Ok(report)
    }
}

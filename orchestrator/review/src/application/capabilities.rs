// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Capabilities of the review team.
//!
//! | Name | Purity | Backed by |
//! |------|--------|-----------|
//! | `fetch_changed_files` | read | [`PullRequestSource`] |
//! | `fetch_file_content` | read | [`PullRequestSource`] |
//! | `list_open_requests` | read | [`PullRequestSource`] |
//! | `fetch_request_details` | read | [`PullRequestSource`] |
//! | `publish_review` | write | [`PullRequestSource`] |
//! | `record_context` | write | shared state `gathered_context` |
//! | `save_draft` | write | shared state `draft_artifact` |
//! | `save_final` | write | shared state `final_artifact` |
//! | `check_draft` | read | [`ReviewRubric`] over `draft_artifact` |

use async_trait::async_trait;
use critique_core::domain::capability::{Capability, CapabilityDescriptor, Purity, StateHandle};
use critique_core::domain::error::CollaboratorError;
use critique_core::domain::state::ReservedKey;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::domain::pull_request::PullRequestSource;
use crate::domain::rubric::ReviewRubric;

pub const FETCH_CHANGED_FILES: &str = "fetch_changed_files";
pub const FETCH_FILE_CONTENT: &str = "fetch_file_content";
pub const LIST_OPEN_REQUESTS: &str = "list_open_requests";
pub const FETCH_REQUEST_DETAILS: &str = "fetch_request_details";
pub const PUBLISH_REVIEW: &str = "publish_review";
pub const RECORD_CONTEXT: &str = "record_context";
pub const SAVE_DRAFT: &str = "save_draft";
pub const SAVE_FINAL: &str = "save_final";
pub const CHECK_DRAFT: &str = "check_draft";

fn parse_arguments<T: DeserializeOwned>(arguments: Value) -> Result<T, CollaboratorError> {
    serde_json::from_value(arguments)
        .map_err(|e| CollaboratorError::Rejected(format!("invalid arguments: {}", e)))
}

fn to_output<T: Serialize>(value: &T) -> Result<Value, CollaboratorError> {
    serde_json::to_value(value).map_err(|e| CollaboratorError::InvalidOutput(e.to_string()))
}

// ============================================================================
// Source-control capabilities
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceOperation {
    ChangedFiles,
    FileContent,
    OpenRequests,
    RequestDetails,
    PublishReview,
}

#[derive(Deserialize)]
struct CommitArguments {
    commit_ref: String,
}

#[derive(Deserialize)]
struct PathArguments {
    path: String,
}

#[derive(Deserialize)]
struct NumberArguments {
    number: u64,
}

#[derive(Deserialize)]
struct PublishArguments {
    number: u64,
    #[serde(default)]
    body: Option<String>,
}

/// One operation of a [`PullRequestSource`] exposed as a capability.
pub struct SourceCapability {
    descriptor: CapabilityDescriptor,
    operation: SourceOperation,
    source: Arc<dyn PullRequestSource>,
}

impl SourceCapability {
    pub fn fetch_changed_files(source: Arc<dyn PullRequestSource>) -> Self {
        Self {
            descriptor: CapabilityDescriptor::new(
                FETCH_CHANGED_FILES,
                "List the files changed by a commit, with status, line counts and diff.",
                Purity::Read,
            )
            .with_input_schema(json!({
                "type": "object",
                "properties": { "commit_ref": { "type": "string", "minLength": 1 } },
                "required": ["commit_ref"]
            }))
            .with_output_schema(json!({
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["path", "status", "added_lines", "removed_lines", "total_changes"]
                }
            })),
            operation: SourceOperation::ChangedFiles,
            source,
        }
    }

    pub fn fetch_file_content(source: Arc<dyn PullRequestSource>) -> Self {
        Self {
            descriptor: CapabilityDescriptor::new(
                FETCH_FILE_CONTENT,
                "Read the full text of a repository file by its relative path (e.g. 'CONTRIBUTING.md').",
                Purity::Read,
            )
            .with_input_schema(json!({
                "type": "object",
                "properties": { "path": { "type": "string", "minLength": 1 } },
                "required": ["path"]
            }))
            .with_output_schema(json!({ "type": "string" })),
            operation: SourceOperation::FileContent,
            source,
        }
    }

    pub fn list_open_requests(source: Arc<dyn PullRequestSource>) -> Self {
        Self {
            descriptor: CapabilityDescriptor::new(
                LIST_OPEN_REQUESTS,
                "List the open pull requests with number, title, author and state.",
                Purity::Read,
            )
            .with_output_schema(json!({ "type": "array" })),
            operation: SourceOperation::OpenRequests,
            source,
        }
    }

    pub fn fetch_request_details(source: Arc<dyn PullRequestSource>) -> Self {
        Self {
            descriptor: CapabilityDescriptor::new(
                FETCH_REQUEST_DETAILS,
                "Get author, title, body, state, diff location and every commit SHA of a pull request.",
                Purity::Read,
            )
            .with_input_schema(json!({
                "type": "object",
                "properties": { "number": { "type": "integer", "minimum": 1 } },
                "required": ["number"]
            }))
            .with_output_schema(json!({
                "type": "object",
                "required": ["author", "title", "state", "associated_commit_refs"]
            })),
            operation: SourceOperation::RequestDetails,
            source,
        }
    }

    pub fn publish_review(source: Arc<dyn PullRequestSource>) -> Self {
        Self {
            descriptor: CapabilityDescriptor::new(
                PUBLISH_REVIEW,
                "Post the review as a comment on the pull request. Without a body, the saved final review is posted.",
                Purity::Write,
            )
            .with_input_schema(json!({
                "type": "object",
                "properties": {
                    "number": { "type": "integer", "minimum": 1 },
                    "body": { "type": "string", "minLength": 1 }
                },
                "required": ["number"]
            }))
            .with_output_schema(json!({
                "type": "object",
                "required": ["review_id", "state"]
            })),
            operation: SourceOperation::PublishReview,
            source,
        }
    }
}

#[async_trait]
impl Capability for SourceCapability {
    fn descriptor(&self) -> &CapabilityDescriptor {
        &self.descriptor
    }

    async fn invoke(&self, arguments: Value, state: StateHandle<'_>) -> Result<Value, CollaboratorError> {
        match self.operation {
            SourceOperation::ChangedFiles => {
                let args: CommitArguments = parse_arguments(arguments)?;
                to_output(&self.source.fetch_changed_files(&args.commit_ref).await?)
            }
            SourceOperation::FileContent => {
                let args: PathArguments = parse_arguments(arguments)?;
                to_output(&self.source.fetch_file_content(&args.path).await?)
            }
            SourceOperation::OpenRequests => to_output(&self.source.list_open_requests().await?),
            SourceOperation::RequestDetails => {
                let args: NumberArguments = parse_arguments(arguments)?;
                to_output(&self.source.fetch_request_details(args.number).await?)
            }
            SourceOperation::PublishReview => {
                let args: PublishArguments = parse_arguments(arguments)?;
                let body = match args.body {
                    Some(body) => body,
                    None => state.get_str(ReservedKey::FinalArtifact.as_str()),
                };
                if body.trim().is_empty() {
                    return Err(CollaboratorError::Rejected(
                        "nothing to publish: no body given and final_artifact is empty".to_string(),
                    ));
                }
                to_output(&self.source.publish_review(args.number, &body).await?)
            }
        }
    }
}

// ============================================================================
// Shared-state capabilities
// ============================================================================

/// Writes one string argument into a reserved state key.
pub struct StateWriteCapability {
    descriptor: CapabilityDescriptor,
    key: ReservedKey,
    argument: &'static str,
}

impl StateWriteCapability {
    fn new(name: &str, description: &str, key: ReservedKey, argument: &'static str) -> Self {
        Self {
            descriptor: CapabilityDescriptor::new(name, description, Purity::Write)
                .with_input_schema(json!({
                    "type": "object",
                    "properties": { argument: { "type": "string", "minLength": 1 } },
                    "required": [argument]
                }))
                .with_output_schema(json!({
                    "type": "object",
                    "required": ["saved", "words"]
                })),
            key,
            argument,
        }
    }

    pub fn record_context() -> Self {
        Self::new(
            RECORD_CONTEXT,
            "Record the gathered pull request context so the commentor can draft from it.",
            ReservedKey::GatheredContext,
            "context",
        )
    }

    pub fn save_draft() -> Self {
        Self::new(
            SAVE_DRAFT,
            "Save the drafted review so the reviewer can check it.",
            ReservedKey::DraftArtifact,
            "text",
        )
    }

    pub fn save_final() -> Self {
        Self::new(
            SAVE_FINAL,
            "Save the approved final review before publishing.",
            ReservedKey::FinalArtifact,
            "text",
        )
    }
}

#[async_trait]
impl Capability for StateWriteCapability {
    fn descriptor(&self) -> &CapabilityDescriptor {
        &self.descriptor
    }

    async fn invoke(&self, arguments: Value, mut state: StateHandle<'_>) -> Result<Value, CollaboratorError> {
        let text = arguments
            .get(self.argument)
            .cloned()
            .ok_or_else(|| CollaboratorError::Rejected(format!("missing '{}'", self.argument)))?;
        let words = text.as_str().map(|t| t.split_whitespace().count()).unwrap_or(0);
        state.set(self.key.as_str(), text)?;
        Ok(json!({ "saved": self.key.as_str(), "words": words }))
    }
}

// ============================================================================
// Rubric check
// ============================================================================

pub struct CheckDraftCapability {
    descriptor: CapabilityDescriptor,
    rubric: ReviewRubric,
}

impl CheckDraftCapability {
    pub fn new(rubric: ReviewRubric) -> Self {
        Self {
            descriptor: CapabilityDescriptor::new(
                CHECK_DRAFT,
                "Check the saved draft against the review rubric and list what is missing.",
                Purity::Read,
            )
            .with_output_schema(json!({
                "type": "object",
                "properties": {
                    "passed": { "type": "boolean" },
                    "word_count": { "type": "integer" },
                    "issues": { "type": "array", "items": { "type": "string" } }
                },
                "required": ["passed", "word_count", "issues"]
            })),
            rubric,
        }
    }
}

#[async_trait]
impl Capability for CheckDraftCapability {
    fn descriptor(&self) -> &CapabilityDescriptor {
        &self.descriptor
    }

    async fn invoke(&self, _arguments: Value, state: StateHandle<'_>) -> Result<Value, CollaboratorError> {
        let draft = state.get_str(ReservedKey::DraftArtifact.as_str());
        to_output(&self.rubric.evaluate(&draft))
    }
}

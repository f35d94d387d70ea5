// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Pull requests as seen by the review team.
//!
//! [`PullRequestSource`] is the port every source-control backend implements.
//! The GitHub adapter lives in `infrastructure::github`.

use async_trait::async_trait;
use critique_core::domain::error::CollaboratorError;
use serde::{Deserialize, Serialize};

/// One file touched by a commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangedFile {
    pub path: String,
    /// "added", "modified", "removed", "renamed"...
    pub status: String,
    pub added_lines: u64,
    pub removed_lines: u64,
    pub total_changes: u64,
    /// Unified diff; absent for binary or oversized files
    #[serde(default)]
    pub diff_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequestSummary {
    pub id: u64,
    pub title: String,
    pub author: String,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequestDetails {
    pub author: String,
    pub title: String,
    pub body: String,
    pub state: String,
    pub diff_location: String,
    /// Every commit in the request, oldest first
    pub associated_commit_refs: Vec<String>,
}

/// Confirmation returned by the hosting provider after publishing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewReceipt {
    pub review_id: u64,
    pub state: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Cannot build request URL: {0}")]
    InvalidUrl(String),
}

impl From<SourceError> for CollaboratorError {
    fn from(error: SourceError) -> Self {
        match error {
            SourceError::NotFound(what) => CollaboratorError::NotFound(what),
            SourceError::Network(_) | SourceError::RateLimited => {
                CollaboratorError::Unavailable(error.to_string())
            }
            SourceError::Api { status, .. } if status >= 500 => {
                CollaboratorError::Unavailable(error.to_string())
            }
            SourceError::Authentication(_) | SourceError::Api { .. } | SourceError::InvalidUrl(_) => {
                CollaboratorError::Rejected(error.to_string())
            }
            SourceError::Decode(message) => CollaboratorError::InvalidOutput(message),
        }
    }
}

/// Read and publish access to one repository's pull requests.
#[async_trait]
pub trait PullRequestSource: Send + Sync {
    async fn fetch_changed_files(&self, commit_ref: &str) -> Result<Vec<ChangedFile>, SourceError>;

    /// Fails with [`SourceError::NotFound`] when the path does not exist.
    async fn fetch_file_content(&self, path: &str) -> Result<String, SourceError>;

    async fn list_open_requests(&self) -> Result<Vec<PullRequestSummary>, SourceError>;

    async fn fetch_request_details(&self, number: u64) -> Result<PullRequestDetails, SourceError>;

    async fn publish_review(&self, number: u64, body: &str) -> Result<ReviewReceipt, SourceError>;
}

// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! The three-worker review team.
//!
//! ```text
//! ReviewAndPostingAgent (root) --(bounded)--> CommentorAgent <--> ContextAgent
//!            ^                                     |
//!            +-------------------------------------+
//! ```
//!
//! The root edge to the commentor is bounded: one traversal to request the
//! first draft plus one per rewrite the review retry limit allows.

use critique_core::domain::capability::{CapabilityError, CapabilityRegistry};
use critique_core::domain::worker::{Roster, RosterError, Worker, WorkerId};
use std::sync::Arc;

use super::capabilities::{
    CheckDraftCapability, SourceCapability, StateWriteCapability, CHECK_DRAFT,
    FETCH_CHANGED_FILES, FETCH_FILE_CONTENT, FETCH_REQUEST_DETAILS, LIST_OPEN_REQUESTS,
    PUBLISH_REVIEW, RECORD_CONTEXT, SAVE_DRAFT, SAVE_FINAL,
};
use crate::domain::pull_request::PullRequestSource;
use crate::domain::rubric::ReviewRubric;

pub const REVIEW_AND_POSTING_AGENT: &str = "ReviewAndPostingAgent";
pub const COMMENTOR_AGENT: &str = "CommentorAgent";
pub const CONTEXT_AGENT: &str = "ContextAgent";

const REVIEW_AND_POSTING_ROLE: &str = "You own the review of the pull request named in the instruction. \
Hand off to CommentorAgent to get a draft. When control comes back, run check_draft. \
If it fails, hand off to CommentorAgent again with the issues as the reason. \
If it passes, or no rewrites are left, save the text with save_final, publish it with \
publish_review and finish with the published review as output.";

const COMMENTOR_ROLE: &str = "You write the review draft. If gathered_context is empty, hand off \
to ContextAgent first. Write 200 to 300 words in markdown: what the change does well, whether it \
follows the contribution rules, whether tests and documentation were added or changed, and quote \
the lines you comment on. If the reviewer sent feedback, address it. Save the draft with save_draft, \
then hand off to ReviewAndPostingAgent.";

const CONTEXT_ROLE: &str = "You gather facts about the pull request: its details, the files changed \
by each of its commits and any contribution guide (try CONTRIBUTING.md, then README.md). \
A missing file is not a problem, move on. Summarize what you found with record_context, then hand \
off to CommentorAgent.";

fn id(name: &str) -> Result<WorkerId, RosterError> {
    WorkerId::new(name)
}

/// Factory for the review roster and its capability registry.
pub struct ReviewTeam;

impl ReviewTeam {
    pub fn root() -> Result<WorkerId, RosterError> {
        id(REVIEW_AND_POSTING_AGENT)
    }

    /// `review_retry_limit` bounds how often the root may hand a draft back
    /// to the commentor after the first one.
    pub fn roster(review_retry_limit: u32) -> Result<Roster, RosterError> {
        let draft_requests = review_retry_limit.saturating_add(1);
        let review_and_posting = Worker::builder(id(REVIEW_AND_POSTING_AGENT)?)
            .description("Checks the draft against the rubric, asks for rewrites, publishes the final review.")
            .role(REVIEW_AND_POSTING_ROLE)
            .capability(CHECK_DRAFT)
            .capability(SAVE_FINAL)
            .capability(PUBLISH_REVIEW)
            .bounded_peer(id(COMMENTOR_AGENT)?, draft_requests)
            .build();

        let commentor = Worker::builder(id(COMMENTOR_AGENT)?)
            .description("Writes the review draft from the gathered context.")
            .role(COMMENTOR_ROLE)
            .capability(SAVE_DRAFT)
            .peer(id(CONTEXT_AGENT)?)
            .peer(id(REVIEW_AND_POSTING_AGENT)?)
            .build();

        let context = Worker::builder(id(CONTEXT_AGENT)?)
            .description("Collects pull request details, changed files and contribution rules.")
            .role(CONTEXT_ROLE)
            .capability(FETCH_REQUEST_DETAILS)
            .capability(FETCH_CHANGED_FILES)
            .capability(FETCH_FILE_CONTENT)
            .capability(LIST_OPEN_REQUESTS)
            .capability(RECORD_CONTEXT)
            .peer(id(COMMENTOR_AGENT)?)
            .build();

        Roster::new(
            id(REVIEW_AND_POSTING_AGENT)?,
            vec![review_and_posting, commentor, context],
        )
    }

    pub fn registry(
        source: Arc<dyn PullRequestSource>,
        rubric: ReviewRubric,
    ) -> Result<CapabilityRegistry, CapabilityError> {
        let mut registry = CapabilityRegistry::new();
        registry.register(Arc::new(SourceCapability::fetch_changed_files(source.clone())))?;
        registry.register(Arc::new(SourceCapability::fetch_file_content(source.clone())))?;
        registry.register(Arc::new(SourceCapability::list_open_requests(source.clone())))?;
        registry.register(Arc::new(SourceCapability::fetch_request_details(source.clone())))?;
        registry.register(Arc::new(SourceCapability::publish_review(source)))?;
        registry.register(Arc::new(StateWriteCapability::record_context()))?;
        registry.register(Arc::new(StateWriteCapability::save_draft()))?;
        registry.register(Arc::new(StateWriteCapability::save_final()))?;
        registry.register(Arc::new(CheckDraftCapability::new(rubric)))?;
        Ok(registry)
    }
}

// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod pull_request;
pub mod rubric;

pub use pull_request::{
    ChangedFile, PullRequestDetails, PullRequestSource, PullRequestSummary, ReviewReceipt,
    SourceError,
};
pub use rubric::{ReviewRubric, RubricReport, RubricTopic};

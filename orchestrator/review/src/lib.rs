// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Critique Review
//!
//! The pull-request review team built on `critique-core`: a context worker
//! that gathers repository data, a commentor that drafts the review, and a
//! review-and-posting worker that checks the draft against a rubric and
//! publishes it.
//!
//! # Architecture
//!
//! - **Layer:** Application
//! - **Purpose:** Capabilities, roster and entry point for reviewing one pull request

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{PullRequestReviewService, ReviewTeam};

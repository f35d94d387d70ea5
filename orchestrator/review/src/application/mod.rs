// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod capabilities;
pub mod review_service;
pub mod team;

pub use review_service::{PullRequestReviewService, ReviewSetupError};
pub use team::ReviewTeam;

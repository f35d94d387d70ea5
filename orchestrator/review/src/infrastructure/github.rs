// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// GitHub REST Adapter
//
// Anti-Corruption Layer for the GitHub v3 REST API. Translates commits,
// contents and pull request payloads into the review domain types.

use async_trait::async_trait;
use critique_core::domain::config::{resolve_secret, GitHubConfig};
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, LINK, USER_AGENT};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::domain::pull_request::{
    ChangedFile, PullRequestDetails, PullRequestSource, PullRequestSummary, ReviewReceipt,
    SourceError,
};

const API_VERSION: &str = "2022-11-28";
const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
const RAW_MEDIA_TYPE: &str = "application/vnd.github.raw+json";
const PAGE_SIZE: &str = "100";

pub struct GitHubClient {
    client: reqwest::Client,
    api_base: String,
    repository: String,
    token: String,
}

#[derive(Deserialize)]
struct GitHubUser {
    login: String,
}

#[derive(Deserialize)]
struct GitHubCommit {
    #[serde(default)]
    files: Vec<GitHubFile>,
}

#[derive(Deserialize)]
struct GitHubFile {
    filename: String,
    status: String,
    additions: u64,
    deletions: u64,
    changes: u64,
    #[serde(default)]
    patch: Option<String>,
}

#[derive(Deserialize)]
struct GitHubPull {
    number: u64,
    #[serde(default)]
    title: Option<String>,
    user: GitHubUser,
    state: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    diff_url: Option<String>,
}

#[derive(Deserialize)]
struct GitHubCommitRef {
    sha: String,
}

#[derive(Deserialize)]
struct GitHubReview {
    id: u64,
    state: String,
    #[serde(default)]
    html_url: Option<String>,
}

impl GitHubClient {
    /// `repository` is "owner/name"
    pub fn new(api_base: impl Into<String>, repository: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into(),
            repository: repository.into(),
            token: token.into(),
        }
    }

    pub fn from_config(config: &GitHubConfig) -> anyhow::Result<Self> {
        let repository = config
            .repository
            .clone()
            .ok_or_else(|| anyhow::anyhow!("spec.github.repository is not configured"))?;
        let token = resolve_secret(&config.token)?;
        Ok(Self::new(config.api_base.clone(), repository, token))
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// `{api_base}/repos/{owner}/{name}/{segments..}`, each segment percent-encoded.
    fn url<'s>(&self, segments: impl IntoIterator<Item = &'s str>) -> Result<Url, SourceError> {
        let mut url = Url::parse(&self.api_base).map_err(|e| SourceError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| SourceError::InvalidUrl(format!("{} cannot be a base URL", self.api_base)))?
            .pop_if_empty()
            .push("repos")
            .extend(self.repository.split('/'))
            .extend(segments.into_iter().filter(|segment| !segment.is_empty()));
        Ok(url)
    }

    fn request(&self, method: reqwest::Method, url: Url, accept: &str) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .header(ACCEPT, accept)
            .header(USER_AGENT, "critique")
            .header("X-GitHub-Api-Version", API_VERSION);

        if self.token.is_empty() {
            builder
        } else {
            builder.header(AUTHORIZATION, format!("Bearer {}", self.token))
        }
    }

    async fn send(&self, builder: reqwest::RequestBuilder, what: &str) -> Result<reqwest::Response, SourceError> {
        let response = builder
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        Err(if status == 404 {
            SourceError::NotFound(what.to_string())
        } else if status == 401 {
            SourceError::Authentication(message)
        } else if status == 429 || (status == 403 && message.to_lowercase().contains("rate limit")) {
            SourceError::RateLimited
        } else {
            SourceError::Api {
                status: status.as_u16(),
                message,
            }
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, what: &str) -> Result<T, SourceError> {
        debug!(url = %url, "GitHub GET");
        let response = self
            .send(self.request(reqwest::Method::GET, url, JSON_MEDIA_TYPE), what)
            .await?;
        response
            .json()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))
    }

    /// Collect every page of a list endpoint, following `Link: rel="next"`.
    async fn get_paginated<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, &str)],
        what: &str,
    ) -> Result<Vec<T>, SourceError> {
        debug!(url = %url, "GitHub GET all pages");
        let mut items = Vec::new();
        let mut request = self
            .request(reqwest::Method::GET, url, JSON_MEDIA_TYPE)
            .query(query)
            .query(&[("per_page", PAGE_SIZE)]);

        loop {
            let response = self.send(request, what).await?;
            let next = next_page(response.headers());
            let page: Vec<T> = response
                .json()
                .await
                .map_err(|e| SourceError::Decode(e.to_string()))?;
            items.extend(page);

            let Some(next) = next else {
                return Ok(items);
            };
            let next = Url::parse(&next).map_err(|e| SourceError::InvalidUrl(e.to_string()))?;
            debug!(url = %next, "GitHub GET next page");
            request = self.request(reqwest::Method::GET, next, JSON_MEDIA_TYPE);
        }
    }
}

/// Target of the `rel="next"` entry in a `Link` header.
fn next_page(headers: &HeaderMap) -> Option<String> {
    headers
        .get(LINK)?
        .to_str()
        .ok()?
        .split(',')
        .find_map(|link| {
            let (target, params) = link.split_once(';')?;
            params
                .split(';')
                .any(|param| param.trim() == r#"rel="next""#)
                .then(|| target.trim().trim_start_matches('<').trim_end_matches('>').to_string())
        })
}

#[async_trait]
impl PullRequestSource for GitHubClient {
    async fn fetch_changed_files(&self, commit_ref: &str) -> Result<Vec<ChangedFile>, SourceError> {
        let commit: GitHubCommit = self
            .get_json(self.url(["commits", commit_ref])?, &format!("commit {}", commit_ref))
            .await?;

        Ok(commit
            .files
            .into_iter()
            .map(|file| ChangedFile {
                path: file.filename,
                status: file.status,
                added_lines: file.additions,
                removed_lines: file.deletions,
                total_changes: file.changes,
                diff_text: file.patch,
            })
            .collect())
    }

    async fn fetch_file_content(&self, path: &str) -> Result<String, SourceError> {
        let url = self.url(std::iter::once("contents").chain(path.split('/')))?;
        debug!(url = %url, "GitHub GET raw contents");
        let response = self
            .send(
                self.request(reqwest::Method::GET, url, RAW_MEDIA_TYPE),
                &format!("file {}", path),
            )
            .await?;
        response
            .text()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))
    }

    async fn list_open_requests(&self) -> Result<Vec<PullRequestSummary>, SourceError> {
        let pulls: Vec<GitHubPull> = self
            .get_paginated(self.url(["pulls"])?, &[("state", "open")], "pull requests")
            .await?;

        Ok(pulls
            .into_iter()
            .map(|pull| PullRequestSummary {
                id: pull.number,
                title: pull.title.unwrap_or_default(),
                author: pull.user.login,
                state: pull.state,
            })
            .collect())
    }

    async fn fetch_request_details(&self, number: u64) -> Result<PullRequestDetails, SourceError> {
        let what = format!("pull request #{}", number);
        let number_segment = number.to_string();
        let pull: GitHubPull = self.get_json(self.url(["pulls", number_segment.as_str()])?, &what).await?;
        let commits: Vec<GitHubCommitRef> = self
            .get_paginated(self.url(["pulls", number_segment.as_str(), "commits"])?, &[], &what)
            .await?;

        Ok(PullRequestDetails {
            author: pull.user.login,
            title: pull.title.unwrap_or_default(),
            body: pull.body.unwrap_or_default(),
            state: pull.state,
            diff_location: pull.diff_url.unwrap_or_default(),
            associated_commit_refs: commits.into_iter().map(|commit| commit.sha).collect(),
        })
    }

    async fn publish_review(&self, number: u64, body: &str) -> Result<ReviewReceipt, SourceError> {
        let number_segment = number.to_string();
        let url = self.url(["pulls", number_segment.as_str(), "reviews"])?;
        debug!(url = %url, "GitHub POST review");
        let response = self
            .send(
                self.request(reqwest::Method::POST, url, JSON_MEDIA_TYPE)
                    .json(&serde_json::json!({ "body": body, "event": "COMMENT" })),
                &format!("pull request #{}", number),
            )
            .await?;
        let review: GitHubReview = response
            .json()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))?;

        Ok(ReviewReceipt {
            review_id: review.id,
            state: review.state,
            url: review.html_url,
        })
    }
}

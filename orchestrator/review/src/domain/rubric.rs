// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Review rubric
//!
//! The bar a draft must clear before the review-and-posting worker publishes
//! it: a word range, keywords per topic and at least one quoted line.

use serde::{Deserialize, Serialize};

/// A subject the review must address, recognised by any of its keywords
/// appearing at the start of a word ("test" matches "tests", not "latest").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RubricTopic {
    pub name: String,
    pub keywords: Vec<String>,
}

impl RubricTopic {
    pub fn new(name: &str, keywords: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    fn is_covered_by(&self, lowercase_text: &str) -> bool {
        self.keywords
            .iter()
            .any(|keyword| starts_a_word(lowercase_text, keyword))
    }
}

fn starts_a_word(text: &str, keyword: &str) -> bool {
    text.match_indices(keyword).any(|(at, _)| {
        text[..at]
            .chars()
            .next_back()
            .is_none_or(|before| !before.is_alphanumeric())
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRubric {
    pub min_words: usize,
    pub max_words: usize,
    pub topics: Vec<RubricTopic>,
    /// Require at least one quoted line (markdown `>` quote or inline code)
    pub require_quote: bool,
}

impl Default for ReviewRubric {
    fn default() -> Self {
        Self {
            min_words: 200,
            max_words: 300,
            topics: vec![
                RubricTopic::new("strengths", &["good", "great", "nice", "well done", "strength", "thank"]),
                RubricTopic::new("contribution rules", &["contribution", "contributing", "guideline"]),
                RubricTopic::new("tests", &["test"]),
                RubricTopic::new("documentation", &["document", "docs", "readme", "docstring"]),
            ],
            require_quote: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RubricReport {
    pub passed: bool,
    pub word_count: usize,
    pub issues: Vec<String>,
}

impl ReviewRubric {
    pub fn evaluate(&self, draft: &str) -> RubricReport {
        let mut issues = Vec::new();

        let word_count = draft.split_whitespace().count();
        if word_count == 0 {
            issues.push("draft is empty".to_string());
        } else if word_count < self.min_words {
            issues.push(format!(
                "draft has {} words, at least {} expected",
                word_count, self.min_words
            ));
        } else if word_count > self.max_words {
            issues.push(format!(
                "draft has {} words, at most {} expected",
                word_count, self.max_words
            ));
        }

        let lowercase = draft.to_lowercase();
        for topic in &self.topics {
            if !topic.is_covered_by(&lowercase) {
                issues.push(format!("draft does not address {}", topic.name));
            }
        }

        if self.require_quote && !has_quoted_line(draft) {
            issues.push("draft does not quote any line from the change".to_string());
        }

        RubricReport {
            passed: issues.is_empty(),
            word_count,
            issues,
        }
    }
}

fn has_quoted_line(draft: &str) -> bool {
    draft.lines().any(|line| line.trim_start().starts_with('>')) || draft.matches('`').count() >= 2
}

// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Shared State Store
//!
//! One mutable record per run, visible to every worker through capability
//! invocations. The reserved keys are typed string fields checked on every
//! write; anything else lands in an open map of JSON values. Reads never
//! fail: an unset key yields the empty string so downstream workers tolerate
//! partial context.
//!
//! There is no delete. Keys are replaced or left untouched, last write wins.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Keys every run carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservedKey {
    GatheredContext,
    DraftArtifact,
    FinalArtifact,
}

impl ReservedKey {
    pub const ALL: [ReservedKey; 3] = [
        ReservedKey::GatheredContext,
        ReservedKey::DraftArtifact,
        ReservedKey::FinalArtifact,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ReservedKey::GatheredContext => "gathered_context",
            ReservedKey::DraftArtifact => "draft_artifact",
            ReservedKey::FinalArtifact => "final_artifact",
        }
    }

    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|reserved| reserved.as_str() == key)
    }
}

impl std::fmt::Display for ReservedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StateError {
    #[error("Key '{key}' expects a string value, got {found}")]
    TypeMismatch { key: String, found: &'static str },

    #[error("Key '{0}' cannot be written through a read-only handle")]
    ReadOnly(String),

    #[error("State key cannot be empty")]
    EmptyKey,
}

/// The store itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SharedState {
    #[serde(default)]
    gathered_context: String,

    #[serde(default)]
    draft_artifact: String,

    #[serde(default)]
    final_artifact: String,

    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the initial store from caller-supplied values.
    pub fn seeded<I, K>(seed: I) -> Result<Self, StateError>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let mut state = Self::new();
        for (key, value) in seed {
            state.set(key.as_ref(), value)?;
        }
        Ok(state)
    }

    /// Current value, or `""` when the key was never written.
    pub fn get(&self, key: &str) -> Value {
        match ReservedKey::parse(key) {
            Some(reserved) => Value::String(self.reserved(reserved).to_string()),
            None => self
                .extra
                .get(key)
                .cloned()
                .unwrap_or_else(|| Value::String(String::new())),
        }
    }

    /// Like [`get`](Self::get), rendering non-string values as JSON text.
    pub fn get_str(&self, key: &str) -> String {
        match self.get(key) {
            Value::String(text) => text,
            other => other.to_string(),
        }
    }

    pub fn set(&mut self, key: &str, value: Value) -> Result<(), StateError> {
        if key.is_empty() {
            return Err(StateError::EmptyKey);
        }

        match ReservedKey::parse(key) {
            Some(reserved) => {
                let Value::String(text) = value else {
                    return Err(StateError::TypeMismatch {
                        key: key.to_string(),
                        found: json_type_name(&value),
                    });
                };
                *self.reserved_mut(reserved) = text;
            }
            None => {
                self.extra.insert(key.to_string(), value);
            }
        }
        Ok(())
    }

    pub fn gathered_context(&self) -> &str {
        &self.gathered_context
    }

    pub fn draft_artifact(&self) -> &str {
        &self.draft_artifact
    }

    pub fn final_artifact(&self) -> &str {
        &self.final_artifact
    }

    pub fn set_reserved(&mut self, key: ReservedKey, text: impl Into<String>) {
        *self.reserved_mut(key) = text.into();
    }

    /// The whole store as one JSON object, reserved keys included.
    pub fn snapshot(&self) -> Value {
        let mut map = Map::new();
        for reserved in ReservedKey::ALL {
            map.insert(
                reserved.as_str().to_string(),
                Value::String(self.reserved(reserved).to_string()),
            );
        }
        for (key, value) in &self.extra {
            map.insert(key.clone(), value.clone());
        }
        Value::Object(map)
    }

    fn reserved(&self, key: ReservedKey) -> &str {
        match key {
            ReservedKey::GatheredContext => &self.gathered_context,
            ReservedKey::DraftArtifact => &self.draft_artifact,
            ReservedKey::FinalArtifact => &self.final_artifact,
        }
    }

    fn reserved_mut(&mut self, key: ReservedKey) -> &mut String {
        match key {
            ReservedKey::GatheredContext => &mut self.gathered_context,
            ReservedKey::DraftArtifact => &mut self.draft_artifact,
            ReservedKey::FinalArtifact => &mut self.final_artifact,
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Capability Registry
//!
//! A capability is a named, schema-typed operation a worker may invoke. Each
//! one is either a pure read or a state-mutating write.
//!
//! ## Contract
//!
//! | Operation | Failure |
//! |-----------|---------|
//! | [`CapabilityRegistry::register`] | `DuplicateCapability`, `InvalidSchema` |
//! | [`CapabilityRegistry::resolve`] | `UnknownCapability` |
//! | [`CapabilityRegistry::invoke`] | `UnknownCapability`, `InvalidArgument`, `CapabilityExecution` |
//!
//! Arguments are revalidated against the input schema on every call, because
//! the decision backend that synthesised them is not trusted. Results are
//! checked against the output schema before they reach the run history.
//!
//! Read capabilities receive a [`StateHandle::ReadOnly`]; a write through it
//! fails, so a read can never mutate the Shared State Store.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::domain::error::{CollaboratorError, ErrorKind};
use crate::domain::state::{SharedState, StateError};

/// Unique name of a capability within a registry (e.g. `"fetch_file_content"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilityName(String);

impl CapabilityName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CapabilityName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CapabilityName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Whether invoking a capability is observable outside the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Purity {
    /// Pure lookup; never mutates shared state.
    Read,
    /// Mutates shared state or an external system.
    Write,
}

/// Static description of a capability, shown to the decision backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    pub name: CapabilityName,

    /// Human-readable description used to bias the decision backend
    pub description: String,

    /// JSON Schema the arguments must satisfy
    pub input_schema: Value,

    /// JSON Schema the result must satisfy
    pub output_schema: Value,

    pub purity: Purity,
}

impl CapabilityDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>, purity: Purity) -> Self {
        Self {
            name: CapabilityName::new(name),
            description: description.into(),
            input_schema: serde_json::json!({ "type": "object" }),
            output_schema: serde_json::json!({}),
            purity,
        }
    }

    pub fn with_input_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }

    pub fn with_output_schema(mut self, schema: Value) -> Self {
        self.output_schema = schema;
        self
    }
}

/// Access to the Shared State Store granted for one invocation.
pub enum StateHandle<'a> {
    ReadOnly(&'a SharedState),
    ReadWrite(&'a mut SharedState),
}

impl StateHandle<'_> {
    /// Read a key (never fails; unset keys yield the default)
    pub fn get(&self, key: &str) -> Value {
        match self {
            StateHandle::ReadOnly(state) => state.get(key),
            StateHandle::ReadWrite(state) => state.get(key),
        }
    }

    pub fn get_str(&self, key: &str) -> String {
        match self {
            StateHandle::ReadOnly(state) => state.get_str(key),
            StateHandle::ReadWrite(state) => state.get_str(key),
        }
    }

    /// Replace the value under `key`.
    pub fn set(&mut self, key: &str, value: Value) -> Result<(), StateError> {
        match self {
            StateHandle::ReadOnly(_) => Err(StateError::ReadOnly(key.to_string())),
            StateHandle::ReadWrite(state) => state.set(key, value),
        }
    }
}

/// An operation a worker can invoke through the registry.
///
/// Implementations wrap external collaborators (source-control APIs, the
/// publish call) or write into the Shared State Store. They return
/// `CollaboratorError` for anything that went wrong outside the core; the
/// orchestrator surfaces it in the run history and never retries on its own.
#[async_trait]
pub trait Capability: Send + Sync {
    fn descriptor(&self) -> &CapabilityDescriptor;

    async fn invoke(
        &self,
        arguments: Value,
        state: StateHandle<'_>,
    ) -> Result<Value, CollaboratorError>;
}

/// Errors raised by the registry.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CapabilityError {
    #[error("Capability '{0}' is already registered")]
    DuplicateCapability(CapabilityName),

    #[error("Capability '{0}' is not registered")]
    UnknownCapability(CapabilityName),

    #[error("Capability '{capability}' declares an invalid {which} schema: {reason}")]
    InvalidSchema {
        capability: CapabilityName,
        which: &'static str,
        reason: String,
    },

    #[error("Invalid arguments for '{capability}': {}", .violations.join("; "))]
    InvalidArgument {
        capability: CapabilityName,
        violations: Vec<String>,
    },

    #[error("Capability '{capability}' failed: {source}")]
    CapabilityExecution {
        capability: CapabilityName,
        #[source]
        source: CollaboratorError,
    },
}

impl CapabilityError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CapabilityError::CapabilityExecution { .. } => ErrorKind::Collaborator,
            _ => ErrorKind::Validation,
        }
    }
}

struct RegisteredCapability {
    capability: Arc<dyn Capability>,
    input_validator: jsonschema::Validator,
    output_validator: jsonschema::Validator,
}

/// Name → capability map with schema validators compiled at registration.
#[derive(Default)]
pub struct CapabilityRegistry {
    entries: BTreeMap<CapabilityName, RegisteredCapability>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, capability: Arc<dyn Capability>) -> Result<(), CapabilityError> {
        let descriptor = capability.descriptor();
        let name = descriptor.name.clone();

        if self.entries.contains_key(&name) {
            return Err(CapabilityError::DuplicateCapability(name));
        }

        let input_validator = jsonschema::validator_for(&descriptor.input_schema).map_err(|e| {
            CapabilityError::InvalidSchema {
                capability: name.clone(),
                which: "input",
                reason: e.to_string(),
            }
        })?;
        let output_validator = jsonschema::validator_for(&descriptor.output_schema).map_err(|e| {
            CapabilityError::InvalidSchema {
                capability: name.clone(),
                which: "output",
                reason: e.to_string(),
            }
        })?;

        debug!(capability = %name, purity = ?descriptor.purity, "Registered capability");

        self.entries.insert(
            name,
            RegisteredCapability {
                capability,
                input_validator,
                output_validator,
            },
        );
        Ok(())
    }

    pub fn resolve(&self, name: &CapabilityName) -> Result<&CapabilityDescriptor, CapabilityError> {
        self.entries
            .get(name)
            .map(|entry| entry.capability.descriptor())
            .ok_or_else(|| CapabilityError::UnknownCapability(name.clone()))
    }

    pub fn contains(&self, name: &CapabilityName) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Descriptors for the given names, skipping names that are not registered.
    pub fn descriptors_for<'a, I>(&self, names: I) -> Vec<CapabilityDescriptor>
    where
        I: IntoIterator<Item = &'a CapabilityName>,
    {
        names
            .into_iter()
            .filter_map(|name| self.entries.get(name))
            .map(|entry| entry.capability.descriptor().clone())
            .collect()
    }

    /// Validate `arguments`, run the capability, validate its result.
    pub async fn invoke(
        &self,
        name: &CapabilityName,
        arguments: Value,
        state: &mut SharedState,
    ) -> Result<Value, CapabilityError> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| CapabilityError::UnknownCapability(name.clone()))?;

        let violations = schema_violations(&entry.input_validator, &arguments);
        if !violations.is_empty() {
            return Err(CapabilityError::InvalidArgument {
                capability: name.clone(),
                violations,
            });
        }

        let handle = match entry.capability.descriptor().purity {
            Purity::Read => StateHandle::ReadOnly(state),
            Purity::Write => StateHandle::ReadWrite(state),
        };

        let result = entry
            .capability
            .invoke(arguments, handle)
            .await
            .map_err(|source| CapabilityError::CapabilityExecution {
                capability: name.clone(),
                source,
            })?;

        let violations = schema_violations(&entry.output_validator, &result);
        if !violations.is_empty() {
            return Err(CapabilityError::CapabilityExecution {
                capability: name.clone(),
                source: CollaboratorError::InvalidOutput(violations.join("; ")),
            });
        }

        Ok(result)
    }
}

fn schema_violations(validator: &jsonschema::Validator, instance: &Value) -> Vec<String> {
    validator
        .iter_errors(instance)
        .map(|error| error.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Echo {
        descriptor: CapabilityDescriptor,
        calls: AtomicUsize,
    }

    impl Echo {
        fn new(purity: Purity) -> Self {
            Self {
                descriptor: CapabilityDescriptor::new("echo", "Echo the text back", purity)
                    .with_input_schema(json!({
                        "type": "object",
                        "properties": { "text": { "type": "string" } },
                        "required": ["text"]
                    }))
                    .with_output_schema(json!({ "type": "string" })),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Capability for Echo {
        fn descriptor(&self) -> &CapabilityDescriptor {
            &self.descriptor
        }

        async fn invoke(
            &self,
            arguments: Value,
            mut state: StateHandle<'_>,
        ) -> Result<Value, CollaboratorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            state.set("last_echo", arguments["text"].clone())?;
            Ok(arguments["text"].clone())
        }
    }

    #[test]
    fn test_register_duplicate_fails() {
        let mut registry = CapabilityRegistry::new();
        registry.register(Arc::new(Echo::new(Purity::Write))).unwrap();
        let result = registry.register(Arc::new(Echo::new(Purity::Write)));
        assert!(matches!(result, Err(CapabilityError::DuplicateCapability(_))));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_resolve_unknown_fails() {
        let registry = CapabilityRegistry::new();
        let result = registry.resolve(&CapabilityName::new("missing"));
        assert!(matches!(result, Err(CapabilityError::UnknownCapability(_))));
    }

    #[tokio::test]
    async fn test_invalid_arguments_never_reach_capability() {
        let echo = Arc::new(Echo::new(Purity::Write));
        let mut registry = CapabilityRegistry::new();
        registry.register(echo.clone()).unwrap();
        let mut state = SharedState::new();

        let result = registry
            .invoke(&CapabilityName::new("echo"), json!({ "text": 42 }), &mut state)
            .await;

        assert!(matches!(result, Err(CapabilityError::InvalidArgument { .. })));
        assert_eq!(echo.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_write_capability_mutates_state() {
        let mut registry = CapabilityRegistry::new();
        registry.register(Arc::new(Echo::new(Purity::Write))).unwrap();
        let mut state = SharedState::new();

        let result = registry
            .invoke(&CapabilityName::new("echo"), json!({ "text": "hi" }), &mut state)
            .await
            .unwrap();

        assert_eq!(result, json!("hi"));
        assert_eq!(state.get_str("last_echo"), "hi");
    }

    #[tokio::test]
    async fn test_read_capability_cannot_write() {
        let mut registry = CapabilityRegistry::new();
        registry.register(Arc::new(Echo::new(Purity::Read))).unwrap();
        let mut state = SharedState::new();

        let result = registry
            .invoke(&CapabilityName::new("echo"), json!({ "text": "hi" }), &mut state)
            .await;

        match result {
            Err(error @ CapabilityError::CapabilityExecution { .. }) => {
                assert_eq!(error.kind(), ErrorKind::Collaborator);
            }
            other => panic!("expected execution error, got {:?}", other.map(|_| ())),
        }
        assert_eq!(state.get_str("last_echo"), "");
    }

    #[test]
    fn test_invalid_schema_rejected() {
        struct Broken(CapabilityDescriptor);

        #[async_trait]
        impl Capability for Broken {
            fn descriptor(&self) -> &CapabilityDescriptor {
                &self.0
            }
            async fn invoke(&self, _: Value, _: StateHandle<'_>) -> Result<Value, CollaboratorError> {
                Ok(Value::Null)
            }
        }

        let broken = Broken(
            CapabilityDescriptor::new("broken", "bad schema", Purity::Read)
                .with_input_schema(json!({ "type": "no-such-type" })),
        );
        let mut registry = CapabilityRegistry::new();
        let result = registry.register(Arc::new(broken));
        assert!(matches!(result, Err(CapabilityError::InvalidSchema { which: "input", .. })));
    }
}

// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Logging bootstrap
//
// `RUST_LOG` wins over the level passed in. Installing twice is a no-op so
// embedding applications and test binaries can both call it.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

fn filter(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("invalid log level '{}'", level))
}

/// Compact human-readable lines, no targets or source locations.
pub fn init_logging(level: &str) -> Result<()> {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter(level)?)
        .with_target(false)
        .compact()
        .try_init();
    if installed.is_err() {
        tracing::debug!("Global subscriber already installed, keeping it");
    }
    Ok(())
}

/// One JSON object per line, for log shippers.
pub fn init_json_logging(level: &str) -> Result<()> {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter(level)?)
        .json()
        .with_current_span(false)
        .try_init();
    if installed.is_err() {
        tracing::debug!("Global subscriber already installed, keeping it");
    }
    Ok(())
}

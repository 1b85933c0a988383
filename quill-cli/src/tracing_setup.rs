//! Tracing setup for the quill CLI
//!
//! Usage:
//!   quill --debug ...              # Debug logging
//!   RUST_LOG=quill_db=debug quill  # Fine-grained log control
//!
//! Logs go to stderr so query output on stdout stays machine-readable.

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Tracing configuration options
#[derive(Debug, Clone, Default)]
pub struct TracingConfig {
    /// Enable debug logging (sets the filter to debug unless RUST_LOG is set)
    pub debug: bool,
}

pub fn init_tracing(config: &TracingConfig) -> Result<()> {
    let default_level = if config.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.debug)
        .with_writer(std::io::stderr)
        .compact()
        .try_init()
        .map_err(|err| anyhow!(err))
}

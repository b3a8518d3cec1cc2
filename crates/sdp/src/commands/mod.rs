//! Command implementations for the sdp CLI.
//!
//! Each submodule implements the logic for a command group.

pub mod bulk;
pub mod lookup;

use anyhow::{Context, Result};
use sdp_core::Config;
use std::path::Path;
use tracing::{info, warn};

/// Load and validate configuration, or the built-in default when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(p) => info!("Loading configuration from {}", p.display()),
        None => warn!("No config file given, using built-in default configuration"),
    }

    let config = Config::load_or_default(path).context("Failed to load configuration")?;
    info!(
        base_url = %config.base_url,
        auth = config.auth.label(),
        "Configuration loaded"
    );
    Ok(config)
}

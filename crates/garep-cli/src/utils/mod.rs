//! Shared helpers for command implementations.

pub mod logging;

pub use logging::initialize_logging;

use anyhow::{Context, Result};
use garep_core::Config;
use std::path::{Path, PathBuf};

/// Load configuration from `path` when given, otherwise from the default
/// location, then apply `GAREP_*` environment overrides.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let Some(path) = path else {
        return Ok(Config::load()?);
    };

    let mut config = Config::load_from(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    config.apply_overrides(|key| std::env::var(key).ok());
    Ok(config)
}

/// The configuration file in effect.
pub fn config_path(path: Option<&Path>) -> Result<PathBuf> {
    match path {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(Config::default_path()?),
    }
}

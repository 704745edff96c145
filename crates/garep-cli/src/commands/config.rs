//! `garep config`: show, locate or initialize the configuration file

use anyhow::{Result, bail};
use colored::Colorize;
use garep_core::Config;
use std::path::Path;

use crate::utils::{config_path, load_config};

/// Print the effective configuration, environment overrides included.
pub fn show_config(path: Option<&Path>) -> Result<()> {
    let config = load_config(path)?;
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

/// Print the configuration file path.
pub fn print_config_path(path: Option<&Path>) -> Result<()> {
    println!("{}", config_path(path)?.display());
    Ok(())
}

/// Write a default configuration file unless one exists.
pub fn init_config(path: Option<&Path>, force: bool) -> Result<()> {
    let path = config_path(path)?;
    if path.exists() && !force {
        bail!(
            "{} already exists; pass --force to overwrite",
            path.display()
        );
    }

    Config::default().save_to(&path)?;
    println!("{} Wrote {}", "✓".green(), path.display());
    Ok(())
}

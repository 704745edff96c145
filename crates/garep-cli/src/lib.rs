//! garep CLI - cached Google Analytics Reporting API queries
//!
//! Parses arguments, installs logging and dispatches to the command
//! command implementations.
use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;
mod output;
mod utils;

use crate::utils::initialize_logging;
use cli::{CacheCommands, Cli, Commands, ConfigCommands};

/// Execute the garep CLI with the current process arguments and environment.
///
/// # Errors
///
/// Returns an error if logging cannot be initialized or the command fails.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    initialize_logging(&cli)?;

    execute_command(cli).await
}

async fn execute_command(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Report(args) => {
            let config = utils::load_config(config_path)?;
            commands::report(config, args).await?;
        },
        Commands::Discovery { v3, no_cache } => {
            let config = utils::load_config(config_path)?;
            commands::discovery(&config, v3, no_cache).await?;
        },
        Commands::Config { command } => match command {
            ConfigCommands::Show => commands::show_config(config_path)?,
            ConfigCommands::Path => commands::print_config_path(config_path)?,
            ConfigCommands::Init { force } => commands::init_config(config_path, force)?,
        },
        Commands::Cache { command } => match command {
            CacheCommands::Clear => {
                let config = utils::load_config(config_path)?;
                commands::clear_cache(&config, std::io::stdout())?;
            },
        },
    }

    Ok(())
}

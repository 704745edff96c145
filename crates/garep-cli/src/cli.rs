//! # CLI Structure and Argument Parsing
//!
//! The command-line interface for `garep`, built with `clap` derive macros.
//!
//! ```bash
//! # Sessions by day for January, site view
//! garep report --metric ga:sessions --dimension ga:date --start 2020-01-01 --end 2020-01-31
//!
//! # Same for the app view, as JSON, cached under "sessions"
//! garep report -m ga:sessions -d ga:date --app --cache-prefix sessions --format json
//!
//! # Resolve the batchGet endpoint through the discovery cache
//! garep discovery
//!
//! # Configuration and cache housekeeping
//! garep config init
//! garep cache clear
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use garep_core::SamplingLevel;
use std::path::PathBuf;

use crate::output::OutputFormat;

/// Main CLI structure for the `garep` command
#[derive(Parser, Clone, Debug)]
#[command(name = "garep")]
#[command(version)]
#[command(about = "garep - cached Google Analytics Reporting API queries", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Suppress informational messages (only show errors)
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file to use instead of the default location
    #[arg(long, global = true, value_name = "PATH", env = "GAREP_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available subcommands
#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Fetch every row of a report and print it
    Report(ReportArgs),

    /// Fetch a discovery document and print the resolved endpoint
    Discovery {
        /// Use the Management API v3 document instead of Reporting v4
        #[arg(long)]
        v3: bool,

        /// Bypass the on-disk discovery cache
        #[arg(long)]
        no_cache: bool,
    },

    /// Inspect or write configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Manage cached report results
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
}

/// Arguments for `garep report`
#[derive(Args, Clone, Debug)]
pub struct ReportArgs {
    /// Metric expression, e.g. ga:sessions (repeatable)
    #[arg(short = 'm', long = "metric", value_name = "METRIC", required = true)]
    pub metrics: Vec<String>,

    /// Dimension name, e.g. ga:date (repeatable)
    #[arg(short = 'd', long = "dimension", value_name = "DIMENSION")]
    pub dimensions: Vec<String>,

    /// First day, YYYY-MM-DD (defaults to yesterday)
    #[arg(long, value_name = "DATE")]
    pub start: Option<String>,

    /// Last day, YYYY-MM-DD (defaults to --start)
    #[arg(long, value_name = "DATE", requires = "start")]
    pub end: Option<String>,

    /// Query the mobile app view instead of the site view
    #[arg(long)]
    pub app: bool,

    /// Requested sampling level
    #[arg(long, value_enum)]
    pub sampling_level: Option<SamplingArg>,

    /// Rows per page (sign ignored, capped at 10000)
    #[arg(long, allow_hyphen_values = true)]
    pub page_size: Option<i64>,

    /// Drop rows of reports that are not golden yet
    #[arg(long)]
    pub golden_only: bool,

    /// Ignore the result cached under --cache-prefix (the fresh result is
    /// still written)
    #[arg(long, requires = "cache_prefix")]
    pub no_cache: bool,

    /// Cache the full result under this prefix, keyed per view and query
    #[arg(long, value_name = "PREFIX")]
    pub cache_prefix: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// `garep config` subcommands
#[derive(Subcommand, Clone, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,
    /// Print the configuration file path
    Path,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// `garep cache` subcommands
#[derive(Subcommand, Clone, Debug)]
pub enum CacheCommands {
    /// Remove every cached result file for the configured prefix
    Clear,
}

/// Sampling levels accepted on the command line
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SamplingArg {
    /// Balance speed and accuracy
    Default,
    /// Fast, smaller sample
    Small,
    /// Slow, larger sample
    Large,
}

impl From<SamplingArg> for SamplingLevel {
    fn from(arg: SamplingArg) -> Self {
        match arg {
            SamplingArg::Default => Self::Default,
            SamplingArg::Small => Self::Small,
            SamplingArg::Large => Self::Large,
        }
    }
}

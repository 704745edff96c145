//! garep CLI - cached Google Analytics Reporting API queries
//!
//! This is the main entry point for the garep command-line interface.
//! Command implementations live in the library crate.

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    garep_cli::run().await
}

//! Command implementations for the garep CLI.

mod cache;
mod config;
mod discovery;
mod report;

pub use cache::clear_cache;
pub use config::{init_config, print_config_path, show_config};
pub use discovery::discovery;
pub use report::report;

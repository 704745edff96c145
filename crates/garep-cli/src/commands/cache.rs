//! `garep cache clear`: remove cached report results

use anyhow::Result;
use colored::Colorize;
use garep_core::{Config, ResultCache};
use std::io::Write;

/// Remove every result file owned by the configured file prefix.
///
/// Returns the number of files removed.
pub fn clear_cache<W: Write>(config: &Config, mut writer: W) -> Result<usize> {
    let cache = ResultCache::from_config(&config.cache);
    let removed = cache.clear()?;

    if removed == 0 {
        writeln!(
            writer,
            "{} No cached results in {}",
            "ℹ".blue(),
            cache.directory().display()
        )?;
    } else {
        writeln!(
            writer,
            "{} Removed {removed} cached result file(s) from {}",
            "✓".green(),
            cache.directory().display()
        )?;
    }
    Ok(removed)
}

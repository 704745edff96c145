//! # Output Formatting
//!
//! Reports print either as the human-readable `header: value` dump or as a
//! single JSON document for scripts:
//!
//! ```json
//! {
//!   "dateRange": "2020-01-01 - 2020-01-31",
//!   "columnHeader": {"dimensions": ["ga:date"], "metricHeader": {...}},
//!   "rowCount": 31,
//!   "rows": [{"dimensions": ["20200101"], "metrics": [{"values": ["42"]}]}]
//! }
//! ```

use anyhow::Result;
use garep_core::{BatchGetResponse, render_response};
use serde_json::json;
use std::io::Write;

/// Output format options supported by the CLI
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// Header and value lines (default)
    Text,
    /// Single JSON object
    Json,
}

/// Write every page of a report in `format`.
pub fn write_report<W: Write>(
    mut writer: W,
    format: OutputFormat,
    date_range: &str,
    pages: &[BatchGetResponse],
) -> Result<()> {
    match format {
        OutputFormat::Text => {
            for page in pages {
                write!(writer, "{}", render_response(page))?;
            }
        },
        OutputFormat::Json => {
            let header = pages
                .iter()
                .find_map(|page| page.reports.first())
                .map(|report| report.column_header.clone())
                .unwrap_or_default();
            let rows: Vec<_> = pages
                .iter()
                .filter_map(|page| page.reports.first())
                .flat_map(|report| report.data.rows())
                .collect();

            let document = json!({
                "dateRange": date_range,
                "columnHeader": header,
                "rowCount": rows.len(),
                "rows": rows,
            });
            writeln!(writer, "{}", serde_json::to_string_pretty(&document)?)?;
        },
    }
    Ok(())
}

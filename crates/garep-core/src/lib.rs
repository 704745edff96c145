//! # garep-core
//!
//! Core functionality for garep - a thin, caching client for the Google
//! Analytics Reporting API v4.
//!
//! ## Architecture
//!
//! The crate is organized in three shallow layers:
//!
//! - **Discovery**: discovery documents fetched once and kept in a memory,
//!   temp-file or dated dump-file cache
//! - **Decorators**: exponential-backoff [`retry`], page-token driven
//!   [`paging`] and whole-result disk caching in [`result_cache`]
//! - **Client**: [`AnalyticsClient`] holding view and date-range state and
//!   inspecting every response for sampling and golden flags
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use garep_core::{AnalyticsClient, Config, Result};
//!
//! # async fn run() -> Result<()> {
//! let mut client = AnalyticsClient::new(Config::load()?);
//! client.set_date_range("2020-01-01", "2020-01-31")?;
//!
//! let request = client.report_request(&["ga:sessions"], &["ga:date"]);
//! let rows = client.fetch_all_rows(request).await?;
//! println!("{client}: {} rows", rows.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, Error>`]. Transient failures are
//! classified by [`Error::is_recoverable`]:
//!
//! ```rust
//! use garep_core::Error;
//!
//! let err = Error::Api { status: 503, message: "Backend Error".into() };
//! assert!(err.is_recoverable());
//! ```

/// Service account and static bearer tokens
pub mod auth;
/// Report client and response inspection
pub mod client;
/// Configuration file and environment overrides
pub mod config;
/// Date-indexed deque for daily report data
pub mod date_deque;
/// Discovery documents and their caches
pub mod discovery;
/// Error types and result aliases
pub mod error;
/// HTTP transport for discovery and API calls
pub mod fetcher;
/// Page-token driven report collection
pub mod paging;
/// Whole-result disk cache
pub mod result_cache;
/// Exponential backoff for transient failures
pub mod retry;
/// Request and response bodies
pub mod types;

// Re-export commonly used types
pub use auth::{ServiceAccountTokenSource, StaticTokenSource, TokenSource};
pub use client::{AnalyticsClient, ReportingService, inspect_response, render_response};
pub use config::Config;
pub use date_deque::DateDeque;
pub use discovery::{
    ApiVersion, DiscoveryCache, DiscoveryClient, DiscoveryDocument, DumpFileDiscoveryCache,
    MemoryDiscoveryCache, TempFileDiscoveryCache,
};
pub use error::{Error, Result};
pub use fetcher::Fetcher;
pub use paging::{Collect, PageSize};
pub use result_cache::{CacheDate, ResultCache};
pub use retry::{RetryPolicy, retry};
pub use types::*;

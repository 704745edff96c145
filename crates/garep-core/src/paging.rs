//! Page-token driven collection of paged reports.
//!
//! Only the first report of each response is followed, so the helpers apply
//! to single-report batches. The page token is an explicit argument to the
//! fetch closure: nothing is left behind between calls and every call of
//! [`paginate`] starts from the first page.

use crate::{BatchGetResponse, ReportRow, Result};
use std::future::Future;
use tracing::debug;

/// Page size used when none is configured.
pub const DEFAULT_PAGE_SIZE: u32 = 1000;
/// Largest page the Reporting API serves.
pub const MAX_PAGE_SIZE: u32 = 10_000;

/// Rows per page, always within `1..=10_000`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSize(u32);

impl PageSize {
    /// Takes the absolute value and caps it at [`MAX_PAGE_SIZE`]; zero falls
    /// back to [`DEFAULT_PAGE_SIZE`].
    #[must_use]
    pub fn new(size: i64) -> Self {
        let size = size.unsigned_abs().min(u64::from(MAX_PAGE_SIZE));
        match u32::try_from(size) {
            Ok(0) | Err(_) => Self(DEFAULT_PAGE_SIZE),
            Ok(size) => Self(size),
        }
    }

    /// The clamped value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self(DEFAULT_PAGE_SIZE)
    }
}

/// What to keep from each page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collect {
    /// Only `reports[0].data.rows`, concatenated.
    Rows,
    /// Every response as returned.
    Full,
}

/// Parameters for fetching one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Rows per page.
    pub page_size: PageSize,
    /// `None` for the first page.
    pub page_token: Option<String>,
}

/// Collected pages.
#[derive(Debug, Clone, PartialEq)]
pub enum Paged {
    /// Rows of every page.
    Rows(Vec<ReportRow>),
    /// Every page response.
    Full(Vec<BatchGetResponse>),
}

impl Paged {
    /// Rows, flattening full responses if needed.
    #[must_use]
    pub fn into_rows(self) -> Vec<ReportRow> {
        match self {
            Self::Rows(rows) => rows,
            Self::Full(pages) => pages
                .into_iter()
                .filter_map(|page| page.reports.into_iter().next())
                .flat_map(|report| report.data.rows.unwrap_or_default())
                .collect(),
        }
    }
}

/// Fetch pages until `reports[0].nextPageToken` is absent.
pub async fn paginate<F, Fut>(page_size: PageSize, collect: Collect, mut fetch: F) -> Result<Paged>
where
    F: FnMut(PageRequest) -> Fut,
    Fut: Future<Output = Result<BatchGetResponse>>,
{
    let mut rows = Vec::new();
    let mut pages = Vec::new();
    let mut page_token = None;
    let mut page_number = 0_usize;

    loop {
        let response = fetch(PageRequest {
            page_size,
            page_token: page_token.take(),
        })
        .await?;
        page_number += 1;

        let next = response
            .reports
            .first()
            .and_then(|report| report.next_page_token.clone());

        match collect {
            Collect::Rows => {
                if let Some(report) = response.reports.into_iter().next() {
                    rows.extend(report.data.rows.unwrap_or_default());
                }
            },
            Collect::Full => pages.push(response),
        }

        match next {
            Some(token) if !token.is_empty() => {
                debug!("Page {page_number} done, continuing from token {token}");
                page_token = Some(token);
            },
            _ => break,
        }
    }

    Ok(match collect {
        Collect::Rows => Paged::Rows(rows),
        Collect::Full => Paged::Full(pages),
    })
}

/// [`paginate`] keeping only rows.
pub async fn collect_rows<F, Fut>(page_size: PageSize, fetch: F) -> Result<Vec<ReportRow>>
where
    F: FnMut(PageRequest) -> Fut,
    Fut: Future<Output = Result<BatchGetResponse>>,
{
    paginate(page_size, Collect::Rows, fetch)
        .await
        .map(Paged::into_rows)
}

/// [`paginate`] keeping every response.
pub async fn collect_pages<F, Fut>(page_size: PageSize, fetch: F) -> Result<Vec<BatchGetResponse>>
where
    F: FnMut(PageRequest) -> Fut,
    Fut: Future<Output = Result<BatchGetResponse>>,
{
    match paginate(page_size, Collect::Full, fetch).await? {
        Paged::Full(pages) => Ok(pages),
        Paged::Rows(_) => Ok(Vec::new()),
    }
}

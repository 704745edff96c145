//! Report client for the Analytics Reporting API v4.
//!
//! [`AnalyticsClient`] holds the query state (view, date range, golden-only
//! flag) and wraps `reports:batchGet` in three layers:
//!
//! ```text
//! result cache -> paging -> retry -> batchGet
//! ```
//!
//! Each page is retried on its own, so a transient failure halfway through a
//! large report does not restart it.

use crate::auth::{self, ANALYTICS_READONLY_SCOPE, TokenSource};
use crate::discovery::{ApiVersion, DiscoveryClient, DumpFileDiscoveryCache};
use crate::fetcher::Fetcher;
use crate::paging::{Collect, PageRequest, PageSize, Paged, paginate};
use crate::result_cache::{CacheDate, ResultCache};
use crate::retry::{RetryPolicy, retry};
use crate::{
    BatchGetRequest, BatchGetResponse, Config, DateDeque, DateRange, Error, ReportRequest,
    ReportRow, Result, SamplingLevel,
};
use chrono::{Duration as ChronoDuration, Local, NaiveDate};
use sha2::{Digest, Sha256};
use std::fmt::{self, Write as _};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Discovered `batchGet` endpoint plus the credentials to call it.
pub struct ReportingService {
    fetcher: Fetcher,
    batch_get_url: String,
    tokens: Arc<dyn TokenSource>,
}

impl ReportingService {
    /// Resolve credentials and the `batchGet` URL for `config`.
    pub async fn connect(config: &Config, tokens: Option<Arc<dyn TokenSource>>) -> Result<Self> {
        let tokens = match tokens {
            Some(tokens) => tokens,
            None => auth::from_credentials(&config.credentials).await?,
        };

        let fetcher = Fetcher::with_timeout(Duration::from_secs(config.api.timeout_secs))?;
        let discovery = DiscoveryClient::new(
            fetcher.clone(),
            Box::new(DumpFileDiscoveryCache::new(&config.cache.discovery_dir)),
        );
        let document = discovery
            .document(ApiVersion::V4.discovery_url(&config.api))
            .await?;
        let batch_get_url = document.method_url("reports", "batchGet")?;
        info!("Reporting service ready at {batch_get_url}");

        Ok(Self {
            fetcher,
            batch_get_url,
            tokens,
        })
    }

    /// Endpoint the service posts to.
    pub fn batch_get_url(&self) -> &str {
        &self.batch_get_url
    }

    /// One `batchGet` call, inspected with [`inspect_response`].
    pub async fn batch_get(
        &self,
        request: &BatchGetRequest,
        golden_only: bool,
    ) -> Result<BatchGetResponse> {
        let token = self
            .tokens
            .access_token(&[ANALYTICS_READONLY_SCOPE])
            .await?;
        let response = self
            .fetcher
            .post_json(&self.batch_get_url, &token, request)
            .await?;
        Ok(inspect_response(request, response, golden_only))
    }
}

impl fmt::Debug for ReportingService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportingService")
            .field("batch_get_url", &self.batch_get_url)
            .finish_non_exhaustive()
    }
}

/// Log quota, sampling and freshness information for a response.
///
/// Reports whose data is not golden lose their rows when `golden_only` is set.
pub fn inspect_response(
    request: &BatchGetRequest,
    mut response: BatchGetResponse,
    golden_only: bool,
) -> BatchGetResponse {
    if let Some(quotas) = &response.resource_quotas_remaining {
        info!("Quotas after request {quotas}");
    }

    for report in &mut response.reports {
        let data = &mut report.data;

        if let (Some(read), Some(space)) = (&data.samples_read_counts, &data.sampling_space_sizes) {
            for (read, space) in read.iter().zip(space) {
                #[allow(clippy::cast_precision_loss)]
                let ratio = if *space == 0 {
                    0.0
                } else {
                    *read as f64 / *space as f64
                };
                warn!("SAMPLING: sampled response {read}/{space} = {ratio:.4}");
            }
        }

        if !data.is_golden() {
            warn!("NOT GOLDEN: the same request made later may return different data");
            if golden_only {
                warn!("Dropping rows of this report because golden_only is set");
                data.rows = None;
            }
        }
    }

    let levels: Vec<&str> = request
        .report_requests
        .iter()
        .filter_map(|r| r.sampling_level)
        .map(SamplingLevel::as_str)
        .collect();
    if !levels.is_empty() {
        warn!("samplingLevel set in request: {}", levels.join(", "));
    }

    response
}

/// Human-readable dump of every row in `response`.
///
/// ```text
/// ga:date: 20200101
/// Date range: 0
/// ga:sessions: 42
/// ```
pub fn render_response(response: &BatchGetResponse) -> String {
    let mut out = String::new();

    for report in &response.reports {
        let dimension_headers = &report.column_header.dimensions;
        let metric_headers = &report.column_header.metric_header.metric_header_entries;

        for row in report.data.rows() {
            for (header, value) in dimension_headers.iter().zip(&row.dimensions) {
                let _ = writeln!(out, "{header}: {value}");
            }
            for (i, values) in row.metrics.iter().enumerate() {
                let _ = writeln!(out, "Date range: {i}");
                for (header, value) in metric_headers.iter().zip(&values.values) {
                    let _ = writeln!(out, "{}: {value}", header.name);
                }
            }
        }
    }

    out
}

/// Everything a paged fetch needs, detached from the client so it can move
/// into cache closures.
#[derive(Clone)]
struct Query {
    service: Arc<ReportingService>,
    retry: RetryPolicy,
    page_size: PageSize,
    use_resource_quotas: bool,
    golden_only: bool,
}

impl Query {
    async fn pages(&self, request: ReportRequest, collect: Collect) -> Result<Paged> {
        paginate(self.page_size, collect, |page: PageRequest| {
            let mut request = request.clone();
            request.page_size = Some(page.page_size.get());
            request.page_token = page.page_token;
            let body = BatchGetRequest {
                report_requests: vec![request],
                use_resource_quotas: self.use_resource_quotas,
            };
            async move {
                retry(&self.retry, || self.service.batch_get(&body, self.golden_only)).await
            }
        })
        .await
    }
}

/// Stateful client for one view and date range.
pub struct AnalyticsClient {
    config: Config,
    tokens: Option<Arc<dyn TokenSource>>,
    service: OnceCell<Arc<ReportingService>>,
    view_id: String,
    date_ranges: Vec<DateRange>,
    begin_date: NaiveDate,
    end_date: NaiveDate,
    golden_begin_date: NaiveDate,
    golden_end_date: NaiveDate,
    use_resource_quotas: bool,
    collect_only_golden_data: bool,
    cache: ResultCache,
    retry: RetryPolicy,
    page_size: PageSize,
    data: DateDeque<Vec<ReportRow>>,
}

impl AnalyticsClient {
    /// Client for `config`, querying yesterday on the site view.
    ///
    /// Nothing touches the network until the first report is fetched.
    pub fn new(config: Config) -> Self {
        let yesterday = Local::now().date_naive() - ChronoDuration::days(1);

        Self {
            tokens: None,
            service: OnceCell::new(),
            view_id: config.views.site_view_id.clone(),
            date_ranges: vec![DateRange::new("yesterday", "yesterday")],
            begin_date: yesterday,
            end_date: yesterday,
            golden_begin_date: yesterday,
            golden_end_date: yesterday,
            use_resource_quotas: false,
            collect_only_golden_data: false,
            cache: ResultCache::from_config(&config.cache),
            retry: RetryPolicy::from(config.retry),
            page_size: PageSize::new(config.paging.page_size),
            data: DateDeque::new(),
            config,
        }
    }

    /// Client for the configuration found by [`Config::load`].
    pub fn from_config() -> Result<Self> {
        Ok(Self::new(Config::load()?))
    }

    /// Use `tokens` instead of the configured credentials.
    #[must_use]
    pub fn with_token_source(mut self, tokens: Arc<dyn TokenSource>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Query `begin..=end`, both `YYYY-MM-DD`. An empty `end` means `begin`.
    pub fn set_date_range(&mut self, begin: &str, end: &str) -> Result<()> {
        let end = if end.trim().is_empty() { begin } else { end };
        let begin = parse_date(begin)?;
        let end = parse_date(end)?;
        self.set_dates(begin, end);
        Ok(())
    }

    /// Query `begin..=end`.
    pub fn set_dates(&mut self, begin: NaiveDate, end: NaiveDate) {
        self.begin_date = begin;
        self.end_date = end;
        self.date_ranges = vec![DateRange::new(begin.to_string(), end.to_string())];
    }

    /// Alternative period for golden data checks.
    pub fn set_golden_dates(&mut self, begin: NaiveDate, end: NaiveDate) {
        self.golden_begin_date = begin;
        self.golden_end_date = end;
    }

    /// Query the website view.
    pub fn use_site_view_id(&mut self) -> &mut Self {
        self.view_id.clone_from(&self.config.views.site_view_id);
        self
    }

    /// Query the mobile app view.
    pub fn use_app_view_id(&mut self) -> &mut Self {
        self.view_id.clone_from(&self.config.views.app_view_id);
        self
    }

    /// Drop rows of reports that are not golden yet.
    pub fn set_collect_only_golden_data(&mut self, value: bool) -> &mut Self {
        self.collect_only_golden_data = value;
        self
    }

    /// Read cached results back.
    pub fn cache_enabled(&mut self) -> &mut Self {
        self.cache.set_enabled(true);
        self
    }

    /// Always refetch; results are still written.
    pub fn cache_disabled(&mut self) -> &mut Self {
        self.cache.set_enabled(false);
        self
    }

    /// Bill requests against resource-based quotas.
    pub fn resource_quotas_enable(&mut self) -> &mut Self {
        self.use_resource_quotas = true;
        self
    }

    /// Bill requests against the standard quotas.
    pub fn resource_quotas_disable(&mut self) -> &mut Self {
        self.use_resource_quotas = false;
        self
    }

    /// Rows per page; see [`PageSize::new`].
    pub fn set_page_size(&mut self, size: i64) -> &mut Self {
        self.page_size = PageSize::new(size);
        self
    }

    /// Backoff used for every page.
    pub fn set_retry_policy(&mut self, policy: RetryPolicy) -> &mut Self {
        self.retry = policy;
        self
    }

    /// Replace the in-memory daily data.
    pub fn seed_data(&mut self, data: DateDeque<Vec<ReportRow>>) -> &mut Self {
        self.data = data;
        self
    }

    /// Current view id.
    pub fn view_id(&self) -> &str {
        &self.view_id
    }

    /// Date ranges sent with new requests.
    pub fn date_ranges(&self) -> &[DateRange] {
        &self.date_ranges
    }

    /// First day of the range.
    pub const fn begin_date(&self) -> NaiveDate {
        self.begin_date
    }

    /// Last day of the range.
    pub const fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    /// Golden check period.
    pub const fn golden_dates(&self) -> (NaiveDate, NaiveDate) {
        (self.golden_begin_date, self.golden_end_date)
    }

    /// Whether non-golden rows are dropped.
    pub const fn collects_only_golden_data(&self) -> bool {
        self.collect_only_golden_data
    }

    /// Whether requests use resource-based quotas.
    pub const fn uses_resource_quotas(&self) -> bool {
        self.use_resource_quotas
    }

    /// Result cache in use.
    pub const fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Mutable result cache, e.g. to set a part number.
    pub const fn cache_mut(&mut self) -> &mut ResultCache {
        &mut self.cache
    }

    /// Daily data collected so far.
    pub const fn data(&self) -> &DateDeque<Vec<ReportRow>> {
        &self.data
    }

    /// Request for `metrics` by `dimensions` over the current view and range.
    pub fn report_request(&self, metrics: &[&str], dimensions: &[&str]) -> ReportRequest {
        ReportRequest {
            view_id: self.view_id.clone(),
            date_ranges: self.date_ranges.clone(),
            metrics: metrics.iter().map(|m| (*m).into()).collect(),
            dimensions: dimensions.iter().map(|d| (*d).into()).collect(),
            ..ReportRequest::default()
        }
    }

    /// Connected service, created on first use.
    pub async fn service(&self) -> Result<Arc<ReportingService>> {
        self.service
            .get_or_try_init(|| async {
                ReportingService::connect(&self.config, self.tokens.clone())
                    .await
                    .map(Arc::new)
            })
            .await
            .cloned()
    }

    /// One `batchGet` call without retry or paging.
    pub async fn batch_get(
        &self,
        request: &BatchGetRequest,
        golden_only: bool,
    ) -> Result<BatchGetResponse> {
        self.service().await?.batch_get(request, golden_only).await
    }

    async fn query(&self, golden_only: bool) -> Result<Query> {
        Ok(Query {
            service: self.service().await?,
            retry: self.retry,
            page_size: self.page_size,
            use_resource_quotas: self.use_resource_quotas,
            golden_only,
        })
    }

    /// Every row of a paged report, each page retried.
    pub async fn fetch_all_rows(&self, request: ReportRequest) -> Result<Vec<ReportRow>> {
        let query = self.query(self.collect_only_golden_data).await?;
        query
            .pages(request, Collect::Rows)
            .await
            .map(Paged::into_rows)
    }

    /// Every page response of a paged report, each page retried.
    pub async fn fetch_all_pages(&self, request: ReportRequest) -> Result<Vec<BatchGetResponse>> {
        let query = self.query(self.collect_only_golden_data).await?;
        match query.pages(request, Collect::Full).await? {
            Paged::Full(pages) => Ok(pages),
            Paged::Rows(_) => Ok(Vec::new()),
        }
    }

    /// [`Self::fetch_all_rows`] behind the result cache under `prefix`.
    pub async fn fetch_all_rows_cached(
        &self,
        prefix: &str,
        date: CacheDate,
        request: ReportRequest,
    ) -> Result<Vec<ReportRow>> {
        self.cache
            .cached(prefix, date, || self.fetch_all_rows(request))
            .await
    }

    /// Result cache prefix for `request` under the caller's `prefix`.
    ///
    /// The view and first start date stay readable; a short hash of the
    /// request body and the golden-only flag keeps different queries sharing
    /// a prefix in different files.
    pub fn cache_key(&self, prefix: &str, request: &ReportRequest) -> Result<String> {
        let begin = request
            .date_ranges
            .first()
            .map_or_else(|| self.begin_date.to_string(), |range| range.start_date.clone());

        let mut hasher = Sha256::new();
        hasher.update(serde_json::to_vec(request)?);
        hasher.update([u8::from(self.collect_only_golden_data)]);
        let digest = hex::encode(hasher.finalize());

        Ok(format!("{prefix}_{}_{begin}_{}", request.view_id, &digest[..8]))
    }

    /// [`Self::fetch_all_pages`] behind the result cache, keyed by
    /// [`Self::cache_key`].
    ///
    /// Results without a single row are returned but not stored, so a
    /// golden-only query whose rows were all dropped runs again next time.
    pub async fn fetch_all_pages_cached(
        &self,
        prefix: &str,
        date: CacheDate,
        request: ReportRequest,
    ) -> Result<Vec<BatchGetResponse>> {
        let key = self.cache_key(prefix, &request)?;
        self.cache
            .cached_when(
                &key,
                date,
                || self.fetch_all_pages(request),
                |pages| {
                    pages
                        .iter()
                        .flat_map(|page| &page.reports)
                        .any(|report| !report.data.rows().is_empty())
                },
            )
            .await
    }

    /// Fill the daily data for every day of the range, fetching only the
    /// days that neither the stored file under `prefix` nor memory hold.
    ///
    /// With golden-only collection, days whose data is not golden yet are
    /// skipped so a later run fetches them again.
    pub async fn update_daily_rows(
        &mut self,
        prefix: &str,
        metrics: &[&str],
        dimensions: &[&str],
    ) -> Result<&DateDeque<Vec<ReportRow>>> {
        let query = self.query(false).await?;
        let template = self.report_request(metrics, dimensions);
        let (begin, end) = (self.begin_date, self.end_date);
        let golden_only = self.collect_only_golden_data;
        let memory = self.data.clone();

        let updated = self
            .cache
            .updatable(prefix, |seed| async move {
                let mut data = if seed.is_empty() { memory } else { seed };

                for day in begin.iter_days().take_while(|day| *day <= end) {
                    if data.contains(day) {
                        debug!("Daily data for {day} already present");
                        continue;
                    }

                    let mut request = template.clone();
                    request.date_ranges = vec![DateRange::new(day.to_string(), day.to_string())];
                    let pages = match query.pages(request, Collect::Full).await? {
                        Paged::Full(pages) => pages,
                        Paged::Rows(_) => Vec::new(),
                    };

                    let golden = pages
                        .iter()
                        .flat_map(|page| &page.reports)
                        .all(|report| report.data.is_golden());
                    if golden_only && !golden {
                        info!("Skipping {day}: data is not golden yet");
                        continue;
                    }

                    data.push_back(day, Paged::Full(pages).into_rows());
                }

                data.sort_by_date();
                Ok(data)
            })
            .await?;

        self.data = updated;
        Ok(&self.data)
    }
}

impl fmt::Display for AnalyticsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AnalyticsClient ({} - {})", self.begin_date, self.end_date)
    }
}

impl fmt::Debug for AnalyticsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyticsClient")
            .field("view_id", &self.view_id)
            .field("begin_date", &self.begin_date)
            .field("end_date", &self.end_date)
            .field("cache", &self.cache)
            .field("retry", &self.retry)
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|e| Error::InvalidDate(format!("{value:?}: {e}")))
}

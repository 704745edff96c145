//! `garep report`: fetch every page of a report and print it

use anyhow::Result;
use garep_core::{AnalyticsClient, CacheDate, Config};
use tracing::debug;

use crate::cli::ReportArgs;
use crate::output::write_report;

/// Build a client from `config` and `args`, fetch all pages and print them.
pub async fn report(config: Config, args: ReportArgs) -> Result<()> {
    let mut client = AnalyticsClient::new(config);

    if let Some(start) = &args.start {
        client.set_date_range(start, args.end.as_deref().unwrap_or_default())?;
    }
    if args.app {
        client.use_app_view_id();
    }
    if args.golden_only {
        client.set_collect_only_golden_data(true);
    }
    if args.no_cache {
        client.cache_disabled();
    }
    if let Some(size) = args.page_size {
        client.set_page_size(size);
    }

    let metrics: Vec<&str> = args.metrics.iter().map(String::as_str).collect();
    let dimensions: Vec<&str> = args.dimensions.iter().map(String::as_str).collect();
    let mut request = client.report_request(&metrics, &dimensions);
    request.sampling_level = args.sampling_level.map(Into::into);

    debug!("Running report on view {} for {client}", client.view_id());

    let pages = match &args.cache_prefix {
        Some(prefix) => {
            client
                .fetch_all_pages_cached(prefix, CacheDate::On(client.end_date()), request)
                .await?
        },
        None => client.fetch_all_pages(request).await?,
    };

    let date_range = format!("{} - {}", client.begin_date(), client.end_date());
    write_report(std::io::stdout().lock(), args.format, &date_range, &pages)
}

//! `garep discovery`: fetch a discovery document and show what it resolves to

use anyhow::Result;
use garep_core::{
    ApiVersion, Config, DiscoveryCache, DiscoveryClient, DiscoveryDocument,
    DumpFileDiscoveryCache, Fetcher, MemoryDiscoveryCache,
};
use std::io::Write;
use std::time::Duration;

/// Fetch the v4 (or v3) discovery document and print its endpoint summary.
pub async fn discovery(config: &Config, v3: bool, no_cache: bool) -> Result<()> {
    let version = if v3 { ApiVersion::V3 } else { ApiVersion::V4 };
    let cache: Box<dyn DiscoveryCache> = if no_cache {
        Box::new(MemoryDiscoveryCache)
    } else {
        Box::new(DumpFileDiscoveryCache::new(&config.cache.discovery_dir))
    };

    let fetcher = Fetcher::with_timeout(Duration::from_secs(config.api.timeout_secs))?;
    let client = DiscoveryClient::new(fetcher, cache);
    let document = client.document(version.discovery_url(&config.api)).await?;

    write_summary(std::io::stdout().lock(), version, &document)
}

fn write_summary<W: Write>(
    mut writer: W,
    version: ApiVersion,
    document: &DiscoveryDocument,
) -> Result<()> {
    writeln!(writer, "{} {}", document.name, document.version)?;

    match version {
        ApiVersion::V4 => {
            writeln!(
                writer,
                "batchGet: {}",
                document.method_url("reports", "batchGet")?
            )?;
        },
        ApiVersion::V3 => {
            let mut resources: Vec<_> = document.resources.keys().map(String::as_str).collect();
            resources.sort_unstable();
            writeln!(writer, "base: {}{}", document.root_url, document.service_path)?;
            writeln!(writer, "resources: {}", resources.join(", "))?;
        },
    }
    Ok(())
}

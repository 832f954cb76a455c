//! The `collect` run: feed -> corpus -> four corpus files.

use crate::config::CollectorConfig;
use crate::feed_client::{load_feed_file, FeedClient};
use anyhow::{Context, Result};
use rum_resolver::feed::RumFeed;
use rum_resolver::{
    BuildReport, CorpusBuilder, CorpusFiles, CorpusStats, HttpFetcher, PartitionedCorpus,
    PersistError, ResolverConfig, SourceFetcher,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Where the sessions come from.
#[derive(Debug, Clone)]
pub enum FeedSource {
    /// Query the bundle service using the configured request.
    Remote,
    /// A saved feed dump.
    File(PathBuf),
}

/// Result of a successful run.
#[derive(Debug)]
pub struct CollectOutcome {
    pub files: CorpusFiles,
    pub stats: CorpusStats,
    pub report: BuildReport,
}

/// Obtain the feed. Any failure here aborts the run before files are written.
pub async fn obtain_feed(config: &CollectorConfig, source: &FeedSource) -> Result<RumFeed> {
    match source {
        FeedSource::File(path) => Ok(load_feed_file(path)?),
        FeedSource::Remote => {
            let request = config.feed_request()?;
            let client = FeedClient::new(config.resolver.fetch_timeout(), &config.resolver.user_agent)?;
            Ok(client.fetch(&request).await?)
        }
    }
}

/// Build, partition and persist the corpus for `feed`.
pub async fn resolve_and_write(
    fetcher: Arc<dyn SourceFetcher>,
    feed: &RumFeed,
    resolver: &ResolverConfig,
    output_dir: &Path,
) -> Result<CollectOutcome, PersistError> {
    let mut builder = CorpusBuilder::from_config(fetcher, resolver);
    let corpus = builder.build(&feed.sessions).await;
    let report = builder.report().clone();

    let stats = CorpusStats::of(&corpus);
    let partitioned = PartitionedCorpus::from_corpus(corpus);
    let files = CorpusFiles::write_all(output_dir, &partitioned)?;

    info!(
        urls = stats.total_urls,
        records = stats.total_records,
        with_location = partitioned.with_location.record_count(),
        without_location = partitioned.without_location.record_count(),
        unique_description = partitioned.unique_description.record_count(),
        "collect finished"
    );
    Ok(CollectOutcome {
        files,
        stats,
        report,
    })
}

/// Full `collect` run with the HTTP source fetcher.
pub async fn collect(config: &CollectorConfig, source: &FeedSource) -> Result<CollectOutcome> {
    let feed = obtain_feed(config, source).await?;
    let fetcher = HttpFetcher::new(config.resolver.fetch_timeout(), &config.resolver.user_agent)
        .context("failed to build source fetcher")?;

    let outcome = resolve_and_write(Arc::new(fetcher), &feed, &config.resolver, &config.output_dir)
        .await
        .with_context(|| format!("failed to write corpus to {}", config.output_dir.display()))?;
    Ok(outcome)
}

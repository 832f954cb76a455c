//! Corpus (page URL to ordered error records) and its builder.
//!
//! URL keys keep first-insertion order and records keep event arrival order,
//! both in memory and in the serialized JSON object.

use crate::cache::{SharedSource, SourceCache};
use crate::config::ResolverConfig;
use crate::feed::Session;
use crate::fetch::SourceFetcher;
use crate::normalize::{as_text, Normalizer, PreparedEvent};
use crate::record::{NormalizedErrorRecord, ResolveError};
use crate::url_safety::check_url;
use futures::stream::{self, StreamExt};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{HashMap, HashSet};
use std::iter::Peekable;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Page URL → error records, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Corpus {
    entries: Vec<(String, Vec<NormalizedErrorRecord>)>,
    index: HashMap<String, usize>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record under `url`, creating the key on first use.
    pub fn push(&mut self, url: &str, record: NormalizedErrorRecord) {
        match self.index.get(url) {
            Some(&i) => self.entries[i].1.push(record),
            None => {
                self.index.insert(url.to_string(), self.entries.len());
                self.entries.push((url.to_string(), vec![record]));
            }
        }
    }

    /// Append a whole list under `url`. Empty lists create no key.
    pub fn extend_url(&mut self, url: &str, records: Vec<NormalizedErrorRecord>) {
        for record in records {
            self.push(url, record);
        }
    }

    pub fn get(&self, url: &str) -> Option<&[NormalizedErrorRecord]> {
        self.index.get(url).map(|&i| self.entries[i].1.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[NormalizedErrorRecord])> {
        self.entries.iter().map(|(u, r)| (u.as_str(), r.as_slice()))
    }

    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(u, _)| u.as_str())
    }

    pub fn url_count(&self) -> usize {
        self.entries.len()
    }

    pub fn record_count(&self) -> usize {
        self.entries.iter().map(|(_, r)| r.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Vec<NormalizedErrorRecord>)> for Corpus {
    fn from_iter<I: IntoIterator<Item = (String, Vec<NormalizedErrorRecord>)>>(iter: I) -> Self {
        let mut corpus = Corpus::new();
        for (url, records) in iter {
            corpus.extend_url(&url, records);
        }
        corpus
    }
}

impl Serialize for Corpus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (url, records) in &self.entries {
            map.serialize_entry(url, records)?;
        }
        map.end()
    }
}

struct CorpusVisitor;

impl<'de> Visitor<'de> for CorpusVisitor {
    type Value = Corpus;

    fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str("a map of page URL to error records")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Corpus, A::Error> {
        let mut corpus = Corpus::new();
        while let Some((url, records)) =
            access.next_entry::<String, Vec<NormalizedErrorRecord>>()?
        {
            corpus.extend_url(&url, records);
        }
        Ok(corpus)
    }
}

impl<'de> Deserialize<'de> for Corpus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(CorpusVisitor)
    }
}

/// Counters from the most recent [`CorpusBuilder::build`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReport {
    pub sessions: usize,
    pub sessions_without_url: usize,
    pub unsafe_sessions: usize,
    pub error_events: usize,
    pub minified_discarded: usize,
    pub records: usize,
    /// Distinct code links that were prefetched.
    pub prefetched_links: usize,
}

/// Builds a [`Corpus`] from feed sessions.
pub struct CorpusBuilder {
    normalizer: Normalizer,
    cache: Option<SourceCache>,
    concurrency: usize,
    report: BuildReport,
}

impl CorpusBuilder {
    pub fn new(normalizer: Normalizer, config: &ResolverConfig) -> Self {
        let cache = config
            .cache
            .enabled
            .then(|| SourceCache::from_config(&config.cache));
        Self {
            normalizer,
            cache,
            concurrency: config.fetch_concurrency.max(1),
            report: BuildReport::default(),
        }
    }

    pub fn from_config(fetcher: Arc<dyn SourceFetcher>, config: &ResolverConfig) -> Self {
        Self::new(Normalizer::new(fetcher, config), config)
    }

    pub fn report(&self) -> &BuildReport {
        &self.report
    }

    pub fn cache(&self) -> Option<&SourceCache> {
        self.cache.as_ref()
    }

    /// Collect safe sessions' error events that survive the minified filter.
    fn collect_events(&mut self, sessions: &[Session]) -> Vec<(String, PreparedEvent)> {
        let mut pending = Vec::new();

        for session in sessions {
            self.report.sessions += 1;
            let Some(url) = session.url.as_deref() else {
                self.report.sessions_without_url += 1;
                debug!("skipping session without page url");
                continue;
            };
            if let Err(rejected) = check_url(url) {
                self.report.unsafe_sessions += 1;
                warn!(
                    url = %rejected.input_preview,
                    reason = %rejected.reason,
                    "skipping session with unsafe page url"
                );
                continue;
            }

            for event in session.error_events() {
                self.report.error_events += 1;
                match self.normalizer.prepare(event, session) {
                    Some(prepared) => pending.push((url.to_string(), prepared)),
                    None => self.report.minified_discarded += 1,
                }
            }
        }

        pending
    }

    /// Build the corpus. Per-record failures never abort the build.
    pub async fn build(&mut self, sessions: &[Session]) -> Corpus {
        self.report = BuildReport::default();
        let pending = self.collect_events(sessions);
        let mut corpus = Corpus::new();

        let normalizer = &self.normalizer;
        match self.cache.as_mut() {
            Some(cache) => {
                let mut events = pending.into_iter().peekable();
                while events.peek().is_some() {
                    let chunk = next_chunk(&mut events, cache);
                    let links = distinct_links(&chunk, cache);
                    self.report.prefetched_links += links.len();
                    let fetched = prefetch(normalizer.fetcher().clone(), links, self.concurrency).await;
                    for (link, result) in &fetched {
                        cache.insert(link, result.clone());
                    }

                    for (url, prepared) in chunk {
                        let resolved = match prepared.fetch_link() {
                            Some(link) => Some(match fetched.get(link) {
                                Some(result) => result.clone().map_err(ResolveError::from),
                                None => normalizer.fetch_via_cache(link, cache).await,
                            }),
                            None => None,
                        };
                        let record = normalizer.assemble(prepared, resolved.as_ref().map(as_text));
                        corpus.push(&url, record);
                    }
                }
            }
            None => {
                for (url, prepared) in pending {
                    let fetched = match prepared.fetch_link() {
                        Some(link) => Some(normalizer.fetch_checked(link).await),
                        None => None,
                    };
                    let record = normalizer.assemble(prepared, fetched.as_ref().map(as_text));
                    corpus.push(&url, record);
                }
            }
        }

        self.report.records = corpus.record_count();
        info!(
            urls = corpus.url_count(),
            records = self.report.records,
            unsafe_sessions = self.report.unsafe_sessions,
            minified = self.report.minified_discarded,
            "corpus built"
        );
        corpus
    }
}

/// The link is safe to fetch and has no fresh cache entry.
fn needs_fetch(link: &str, cache: &SourceCache) -> bool {
    !cache.contains(link) && check_url(link).is_ok()
}

/// Take events up to the point where one more link to fetch would exceed
/// the cache capacity. Never returns an empty chunk for a non-empty input.
fn next_chunk<I>(events: &mut Peekable<I>, cache: &SourceCache) -> Vec<(String, PreparedEvent)>
where
    I: Iterator<Item = (String, PreparedEvent)>,
{
    let limit = cache.capacity();
    let mut links: HashSet<String> = HashSet::new();
    let mut chunk = Vec::new();

    while let Some((_, prepared)) = events.peek() {
        if let Some(link) = prepared.fetch_link() {
            if needs_fetch(link, cache) && !links.contains(link) {
                if links.len() == limit {
                    break;
                }
                links.insert(link.to_string());
            }
        }
        if let Some(event) = events.next() {
            chunk.push(event);
        }
    }

    chunk
}

/// Links of `chunk` that need fetching, in first-seen order.
fn distinct_links(chunk: &[(String, PreparedEvent)], cache: &SourceCache) -> Vec<String> {
    let mut seen = HashSet::new();
    chunk
        .iter()
        .filter_map(|(_, p)| p.fetch_link())
        .filter(|link| seen.insert(*link))
        .filter(|link| needs_fetch(link, cache))
        .map(str::to_string)
        .collect()
}

/// Fetch `links` with at most `concurrency` requests in flight.
async fn prefetch(
    fetcher: Arc<dyn SourceFetcher>,
    links: Vec<String>,
    concurrency: usize,
) -> HashMap<String, SharedSource> {
    if links.is_empty() {
        return HashMap::new();
    }
    debug!(links = links.len(), concurrency, "prefetching code links");

    let results: HashMap<String, SharedSource> = stream::iter(links)
        .map(|link| {
            let fetcher = fetcher.clone();
            async move {
                let result: SharedSource = fetcher.fetch(&link).await.map(Arc::from);
                (link, result)
            }
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    for result in results.values() {
        if let Err(e) = result {
            warn!(error = %e, "source fetch failed");
        }
    }
    results
}

//! Error event normalization.
//!
//! Per error event:
//! 1. Discard it when the minified predicate matches the raw source.
//! 2. Parse the source into `code_link` / `line` / `column`.
//! 3. With all three present, fetch the script and extract snippet and
//!    context window. Every failure is recorded in-band on the record.
//! 4. Otherwise leave the code fields absent and fetch nothing.
//!
//! The pure half ([`Normalizer::prepare`], [`resolve_code`]) is separated from
//! fetching so the same inputs always produce the same record.

use crate::cache::{SharedSource, SourceCache};
use crate::config::ResolverConfig;
use crate::extract::{extract_context, extract_snippet};
use crate::feed::{RawErrorEvent, Session};
use crate::fetch::SourceFetcher;
use crate::record::{NormalizedErrorRecord, ResolveError, Resolution};
use crate::source::ErrorSource;
use crate::url_safety::check_url;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Decides whether an error source points at a minified bundle.
pub trait MinifiedPredicate: Send + Sync {
    fn is_minified(&self, source: &str) -> bool;
}

impl<F> MinifiedPredicate for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_minified(&self, source: &str) -> bool {
        self(source)
    }
}

/// Built-in minified heuristics.
///
/// `Substring` (the default) matches `min` anywhere, case-insensitively. It
/// also discards files such as `admin.js`; `Suffix` only matches `.min.js`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MinifiedRule {
    #[default]
    Substring,
    Suffix,
    Off,
}

impl MinifiedPredicate for MinifiedRule {
    fn is_minified(&self, source: &str) -> bool {
        match self {
            Self::Substring => source.to_lowercase().contains("min"),
            Self::Suffix => ErrorSource::parse(source)
                .code_link
                .map(|link| {
                    let path = link.split('?').next().unwrap_or_default();
                    path.to_lowercase().ends_with(".min.js")
                })
                .unwrap_or(false),
            Self::Off => false,
        }
    }
}

impl std::str::FromStr for MinifiedRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "substring" => Ok(Self::Substring),
            "suffix" => Ok(Self::Suffix),
            "off" | "none" => Ok(Self::Off),
            other => Err(format!("unknown minified rule '{}'", other)),
        }
    }
}

/// An event that survived the minified filter, parsed but not yet resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedEvent {
    pub source: ErrorSource,
    pub user_agent: String,
    pub description: Option<String>,
}

impl PreparedEvent {
    /// The link to fetch, when the event carries a full location.
    pub fn fetch_link(&self) -> Option<&str> {
        self.source.location().map(|(link, _, _)| link)
    }
}

/// Snippet, context window and token signal derived from one fetch outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeFields {
    pub snippet: Resolution<String>,
    pub context: Resolution<String>,
    pub max_tokens: Option<usize>,
}

/// Derive the code fields for a located event from its fetch outcome.
pub fn resolve_code(
    source: Result<&str, ResolveError>,
    line: usize,
    column: usize,
    snippet_radius: usize,
    context_radius: usize,
) -> CodeFields {
    let text = match source {
        Ok(text) => text,
        Err(err) => {
            return CodeFields {
                snippet: Err(err.clone()),
                context: Err(err),
                max_tokens: None,
            }
        }
    };

    let snippet = extract_snippet(text, line, column, snippet_radius).map_err(|e| {
        debug!(line, column, error = %e, "snippet coordinates do not fit source");
        ResolveError::from(e)
    });

    match extract_context(text, Some(line), context_radius) {
        Ok(window) => CodeFields {
            snippet,
            context: Ok(window.code),
            max_tokens: Some(window.max_tokens),
        },
        Err(e) => CodeFields {
            snippet,
            context: Err(e.into()),
            max_tokens: None,
        },
    }
}

/// Turns raw error events into [`NormalizedErrorRecord`]s.
#[derive(Clone)]
pub struct Normalizer {
    fetcher: Arc<dyn SourceFetcher>,
    minified: Arc<dyn MinifiedPredicate>,
    snippet_radius: usize,
    context_radius: usize,
}

impl Normalizer {
    pub fn new(fetcher: Arc<dyn SourceFetcher>, config: &ResolverConfig) -> Self {
        Self {
            fetcher,
            minified: Arc::new(config.minified_rule),
            snippet_radius: config.snippet_radius,
            context_radius: config.context_radius,
        }
    }

    /// Swap in a custom minified heuristic.
    pub fn with_minified_predicate(mut self, predicate: Arc<dyn MinifiedPredicate>) -> Self {
        self.minified = predicate;
        self
    }

    pub fn fetcher(&self) -> &Arc<dyn SourceFetcher> {
        &self.fetcher
    }

    /// Steps 1 and 2: minified filter and source parsing. `None` = discarded.
    pub fn prepare(&self, event: &RawErrorEvent, session: &Session) -> Option<PreparedEvent> {
        let raw = event.source.as_deref().unwrap_or_default();
        if self.minified.is_minified(raw) {
            debug!(source = %raw, "discarding error from minified source");
            return None;
        }

        Some(PreparedEvent {
            source: ErrorSource::parse(raw),
            user_agent: session.user_agent.clone().unwrap_or_default(),
            description: event.target.clone(),
        })
    }

    /// Steps 3 to 5 given the fetch outcome for the event's link.
    ///
    /// `fetched` is ignored for events without a full location.
    pub fn assemble(
        &self,
        prepared: PreparedEvent,
        fetched: Option<Result<&str, ResolveError>>,
    ) -> NormalizedErrorRecord {
        let mut record = NormalizedErrorRecord {
            error_source: prepared.source.raw.clone(),
            user_agent: prepared.user_agent,
            code_link: prepared.source.code_link.clone(),
            line: prepared.source.line,
            column: prepared.source.column,
            error_description: prepared.description,
            error_part_in_code: None,
            context_code: None,
            max_tokens_length_in_code_context: None,
        };

        if let (Some((_, line, column)), Some(fetched)) = (prepared.source.location(), fetched) {
            let fields = resolve_code(
                fetched,
                line,
                column,
                self.snippet_radius,
                self.context_radius,
            );
            record.error_part_in_code = Some(fields.snippet);
            record.context_code = Some(fields.context);
            record.max_tokens_length_in_code_context = fields.max_tokens;
        }

        record
    }

    /// Normalize one event with an uncached fetch.
    pub async fn normalize(
        &self,
        event: &RawErrorEvent,
        session: &Session,
    ) -> Option<NormalizedErrorRecord> {
        let prepared = self.prepare(event, session)?;
        let fetched = match prepared.fetch_link() {
            Some(link) => Some(self.fetch_checked(link).await),
            None => None,
        };
        let fetched = fetched.as_ref().map(as_text);
        Some(self.assemble(prepared, fetched))
    }

    /// Normalize one event, reusing `cache` for the fetch.
    pub async fn normalize_cached(
        &self,
        event: &RawErrorEvent,
        session: &Session,
        cache: &mut SourceCache,
    ) -> Option<NormalizedErrorRecord> {
        let prepared = self.prepare(event, session)?;
        let fetched = match prepared.fetch_link() {
            Some(link) => Some(self.fetch_via_cache(link, cache).await),
            None => None,
        };
        let fetched = fetched.as_ref().map(as_text);
        Some(self.assemble(prepared, fetched))
    }

    /// Safety-check then fetch `link` without caching.
    pub async fn fetch_checked(&self, link: &str) -> Result<Arc<str>, ResolveError> {
        if let Err(rejected) = check_url(link) {
            warn!(reason = %rejected.reason, "refusing to fetch unsafe code link");
            return Err(ResolveError::UnsafeLink(rejected));
        }
        self.fetcher.fetch(link).await.map(Arc::from).map_err(|e| {
            warn!(error = %e, "source fetch failed");
            ResolveError::from(e)
        })
    }

    /// Safety-check then fetch `link` through `cache`.
    pub async fn fetch_via_cache(
        &self,
        link: &str,
        cache: &mut SourceCache,
    ) -> Result<Arc<str>, ResolveError> {
        if let Err(rejected) = check_url(link) {
            warn!(reason = %rejected.reason, "refusing to fetch unsafe code link");
            return Err(ResolveError::UnsafeLink(rejected));
        }
        let shared: SharedSource = cache.get_or_fetch(link, self.fetcher.as_ref()).await;
        shared.map_err(ResolveError::from)
    }
}

pub(crate) fn as_text(fetched: &Result<Arc<str>, ResolveError>) -> Result<&str, ResolveError> {
    match fetched {
        Ok(text) => Ok(text.as_ref()),
        Err(err) => Err(err.clone()),
    }
}

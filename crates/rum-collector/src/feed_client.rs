//! Upstream RUM bundle feed: one GET per domain and day.

use chrono::{Datelike, NaiveDate};
use rum_resolver::feed::RumFeed;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Default bundle service root.
pub const DEFAULT_FEED_BASE_URL: &str = "https://bundles.aem.page/bundles";

/// Feed retrieval failed. Fatal for a collect run.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("RUM feed unavailable at {endpoint}: {reason}")]
    Unavailable { endpoint: String, reason: String },

    #[error("invalid feed URL '{0}'")]
    InvalidUrl(String),
}

impl FeedError {
    fn unavailable(endpoint: &str, reason: impl ToString) -> Self {
        Self::Unavailable {
            endpoint: endpoint.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Parameters of one feed query.
#[derive(Clone)]
pub struct FeedRequest {
    pub base_url: String,
    pub domain: String,
    pub date: NaiveDate,
    pub domain_key: String,
    pub checkpoint: Option<String>,
}

impl std::fmt::Debug for FeedRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedRequest")
            .field("base_url", &self.base_url)
            .field("domain", &self.domain)
            .field("date", &self.date)
            .field("domain_key", &"<redacted>")
            .field("checkpoint", &self.checkpoint)
            .finish()
    }
}

impl FeedRequest {
    /// `{base}/{domain}/{yyyy}/{mm}/{dd}` without the query. Safe to log.
    pub fn endpoint(&self) -> String {
        format!(
            "{}/{}/{:04}/{:02}/{:02}",
            self.base_url.trim_end_matches('/'),
            self.domain,
            self.date.year(),
            self.date.month(),
            self.date.day()
        )
    }

    /// Full request URL including `domainkey` and optional `checkpoint`.
    pub fn url(&self) -> Result<reqwest::Url, FeedError> {
        let mut params = vec![("domainkey", self.domain_key.as_str())];
        if let Some(checkpoint) = &self.checkpoint {
            params.push(("checkpoint", checkpoint.as_str()));
        }
        let endpoint = self.endpoint();
        reqwest::Url::parse_with_params(&endpoint, &params)
            .map_err(|_| FeedError::InvalidUrl(endpoint))
    }
}

/// HTTP client for the bundle feed.
pub struct FeedClient {
    client: reqwest::Client,
}

impl FeedClient {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| FeedError::unavailable("<client>", e))?;
        Ok(Self { client })
    }

    pub async fn fetch(&self, request: &FeedRequest) -> Result<RumFeed, FeedError> {
        let endpoint = request.endpoint();
        let url = request.url()?;
        info!(endpoint = %endpoint, "fetching RUM feed");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FeedError::unavailable(&endpoint, e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::unavailable(&endpoint, format!("HTTP {}", status)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FeedError::unavailable(&endpoint, e.without_url()))?;
        let feed = RumFeed::from_reader(body.as_ref())
            .map_err(|e| FeedError::unavailable(&endpoint, format!("invalid feed JSON: {}", e)))?;

        info!(
            endpoint = %endpoint,
            sessions = feed.sessions.len(),
            error_events = feed.error_event_count(),
            "RUM feed fetched"
        );
        Ok(feed)
    }
}

/// Load a saved feed dump instead of querying the service.
pub fn load_feed_file(path: &Path) -> Result<RumFeed, FeedError> {
    let feed = RumFeed::load(path).map_err(|e| FeedError::unavailable(&path.display().to_string(), e))?;
    info!(
        path = %path.display(),
        sessions = feed.sessions.len(),
        error_events = feed.error_event_count(),
        "RUM feed loaded from file"
    );
    Ok(feed)
}

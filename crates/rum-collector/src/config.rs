//! Collector configuration.
//!
//! Layered: built-in defaults, then an optional TOML file, then `RUM_*`
//! environment variables, then command-line overrides.

use crate::feed_client::{FeedRequest, DEFAULT_FEED_BASE_URL};
use chrono::NaiveDate;
use rum_resolver::ResolverConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("no feed domain configured (set feed.domain, RUM_DOMAIN or --domain)")]
    MissingDomain,

    #[error("no domain key configured (set feed.domain_key or RUM_DOMAIN_KEY)")]
    MissingDomainKey,
}

/// `[feed]` table.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedSettings {
    pub base_url: String,
    pub domain: Option<String>,
    pub domain_key: Option<String>,
    /// Defaults to the current UTC day when unset.
    pub date: Option<NaiveDate>,
    pub checkpoint: Option<String>,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_FEED_BASE_URL.to_string(),
            domain: None,
            domain_key: None,
            date: None,
            checkpoint: None,
        }
    }
}

impl std::fmt::Debug for FeedSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedSettings")
            .field("base_url", &self.base_url)
            .field("domain", &self.domain)
            .field("domain_key", &self.domain_key.as_ref().map(|_| "<redacted>"))
            .field("date", &self.date)
            .field("checkpoint", &self.checkpoint)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    pub feed: FeedSettings,
    pub output_dir: PathBuf,
    pub resolver: ResolverConfig,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            feed: FeedSettings::default(),
            output_dir: PathBuf::from("."),
            resolver: ResolverConfig::default(),
        }
    }
}

/// Values given on the command line. `None` leaves the layer below in place.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub domain: Option<String>,
    pub date: Option<NaiveDate>,
    pub output_dir: Option<PathBuf>,
}

impl CollectorConfig {
    /// Defaults, then `path` if given, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn apply_env(&mut self) {
        self.apply_vars(|key| std::env::var(key).ok());
    }

    /// Apply `RUM_*` variables through `var`.
    pub fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(domain) = var("RUM_DOMAIN") {
            self.feed.domain = Some(domain);
        }
        if let Some(key) = var("RUM_DOMAIN_KEY") {
            self.feed.domain_key = Some(key);
        }
        if let Some(url) = var("RUM_FEED_URL") {
            self.feed.base_url = url;
        }
        if let Some(date) = var("RUM_DATE") {
            match date.parse() {
                Ok(date) => self.feed.date = Some(date),
                Err(_) => tracing::warn!(value = %date, "ignoring invalid RUM_DATE (want YYYY-MM-DD)"),
            }
        }
        if let Some(dir) = var("RUM_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        self.resolver.apply_vars(var);
    }

    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(domain) = &overrides.domain {
            self.feed.domain = Some(domain.clone());
        }
        if let Some(date) = overrides.date {
            self.feed.date = Some(date);
        }
        if let Some(dir) = &overrides.output_dir {
            self.output_dir = dir.clone();
        }
    }

    /// The feed query for this configuration. Needs a domain and a key.
    pub fn feed_request(&self) -> Result<FeedRequest, ConfigError> {
        let domain = self.feed.domain.clone().ok_or(ConfigError::MissingDomain)?;
        let domain_key = self
            .feed
            .domain_key
            .clone()
            .ok_or(ConfigError::MissingDomainKey)?;

        Ok(FeedRequest {
            base_url: self.feed.base_url.clone(),
            domain,
            date: self
                .feed
                .date
                .unwrap_or_else(|| chrono::Utc::now().date_naive()),
            domain_key,
            checkpoint: self.feed.checkpoint.clone(),
        })
    }
}

//! Fetch-result cache keyed by `code_link`.
//!
//! Many error records point at the same bundle. The cache stores the outcome
//! of one fetch per link (failures included, so a dead link is not hammered)
//! and hands out shared text. Entries expire after a TTL and the oldest entry
//! is evicted once `max_entries` is reached.

use crate::fetch::{FetchError, SourceFetcher};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Outcome of fetching one link, shareable between records.
pub type SharedSource = Result<Arc<str>, FetchError>;

/// Cache sizing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_entries: usize,
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 256,
            ttl_secs: 600,
        }
    }
}

struct Entry {
    value: SharedSource,
    inserted: Instant,
}

/// Bounded, TTL-limited cache of fetched sources.
pub struct SourceCache {
    entries: HashMap<String, Entry>,
    order: VecDeque<String>,
    max_entries: usize,
    ttl: Duration,
    hits: u64,
    misses: u64,
}

impl SourceCache {
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            max_entries: max_entries.max(1),
            ttl,
            hits: 0,
            misses: 0,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.max_entries, Duration::from_secs(config.ttl_secs))
    }

    /// Cached outcome for `link`, if present and fresh.
    pub fn get(&mut self, link: &str) -> Option<SharedSource> {
        let fresh = match self.entries.get(link) {
            Some(entry) => entry.inserted.elapsed() < self.ttl,
            None => {
                self.misses += 1;
                return None;
            }
        };

        if !fresh {
            self.remove(link);
            self.misses += 1;
            return None;
        }

        self.hits += 1;
        self.entries.get(link).map(|e| e.value.clone())
    }

    /// Fresh entry present. Does not touch hit/miss counters.
    pub fn contains(&self, link: &str) -> bool {
        self.entries
            .get(link)
            .is_some_and(|e| e.inserted.elapsed() < self.ttl)
    }

    /// Store an outcome, evicting the oldest entry when full.
    pub fn insert(&mut self, link: &str, value: SharedSource) {
        if self.entries.contains_key(link) {
            self.remove(link);
        }
        while self.entries.len() >= self.max_entries {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
        self.order.push_back(link.to_string());
        self.entries.insert(
            link.to_string(),
            Entry {
                value,
                inserted: Instant::now(),
            },
        );
    }

    /// Return the cached outcome or fetch and cache it.
    pub async fn get_or_fetch(&mut self, link: &str, fetcher: &dyn SourceFetcher) -> SharedSource {
        if let Some(hit) = self.get(link) {
            return hit;
        }
        let value: SharedSource = fetcher.fetch(link).await.map(Arc::from);
        self.insert(link, value.clone());
        value
    }

    fn remove(&mut self, link: &str) {
        self.entries.remove(link);
        self.order.retain(|k| k != link);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries held at once.
    pub fn capacity(&self) -> usize {
        self.max_entries
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

//! Resolver tunables: extraction radii, fetch limits, cache sizing and the
//! minified heuristic. Every field has a default; `RUM_*` variables override.

use crate::cache::CacheConfig;
use crate::extract::{DEFAULT_CONTEXT_RADIUS, DEFAULT_SNIPPET_RADIUS};
use crate::normalize::MinifiedRule;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Records whose context window has a line with this many tokens or more
/// are withheld from the agent hand-off.
pub const DEFAULT_MAX_CONTEXT_TOKENS: usize = 1000;

/// Tunables for source resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub snippet_radius: usize,
    pub context_radius: usize,
    pub fetch_timeout_secs: u64,
    pub minified_rule: MinifiedRule,
    /// Maximum fetches in flight while prefetching distinct code links.
    pub fetch_concurrency: usize,
    pub cache: CacheConfig,
    pub max_context_tokens: usize,
    pub user_agent: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            snippet_radius: DEFAULT_SNIPPET_RADIUS,
            context_radius: DEFAULT_CONTEXT_RADIUS,
            fetch_timeout_secs: 10,
            minified_rule: MinifiedRule::default(),
            fetch_concurrency: 8,
            cache: CacheConfig::default(),
            max_context_tokens: DEFAULT_MAX_CONTEXT_TOKENS,
            user_agent: concat!("rum-resolver/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ResolverConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Apply `RUM_FETCH_TIMEOUT_SECS`, `RUM_FETCH_CONCURRENCY`, `RUM_MINIFIED_RULE`.
    ///
    /// Unparseable values are ignored with a warning.
    pub fn apply_env(&mut self) {
        self.apply_vars(|key| std::env::var(key).ok());
    }

    /// Same as [`apply_env`](Self::apply_env) with an explicit lookup.
    pub fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("RUM_FETCH_TIMEOUT_SECS") {
            match v.parse() {
                Ok(secs) => self.fetch_timeout_secs = secs,
                Err(_) => tracing::warn!(value = %v, "ignoring invalid RUM_FETCH_TIMEOUT_SECS"),
            }
        }
        if let Some(v) = var("RUM_FETCH_CONCURRENCY") {
            match v.parse() {
                Ok(n) => self.fetch_concurrency = n,
                Err(_) => tracing::warn!(value = %v, "ignoring invalid RUM_FETCH_CONCURRENCY"),
            }
        }
        if let Some(v) = var("RUM_MINIFIED_RULE") {
            match v.parse() {
                Ok(rule) => self.minified_rule = rule,
                Err(e) => tracing::warn!(error = %e, "ignoring invalid RUM_MINIFIED_RULE"),
            }
        }
    }
}

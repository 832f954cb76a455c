//! RUM error collector
//!
//! Pulls a day of RUM session bundles for one domain, resolves every JS
//! error against its script with `rum_resolver`, and writes the partitioned
//! corpus files.

#![allow(clippy::uninlined_format_args)]

pub mod config;
pub mod feed_client;
pub mod pipeline;

pub use config::{CollectorConfig, ConfigError, FeedSettings, Overrides};
pub use feed_client::{load_feed_file, FeedClient, FeedError, FeedRequest};
pub use pipeline::{collect, resolve_and_write, CollectOutcome, FeedSource};

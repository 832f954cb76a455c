//! RUM error resolution library
//!
//! Turns real-user-monitoring sessions into a corpus of JavaScript errors
//! annotated with the code that raised them:
//! - `url_safety`: rejects page and script URLs that look like injection probes
//! - `feed` / `source`: upstream session model and `url:line:col` parsing
//! - `fetch` / `cache`: script retrieval behind a mockable trait, with a
//!   per-link outcome cache
//! - `extract`: snippet and context-window extraction around a coordinate
//! - `normalize` / `corpus`: per-event normalization and the URL-keyed corpus
//! - `partition` / `persist`: derived corpus views and their files on disk
//! - `handoff` / `report`: agent inputs, statistics and missing-field audit
//!
//! Per-record failures (unsafe link, failed fetch, out-of-bounds coordinate)
//! never abort a build. They are carried on the record as a [`ResolveError`]
//! and rendered as a short diagnostic string when persisted.

#![allow(clippy::uninlined_format_args)]

pub mod cache;
pub mod config;
pub mod corpus;
pub mod extract;
pub mod feed;
pub mod fetch;
pub mod handoff;
pub mod normalize;
pub mod partition;
pub mod persist;
pub mod record;
pub mod report;
pub mod source;
pub mod url_safety;

pub use cache::{CacheConfig, SourceCache};
pub use config::ResolverConfig;
pub use corpus::{BuildReport, Corpus, CorpusBuilder};
pub use extract::{extract_context, extract_snippet, ContextWindow, ExtractError};
pub use feed::{RawErrorEvent, RumFeed, Session};
pub use fetch::{FetchError, HttpFetcher, SourceFetcher};
pub use handoff::{agent_inputs, AgentHandoff, AgentInput};
pub use normalize::{MinifiedPredicate, MinifiedRule, Normalizer};
pub use partition::{dedupe_by_description, partition_by_location, PartitionedCorpus};
pub use persist::{load_corpus, CorpusFiles, PersistError};
pub use record::{NormalizedErrorRecord, ResolveError, Resolution};
pub use report::{CorpusStats, MissingFieldAudit};
pub use source::ErrorSource;
pub use url_safety::{check_url, is_safe, UnsafeUrl};

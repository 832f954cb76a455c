//! Derived corpus views: location partition and description dedup.
//!
//! Both are pure functions of a [`Corpus`]; neither mutates records.

use crate::corpus::Corpus;
use crate::record::NormalizedErrorRecord;
use serde::Serialize;
use std::collections::HashSet;

/// Dedup key for an error description.
///
/// Text is trimmed and lowercased. A missing description is a single
/// sentinel that equals only other missing descriptions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DescriptionKey {
    Text(String),
    Missing,
}

impl DescriptionKey {
    pub fn of(record: &NormalizedErrorRecord) -> Self {
        match &record.error_description {
            Some(text) => Self::Text(text.trim().to_lowercase()),
            None => Self::Missing,
        }
    }
}

/// Split into records with both line and column, and the rest.
///
/// URLs whose bucket ends up empty are left out of that bucket.
pub fn partition_by_location(corpus: &Corpus) -> (Corpus, Corpus) {
    let mut with_location = Corpus::new();
    let mut without_location = Corpus::new();

    for (url, records) in corpus.iter() {
        for record in records {
            if record.has_location() {
                with_location.push(url, record.clone());
            } else {
                without_location.push(url, record.clone());
            }
        }
    }

    (with_location, without_location)
}

/// Keep only the first record per distinct description within each URL.
pub fn dedupe_by_description(corpus: &Corpus) -> Corpus {
    let mut unique = Corpus::new();

    for (url, records) in corpus.iter() {
        let mut seen = HashSet::new();
        for record in records {
            if seen.insert(DescriptionKey::of(record)) {
                unique.push(url, record.clone());
            }
        }
    }

    unique
}

/// Every persisted corpus variant.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PartitionedCorpus {
    pub full: Corpus,
    pub with_location: Corpus,
    pub without_location: Corpus,
    pub unique_description: Corpus,
}

impl PartitionedCorpus {
    pub fn from_corpus(full: Corpus) -> Self {
        let (with_location, without_location) = partition_by_location(&full);
        let unique_description = dedupe_by_description(&full);
        Self {
            full,
            with_location,
            without_location,
            unique_description,
        }
    }
}

//! Corpus files on disk.
//!
//! Each variant of a [`PartitionedCorpus`] is written as a pretty-printed
//! JSON object to a fixed file name. Writes go to `<name>.tmp` first and are
//! renamed into place, so a reader never observes a half-written file.

use crate::corpus::Corpus;
use crate::partition::PartitionedCorpus;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub const FULL_FILE: &str = "rum_errors_by_url.json";
pub const WITH_LOCATION_FILE: &str = "rum_errors_with_line_column.json";
pub const WITHOUT_LOCATION_FILE: &str = "rum_errors_missing_line_column.json";
pub const UNIQUE_DESCRIPTION_FILE: &str = "rum_errors_by_url_unique_description.json";

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid corpus JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type PersistResult<T> = Result<T, PersistError>;

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> PersistError + '_ {
    move |source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Paths of the four corpus files inside one output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusFiles {
    pub full: PathBuf,
    pub with_location: PathBuf,
    pub without_location: PathBuf,
    pub unique_description: PathBuf,
}

impl CorpusFiles {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            full: dir.join(FULL_FILE),
            with_location: dir.join(WITH_LOCATION_FILE),
            without_location: dir.join(WITHOUT_LOCATION_FILE),
            unique_description: dir.join(UNIQUE_DESCRIPTION_FILE),
        }
    }

    /// Write every variant into `dir`, creating it if needed.
    pub fn write_all(dir: &Path, corpus: &PartitionedCorpus) -> PersistResult<Self> {
        std::fs::create_dir_all(dir).map_err(io_error(dir))?;
        let files = Self::in_dir(dir);

        write_corpus(&files.full, &corpus.full)?;
        write_corpus(&files.with_location, &corpus.with_location)?;
        write_corpus(&files.without_location, &corpus.without_location)?;
        write_corpus(&files.unique_description, &corpus.unique_description)?;

        Ok(files)
    }
}

/// Write one corpus atomically (temp file + rename).
pub fn write_corpus(path: &Path, corpus: &Corpus) -> PersistResult<()> {
    let temp_path = path.with_extension("json.tmp");
    let content = serde_json::to_string_pretty(corpus).map_err(|source| PersistError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    std::fs::write(&temp_path, content).map_err(io_error(&temp_path))?;
    std::fs::rename(&temp_path, path).map_err(io_error(path))?;

    info!(path = %path.display(), urls = corpus.url_count(), "corpus file written");
    Ok(())
}

/// Read back any corpus file. Code fields come back as plain text.
pub fn load_corpus(path: &Path) -> PersistResult<Corpus> {
    let content = std::fs::read_to_string(path).map_err(io_error(path))?;
    serde_json::from_str(&content).map_err(|source| PersistError::Json {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchError;
    use crate::record::{NormalizedErrorRecord, ResolveError};
    use tempfile::TempDir;

    fn record(line: Option<usize>, desc: &str) -> NormalizedErrorRecord {
        NormalizedErrorRecord {
            error_source: "https://site.test/app.js:1:1".into(),
            user_agent: "desktop:firefox".into(),
            code_link: Some("https://site.test/app.js".into()),
            line,
            column: line,
            error_description: Some(desc.into()),
            error_part_in_code: Some(Err(ResolveError::Fetch(FetchError::Timeout {
                url: "https://site.test/app.js".into(),
                timeout: std::time::Duration::from_secs(10),
            }))),
            context_code: None,
            max_tokens_length_in_code_context: None,
        }
    }

    fn sample() -> PartitionedCorpus {
        let mut corpus = Corpus::new();
        corpus.push("https://z.test/", record(Some(1), "a"));
        corpus.push("https://a.test/", record(None, "b"));
        corpus.push("https://a.test/", record(None, "B"));
        PartitionedCorpus::from_corpus(corpus)
    }

    #[test]
    fn test_write_all_creates_four_files() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("nested");
        let files = CorpusFiles::write_all(&out, &sample()).unwrap();

        for path in [
            &files.full,
            &files.with_location,
            &files.without_location,
            &files.unique_description,
        ] {
            assert!(path.exists(), "missing {}", path.display());
        }
        assert!(!out.join("rum_errors_by_url.json.tmp").exists());
    }

    #[test]
    fn test_load_round_trip_keeps_order_and_flattens() {
        let dir = TempDir::new().unwrap();
        let files = CorpusFiles::write_all(dir.path(), &sample()).unwrap();

        let full = load_corpus(&files.full).unwrap();
        let urls: Vec<_> = full.urls().collect();
        assert_eq!(urls, vec!["https://z.test/", "https://a.test/"]);

        let first = &full.get("https://z.test/").unwrap()[0];
        assert!(matches!(&first.error_part_in_code, Some(Ok(t)) if t.starts_with("Unable to fetch source")));

        let unique = load_corpus(&files.unique_description).unwrap();
        assert_eq!(unique.get("https://a.test/").unwrap().len(), 1);
        let without = load_corpus(&files.without_location).unwrap();
        assert!(without.get("https://z.test/").is_none());
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = load_corpus(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, PersistError::Io { .. }));
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "[1, 2]").unwrap();
        assert!(matches!(load_corpus(&path).unwrap_err(), PersistError::Json { .. }));
    }
}

//! Corpus summaries: size statistics and a missing-field audit.

use crate::corpus::Corpus;
use crate::record::NormalizedErrorRecord;
use serde::Serialize;
use std::fmt;

/// Size statistics for a corpus.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorpusStats {
    pub total_urls: usize,
    pub total_records: usize,
    pub average_per_url: f64,
    pub per_url: Vec<(String, usize)>,
}

impl CorpusStats {
    pub fn of(corpus: &Corpus) -> Self {
        let per_url: Vec<(String, usize)> = corpus
            .iter()
            .map(|(url, records)| (url.to_string(), records.len()))
            .collect();
        let total_urls = per_url.len();
        let total_records: usize = per_url.iter().map(|(_, n)| n).sum();
        let average_per_url = if total_urls == 0 {
            0.0
        } else {
            total_records as f64 / total_urls as f64
        };

        Self {
            total_urls,
            total_records,
            average_per_url,
            per_url,
        }
    }
}

impl fmt::Display for CorpusStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total URLs: {}", self.total_urls)?;
        writeln!(f, "Total errors: {}", self.total_records)?;
        write!(f, "Average errors per URL: {:.2}", self.average_per_url)
    }
}

/// A record missing line or column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingLocation {
    pub url: String,
    pub index: usize,
    pub error_description: Option<String>,
    pub error_source: String,
}

/// Which records lack location or usable code fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MissingFieldAudit {
    pub total_records: usize,
    pub missing_location: Vec<MissingLocation>,
    pub missing_snippet: usize,
    pub missing_context: usize,
}

fn is_blank(field: Option<String>) -> bool {
    field.map_or(true, |text| text.trim().is_empty())
}

impl MissingFieldAudit {
    pub fn of(corpus: &Corpus) -> Self {
        let mut audit = Self::default();
        for (url, records) in corpus.iter() {
            for (index, record) in records.iter().enumerate() {
                audit.observe(url, index, record);
            }
        }
        audit
    }

    fn observe(&mut self, url: &str, index: usize, record: &NormalizedErrorRecord) {
        self.total_records += 1;
        if !record.has_location() {
            self.missing_location.push(MissingLocation {
                url: url.to_string(),
                index,
                error_description: record.error_description.clone(),
                error_source: record.error_source.clone(),
            });
        }
        if is_blank(record.snippet_text()) {
            self.missing_snippet += 1;
        }
        if is_blank(record.context_text()) {
            self.missing_context += 1;
        }
    }
}

impl fmt::Display for MissingFieldAudit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Records missing line/column: {} of {}",
            self.missing_location.len(),
            self.total_records
        )?;
        for missing in &self.missing_location {
            writeln!(
                f,
                "  {} [{}]: {} ({})",
                missing.url,
                missing.index,
                missing.error_description.as_deref().unwrap_or("<no description>"),
                missing.error_source
            )?;
        }
        writeln!(f, "Records missing error_part_in_code: {}", self.missing_snippet)?;
        write!(f, "Records missing context_code: {}", self.missing_context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(line: Option<usize>, snippet: Option<&str>) -> NormalizedErrorRecord {
        NormalizedErrorRecord {
            error_source: "src".into(),
            user_agent: String::new(),
            code_link: None,
            line,
            column: line,
            error_description: Some("boom".into()),
            error_part_in_code: snippet.map(|s| Ok(s.to_string())),
            context_code: snippet.map(|s| Ok(s.to_string())),
            max_tokens_length_in_code_context: None,
        }
    }

    #[test]
    fn test_stats_empty() {
        let stats = CorpusStats::of(&Corpus::new());
        assert_eq!(stats.total_urls, 0);
        assert_eq!(stats.average_per_url, 0.0);
    }

    #[test]
    fn test_stats_counts() {
        let mut corpus = Corpus::new();
        corpus.push("https://a.test/", record(None, None));
        corpus.push("https://a.test/", record(None, None));
        corpus.push("https://b.test/", record(None, None));

        let stats = CorpusStats::of(&corpus);
        assert_eq!(stats.total_urls, 2);
        assert_eq!(stats.total_records, 3);
        assert_eq!(stats.average_per_url, 1.5);
        assert_eq!(stats.per_url[0], ("https://a.test/".to_string(), 2));
        assert!(stats.to_string().contains("Average errors per URL: 1.50"));
    }

    #[test]
    fn test_audit() {
        let mut corpus = Corpus::new();
        corpus.push("https://a.test/", record(Some(1), Some("x")));
        corpus.push("https://a.test/", record(None, None));
        corpus.push("https://a.test/", record(Some(1), Some("  ")));

        let audit = MissingFieldAudit::of(&corpus);
        assert_eq!(audit.total_records, 3);
        assert_eq!(audit.missing_location.len(), 1);
        assert_eq!(audit.missing_location[0].index, 1);
        assert_eq!(audit.missing_snippet, 2);
        assert_eq!(audit.missing_context, 2);
        assert!(audit.to_string().starts_with("Records missing line/column: 1 of 3"));
    }
}

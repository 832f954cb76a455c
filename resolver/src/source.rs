//! Error-source string parsing.
//!
//! RUM error checkpoints report where an error happened as a single string,
//! usually `https://host/path/script.js:LINE:COLUMN`. Parsing is best effort:
//! anything that does not match leaves the corresponding fields empty.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// `scheme://host/path.js[?query][:line[:column]]`
static SOURCE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Za-z][A-Za-z0-9+.\-]*://[^\s]+?\.js\b(?:\?[^\s:]*)?)(?::(\d+))?(?::(\d+))?")
        .unwrap()
});

/// Location fields parsed out of a raw error-source string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorSource {
    pub raw: String,
    pub code_link: Option<String>,
    /// 1-based line
    pub line: Option<usize>,
    /// 0-based column
    pub column: Option<usize>,
}

impl ErrorSource {
    /// Parse a raw source string. Never fails; malformed input yields `None` fields.
    pub fn parse(raw: &str) -> Self {
        let mut parsed = Self {
            raw: raw.to_string(),
            ..Default::default()
        };

        if let Some(caps) = SOURCE_PATTERN.captures(raw) {
            parsed.code_link = caps.get(1).map(|m| m.as_str().to_string());
            parsed.line = caps.get(2).and_then(|m| m.as_str().parse().ok());
            // A column without a line is meaningless
            if parsed.line.is_some() {
                parsed.column = caps.get(3).and_then(|m| m.as_str().parse().ok());
            }
        }

        parsed
    }

    /// All three of `code_link`, `line`, and `column` are present.
    pub fn location(&self) -> Option<(&str, usize, usize)> {
        match (&self.code_link, self.line, self.column) {
            (Some(link), Some(line), Some(column)) => Some((link.as_str(), line, column)),
            _ => None,
        }
    }

    /// Both line and column are present.
    pub fn has_line_and_column(&self) -> bool {
        self.line.is_some() && self.column.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_location() {
        let s = ErrorSource::parse("https://site.test/scripts/app.js:12:40");
        assert_eq!(s.code_link.as_deref(), Some("https://site.test/scripts/app.js"));
        assert_eq!(s.line, Some(12));
        assert_eq!(s.column, Some(40));
        assert_eq!(
            s.location(),
            Some(("https://site.test/scripts/app.js", 12, 40))
        );
    }

    #[test]
    fn test_parse_line_only() {
        let s = ErrorSource::parse("https://site.test/app.js:7");
        assert_eq!(s.line, Some(7));
        assert_eq!(s.column, None);
        assert!(s.location().is_none());
        assert!(!s.has_line_and_column());
    }

    #[test]
    fn test_parse_link_only() {
        let s = ErrorSource::parse("https://site.test/app.js");
        assert_eq!(s.code_link.as_deref(), Some("https://site.test/app.js"));
        assert_eq!(s.line, None);
        assert_eq!(s.column, None);
    }

    #[test]
    fn test_parse_with_port_and_query() {
        let s = ErrorSource::parse("https://cdn.site.test:8443/js/app.js?v=3:10:5");
        assert_eq!(
            s.code_link.as_deref(),
            Some("https://cdn.site.test:8443/js/app.js?v=3")
        );
        assert_eq!(s.line, Some(10));
        assert_eq!(s.column, Some(5));
    }

    #[test]
    fn test_parse_js_inside_host_name() {
        let s = ErrorSource::parse("https://cdn.jsdelivr.net/npm/lib/app.js:1:2");
        assert_eq!(s.code_link.as_deref(), Some("https://cdn.jsdelivr.net/npm/lib/app.js"));
        assert_eq!(s.location().map(|(_, l, c)| (l, c)), Some((1, 2)));
    }

    #[test]
    fn test_parse_embedded_in_text() {
        let s = ErrorSource::parse("at render (https://site.test/app.js:3:14)");
        assert_eq!(s.code_link.as_deref(), Some("https://site.test/app.js"));
        assert_eq!(s.line, Some(3));
        assert_eq!(s.column, Some(14));
    }

    #[test]
    fn test_parse_malformed() {
        for raw in ["", "undefined", "Script error.", "https://site.test/page.html:1:2"] {
            let s = ErrorSource::parse(raw);
            assert_eq!(s.raw, raw);
            assert!(s.code_link.is_none(), "unexpected link for {:?}", raw);
            assert!(s.line.is_none());
            assert!(s.column.is_none());
        }
    }

    #[test]
    fn test_parse_overflowing_numbers_dropped() {
        let s = ErrorSource::parse("https://site.test/app.js:99999999999999999999999:1");
        assert!(s.code_link.is_some());
        assert_eq!(s.line, None);
        assert_eq!(s.column, None);
    }
}

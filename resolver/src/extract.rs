//! Snippet and context-window extraction over raw (often minified) source text.
//!
//! Two views of the same fetched file:
//! - [`extract_snippet`]: a narrow horizontal slice centred on the error column.
//!   Minified bundles pack whole modules onto one line, so the column slice is
//!   the cheapest way to isolate the faulting expression without parsing.
//! - [`extract_context`]: a vertical window of whole lines around the error
//!   line, plus a per-line token signal for downstream budget checks.
//!
//! Lines are split on `'\n'` only. Columns and radii count `char`s.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default half-width of the column snippet.
pub const DEFAULT_SNIPPET_RADIUS: usize = 20;
/// Default number of lines above and below the error line.
pub const DEFAULT_CONTEXT_RADIUS: usize = 30;

/// Coordinates that do not fit the fetched file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("line {line} out of bounds (file has {total_lines} lines)")]
    LineOutOfBounds { line: usize, total_lines: usize },

    #[error("column {column} out of bounds (line {line} has {line_length} characters)")]
    ColumnOutOfBounds {
        line: usize,
        column: usize,
        line_length: usize,
    },

    #[error("no line number available for context window")]
    MissingLine,
}

/// Vertical slice of a file around an error line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextWindow {
    /// Window lines joined with `'\n'`.
    pub code: String,
    /// Largest whitespace-delimited token count of any single window line.
    pub max_tokens: usize,
    /// 1-based first line included (0 when the window is empty).
    pub first_line: usize,
    /// Number of lines included.
    pub line_count: usize,
}

fn split_lines(source_text: &str) -> Vec<&str> {
    source_text.split('\n').collect()
}

/// Approximate token count of one line.
pub fn count_tokens(line: &str) -> usize {
    line.split_whitespace().count()
}

/// Slice up to `radius` chars either side of `column` on 1-based `line`.
///
/// The result spans `[max(0, column - radius), min(len, column + radius + 1))`.
pub fn extract_snippet(
    source_text: &str,
    line: usize,
    column: usize,
    radius: usize,
) -> Result<String, ExtractError> {
    let lines = split_lines(source_text);
    let total_lines = lines.len();

    let target = line
        .checked_sub(1)
        .and_then(|idx| lines.get(idx))
        .ok_or(ExtractError::LineOutOfBounds { line, total_lines })?;

    let chars: Vec<char> = target.chars().collect();
    let line_length = chars.len();
    if column >= line_length {
        return Err(ExtractError::ColumnOutOfBounds {
            line,
            column,
            line_length,
        });
    }

    let start = column.saturating_sub(radius);
    let end = line_length.min(column.saturating_add(radius).saturating_add(1));
    Ok(chars[start..end].iter().collect())
}

/// Window of `radius` lines above and below 1-based `line`.
///
/// Never rejects out-of-range lines: the window is clipped to the file and
/// may come back empty. Only a missing line number is an error.
pub fn extract_context(
    source_text: &str,
    line: Option<usize>,
    radius: usize,
) -> Result<ContextWindow, ExtractError> {
    let line = line.ok_or(ExtractError::MissingLine)?;
    let lines = split_lines(source_text);
    let total = lines.len();

    // Line 0 sits one above the file, so only `radius` lines can reach it.
    let (start, end) = match line.checked_sub(1) {
        Some(index) => (
            index.saturating_sub(radius),
            total.min(index.saturating_add(radius).saturating_add(1)),
        ),
        None => (0, total.min(radius)),
    };

    if start >= end {
        return Ok(ContextWindow {
            code: String::new(),
            max_tokens: 0,
            first_line: 0,
            line_count: 0,
        });
    }

    let window = &lines[start..end];
    let max_tokens = window.iter().map(|l| count_tokens(l)).max().unwrap_or(0);

    Ok(ContextWindow {
        code: window.join("\n"),
        max_tokens,
        first_line: start + 1,
        line_count: window.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered_file(n: usize) -> String {
        (1..=n)
            .map(|i| format!("line {} token{}", i, i))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_snippet_clips_left_edge() {
        let s = extract_snippet("abcdefghij", 1, 0, 5).unwrap();
        assert_eq!(s, "abcdef");
    }

    #[test]
    fn test_snippet_clips_right_edge() {
        let s = extract_snippet("abcdefghij", 1, 9, 3).unwrap();
        assert_eq!(s, "ghij");
    }

    #[test]
    fn test_snippet_centered() {
        let text = "0123456789abcdefghij";
        let s = extract_snippet(text, 1, 10, 2).unwrap();
        assert_eq!(s, "89abc");
    }

    #[test]
    fn test_snippet_max_width() {
        let text = "x".repeat(200);
        let s = extract_snippet(&text, 1, 100, DEFAULT_SNIPPET_RADIUS).unwrap();
        assert_eq!(s.chars().count(), 2 * DEFAULT_SNIPPET_RADIUS + 1);
    }

    #[test]
    fn test_snippet_line_out_of_bounds() {
        let err = extract_snippet("a\nb\nc", 5, 0, DEFAULT_SNIPPET_RADIUS).unwrap_err();
        assert_eq!(
            err,
            ExtractError::LineOutOfBounds {
                line: 5,
                total_lines: 3
            }
        );
    }

    #[test]
    fn test_snippet_line_zero_out_of_bounds() {
        let err = extract_snippet("abc", 0, 0, 5).unwrap_err();
        assert!(matches!(err, ExtractError::LineOutOfBounds { line: 0, .. }));
    }

    #[test]
    fn test_snippet_column_out_of_bounds() {
        let err = extract_snippet("abc\ndef", 2, 3, 5).unwrap_err();
        assert_eq!(
            err,
            ExtractError::ColumnOutOfBounds {
                line: 2,
                column: 3,
                line_length: 3
            }
        );
    }

    #[test]
    fn test_snippet_empty_line_rejects_any_column() {
        let err = extract_snippet("abc\n\ndef", 2, 0, 5).unwrap_err();
        assert!(matches!(err, ExtractError::ColumnOutOfBounds { .. }));
    }

    #[test]
    fn test_snippet_counts_chars_not_bytes() {
        let text = "héllo wörld";
        let s = extract_snippet(text, 1, 1, 1).unwrap();
        assert_eq!(s, "hél");
    }

    #[test]
    fn test_snippet_keeps_carriage_return() {
        let s = extract_snippet("ab\r\ncd", 1, 2, 1).unwrap();
        assert_eq!(s, "b\r");
    }

    #[test]
    fn test_context_clips_to_file() {
        let text = numbered_file(5);
        let window = extract_context(&text, Some(1), 30).unwrap();
        assert_eq!(window.code, text);
        assert_eq!(window.first_line, 1);
        assert_eq!(window.line_count, 5);
    }

    #[test]
    fn test_context_middle_window() {
        let text = numbered_file(100);
        let window = extract_context(&text, Some(50), 2).unwrap();
        assert_eq!(window.line_count, 5);
        assert_eq!(window.first_line, 48);
        assert!(window.code.starts_with("line 48 "));
        assert!(window.code.ends_with("token52"));
    }

    #[test]
    fn test_context_max_tokens() {
        let text = "a b\nc d e f g\n\nh";
        let window = extract_context(text, Some(2), 30).unwrap();
        assert_eq!(window.max_tokens, 5);
    }

    #[test]
    fn test_context_past_end_is_empty_not_error() {
        let text = numbered_file(3);
        let window = extract_context(&text, Some(100), 2).unwrap();
        assert!(window.code.is_empty());
        assert_eq!(window.max_tokens, 0);
        assert_eq!(window.line_count, 0);
    }

    #[test]
    fn test_context_huge_line_numbers_are_empty() {
        let text = numbered_file(40);
        for line in [usize::MAX, i64::MAX as usize + 1, i64::MAX as usize] {
            let window = extract_context(&text, Some(line), 30).unwrap();
            assert_eq!(window.line_count, 0, "line {}", line);
            assert!(window.code.is_empty());
        }
        let window = extract_context("a\nb", Some(i64::MAX as usize + 1), 30).unwrap();
        assert_eq!(window.line_count, 0);
    }

    #[test]
    fn test_context_huge_radius_covers_file() {
        let text = numbered_file(4);
        let window = extract_context(&text, Some(2), usize::MAX).unwrap();
        assert_eq!(window.code, text);
        assert_eq!(window.first_line, 1);

        let window = extract_context(&text, Some(usize::MAX), usize::MAX).unwrap();
        assert_eq!(window.line_count, 4);
    }

    #[test]
    fn test_context_line_zero() {
        let text = numbered_file(10);
        let window = extract_context(&text, Some(0), 3).unwrap();
        assert_eq!(window.first_line, 1);
        assert_eq!(window.line_count, 3);
        assert!(extract_context(&text, Some(0), 0).unwrap().code.is_empty());
    }

    #[test]
    fn test_context_missing_line() {
        assert_eq!(
            extract_context("abc", None, 30).unwrap_err(),
            ExtractError::MissingLine
        );
    }

    #[test]
    fn test_count_tokens() {
        assert_eq!(count_tokens(""), 0);
        assert_eq!(count_tokens("   "), 0);
        assert_eq!(count_tokens("var a = 1;\tb()"), 5);
    }
}

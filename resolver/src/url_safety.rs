//! URL Safety: Injection Probe Filtering
//!
//! Page URLs and error-source URLs arrive inside client-side telemetry, so a
//! hostile visitor can plant payloads in them. Every URL passes through
//! [`check_url`] before it is used as a corpus key or drives an outbound fetch.
//!
//! # Threat Model
//!
//! - **Scheme abuse:** `file://`, `ftp://`, `javascript:` and friends are never
//!   fetched. Only `http` and `https` pass.
//! - **Injection probes:** scanners stuff time-delay SQL probes, ESI tags and
//!   path-traversal markers into query strings. Any match rejects the URL.
//!
//! Matching is case-insensitive and unanchored (substring semantics).
//!
//! # Usage
//!
//! ```rust,ignore
//! use rum_resolver::url_safety::{check_url, is_safe};
//!
//! assert!(is_safe("https://x.com/a.js"));
//! assert!(!is_safe("https://x.com/a.js?x=1' OR SLEEP(5)"));
//!
//! if let Err(rejected) = check_url(page_url) {
//!     tracing::warn!(reason = %rejected.reason, "skipping session");
//! }
//! ```

use regex::Regex;
use std::sync::LazyLock;
use url::Url;

/// A suspicious-pattern definition.
struct Pattern {
    kind: ProbeKind,
    regex: &'static str,
}

/// Family of injection probe a pattern belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeKind {
    /// `sleep(5)`, `waitfor delay`, `pg_sleep`
    TimeDelay,
    /// `xor(`, `concat(`, stray quotes glued to payload text
    SqlBoolean,
    /// `dbms_pipe.receive_message`
    OracleDelay,
    /// `<script>`, `esi:include`
    MarkupInjection,
    /// `require`, `socket`, `gethostbyname`, `win.ini`, `etc/passwd`
    HostProbe,
}

impl std::fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TimeDelay => write!(f, "time_delay"),
            Self::SqlBoolean => write!(f, "sql_boolean"),
            Self::OracleDelay => write!(f, "oracle_delay"),
            Self::MarkupInjection => write!(f, "markup_injection"),
            Self::HostProbe => write!(f, "host_probe"),
        }
    }
}

const PATTERNS: &[Pattern] = &[
    Pattern {
        kind: ProbeKind::TimeDelay,
        regex: r"sleep\s*\(\s*\d+\s*\)",
    },
    Pattern {
        kind: ProbeKind::TimeDelay,
        regex: r"waitfor\s+delay",
    },
    Pattern {
        kind: ProbeKind::TimeDelay,
        regex: r"pg_sleep",
    },
    Pattern {
        kind: ProbeKind::SqlBoolean,
        regex: r"xor\s*\(",
    },
    Pattern {
        kind: ProbeKind::SqlBoolean,
        regex: r"concat\s*\(",
    },
    Pattern {
        kind: ProbeKind::SqlBoolean,
        regex: r#"\S['"]|['"]\S"#,
    },
    Pattern {
        kind: ProbeKind::OracleDelay,
        regex: r"dbms_pipe\.receive_message",
    },
    Pattern {
        kind: ProbeKind::MarkupInjection,
        regex: r"<\s*script",
    },
    Pattern {
        kind: ProbeKind::MarkupInjection,
        regex: r"esi:include",
    },
    Pattern {
        kind: ProbeKind::HostProbe,
        regex: r"require",
    },
    Pattern {
        kind: ProbeKind::HostProbe,
        regex: r"socket",
    },
    Pattern {
        kind: ProbeKind::HostProbe,
        regex: r"gethostbyname",
    },
    Pattern {
        kind: ProbeKind::HostProbe,
        regex: r"win\.ini",
    },
    Pattern {
        kind: ProbeKind::HostProbe,
        regex: r"etc/passwd",
    },
];

static COMPILED: LazyLock<Vec<(ProbeKind, Regex)>> = LazyLock::new(|| {
    PATTERNS
        .iter()
        .map(|p| {
            let regex = Regex::new(&format!("(?i){}", p.regex)).unwrap();
            (p.kind, regex)
        })
        .collect()
});

/// Why a URL was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// The string does not parse as an absolute URL.
    Unparseable,
    /// The scheme is something other than `http`/`https`.
    Scheme(String),
    /// A suspicious pattern matched.
    Probe { kind: ProbeKind, matched: String },
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unparseable => write!(f, "unparseable url"),
            Self::Scheme(s) => write!(f, "disallowed scheme '{}'", s),
            Self::Probe { kind, matched } => {
                write!(f, "{} probe '{}'", kind, matched.escape_default())
            }
        }
    }
}

/// Rejection produced by [`check_url`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsafeUrl {
    pub reason: RejectReason,
    /// The original input (truncated to 100 chars).
    pub input_preview: String,
}

impl std::fmt::Display for UnsafeUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unsafe url ({}): {}", self.reason, self.input_preview)
    }
}

impl std::error::Error for UnsafeUrl {}

fn preview(input: &str) -> String {
    if input.chars().count() > 100 {
        format!("{}...", input.chars().take(100).collect::<String>())
    } else {
        input.to_string()
    }
}

/// Classify a URL, returning the first reason it is unsafe.
///
/// The scheme check runs first; probe patterns are then matched against the
/// raw input string so that encodings the URL parser would normalise away
/// are still seen.
pub fn check_url(input: &str) -> Result<(), UnsafeUrl> {
    let reject = |reason| UnsafeUrl {
        reason,
        input_preview: preview(input),
    };

    let parsed = Url::parse(input).map_err(|_| reject(RejectReason::Unparseable))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(reject(RejectReason::Scheme(parsed.scheme().to_string())));
    }

    for (kind, regex) in COMPILED.iter() {
        if let Some(m) = regex.find(input) {
            return Err(reject(RejectReason::Probe {
                kind: *kind,
                matched: m.as_str().to_string(),
            }));
        }
    }
    Ok(())
}

/// `true` iff [`check_url`] accepts the URL.
pub fn is_safe(input: &str) -> bool {
    check_url(input).is_ok()
}

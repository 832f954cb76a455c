//! The normalized error record, the unit of the persisted corpus.
//!
//! Code fields carry a typed [`Resolution`] in memory so callers can tell a
//! fetch failure from an out-of-bounds coordinate. They are flattened to a
//! plain string only when serialized, which keeps the on-disk JSON shape a
//! flat `{"error_part_in_code": "<text or diagnostic>"}`.

use crate::extract::ExtractError;
use crate::fetch::FetchError;
use crate::url_safety::UnsafeUrl;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a code field could not be resolved. Rendered in-band on the record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("Skipped code link: {0}")]
    UnsafeLink(UnsafeUrl),

    #[error("Unable to fetch source: {0}")]
    Fetch(#[from] FetchError),

    #[error("Unable to extract code: {0}")]
    Extract(#[from] ExtractError),
}

/// Resolved text or the reason it is missing.
pub type Resolution<T> = Result<T, ResolveError>;

mod in_band {
    use super::Resolution;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<Resolution<String>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            None => serializer.serialize_none(),
            Some(Ok(text)) => serializer.serialize_some(text),
            Some(Err(err)) => serializer.serialize_some(&err.to_string()),
        }
    }

    /// Diagnostics cannot be told apart from text once flattened, so every
    /// loaded value comes back as `Ok`.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Resolution<String>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<String>::deserialize(deserializer)?.map(Ok))
    }
}

/// One normalized error event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedErrorRecord {
    pub error_source: String,
    pub user_agent: String,
    pub code_link: Option<String>,
    pub line: Option<usize>,
    pub column: Option<usize>,
    pub error_description: Option<String>,
    #[serde(default, with = "in_band")]
    pub error_part_in_code: Option<Resolution<String>>,
    #[serde(default, with = "in_band")]
    pub context_code: Option<Resolution<String>>,
    #[serde(default)]
    pub max_tokens_length_in_code_context: Option<usize>,
}

impl NormalizedErrorRecord {
    /// Both line and column are known.
    pub fn has_location(&self) -> bool {
        self.line.is_some() && self.column.is_some()
    }

    /// The snippet as it will be persisted (text or diagnostic).
    pub fn snippet_text(&self) -> Option<String> {
        flatten(&self.error_part_in_code)
    }

    /// The context window as it will be persisted (text or diagnostic).
    pub fn context_text(&self) -> Option<String> {
        flatten(&self.context_code)
    }

    /// Snippet and context were both extracted from fetched source.
    pub fn is_resolved(&self) -> bool {
        matches!(self.error_part_in_code, Some(Ok(_))) && matches!(self.context_code, Some(Ok(_)))
    }
}

fn flatten(field: &Option<Resolution<String>>) -> Option<String> {
    field.as_ref().map(|r| match r {
        Ok(text) => text.clone(),
        Err(err) => err.to_string(),
    })
}

//! Upstream RUM feed payload types.
//!
//! The feed is `{"rumBundles": [{url, userAgent, time, events: [...]}, ...]}`.
//! Saved dumps sometimes hold the bare session array instead, so both shapes
//! are accepted. Field types in the wild are loose: any field that should be
//! a string but is not is treated as absent rather than failing the payload.
//! A malformed list element (an event or session that is not an object) is
//! dropped on its own; a `null` list is empty.

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

/// Checkpoint name for JavaScript error events.
pub const ERROR_CHECKPOINT: &str = "error";

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        _ => None,
    })
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_f64()))
}

/// A JSON list whose elements are decoded one by one; bad elements are skipped.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let items = match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => return Ok(Vec::new()),
        serde_json::Value::Array(items) => items,
        _ => return Err(D::Error::custom("expected a list")),
    };

    Ok(items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::debug!(error = %e, "skipping malformed feed entry");
                None
            }
        })
        .collect())
}

/// One event inside a session bundle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawErrorEvent {
    #[serde(default, deserialize_with = "lenient_string")]
    pub checkpoint: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub target: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub time_delta: Option<f64>,
}

impl RawErrorEvent {
    pub fn is_error(&self) -> bool {
        self.checkpoint.as_deref() == Some(ERROR_CHECKPOINT)
    }
}

/// One visitor session (a "bundle").
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default, deserialize_with = "lenient_string")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub time: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub events: Vec<RawErrorEvent>,
}

impl Session {
    /// Error-checkpoint events in arrival order.
    pub fn error_events(&self) -> impl Iterator<Item = &RawErrorEvent> {
        self.events.iter().filter(|e| e.is_error())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FeedShape {
    Bundles {
        #[serde(rename = "rumBundles", deserialize_with = "lenient_list")]
        rum_bundles: Vec<Session>,
    },
    Bare(#[serde(deserialize_with = "lenient_list")] Vec<Session>),
}

/// Decoded feed payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RumFeed {
    #[serde(rename = "rumBundles")]
    pub sessions: Vec<Session>,
}

impl RumFeed {
    pub fn from_json_str(text: &str) -> serde_json::Result<Self> {
        let shape: FeedShape = serde_json::from_str(text)?;
        Ok(shape.into())
    }

    pub fn from_reader<R: std::io::Read>(reader: R) -> serde_json::Result<Self> {
        let shape: FeedShape = serde_json::from_reader(reader)?;
        Ok(shape.into())
    }

    /// Load a saved feed dump from disk.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Total error-checkpoint events across all sessions.
    pub fn error_event_count(&self) -> usize {
        self.sessions.iter().map(|s| s.error_events().count()).sum()
    }
}

impl From<FeedShape> for RumFeed {
    fn from(shape: FeedShape) -> Self {
        match shape {
            FeedShape::Bundles { rum_bundles } => Self {
                sessions: rum_bundles,
            },
            FeedShape::Bare(sessions) => Self { sessions },
        }
    }
}

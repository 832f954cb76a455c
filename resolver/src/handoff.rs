//! Export of located error records as inputs for a downstream fix-proposal agent.

use crate::corpus::Corpus;
use crate::record::NormalizedErrorRecord;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// One agent input, built from a record with a known location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentInput {
    #[serde(skip)]
    pub key: String,
    #[serde(skip)]
    pub page_url: String,
    #[serde(skip)]
    pub index: usize,
    pub error_description: String,
    pub error_snippet: String,
    pub code_context: String,
}

/// Stable key for the record at `index` under `page_url`.
pub fn input_key(page_url: &str, index: usize) -> String {
    format!("error_{}_{}", blake3::hash(page_url.as_bytes()).to_hex(), index)
}

impl AgentInput {
    fn from_record(page_url: &str, index: usize, record: &NormalizedErrorRecord) -> Self {
        Self {
            key: input_key(page_url, index),
            page_url: page_url.to_string(),
            index,
            error_description: record.error_description.clone().unwrap_or_default(),
            error_snippet: record.snippet_text().unwrap_or_default(),
            code_context: record.context_text().unwrap_or_default(),
        }
    }
}

/// Inputs in corpus order plus per-reason skip counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentHandoff {
    pub inputs: Vec<AgentInput>,
    pub missing_location: usize,
    pub context_too_long: usize,
}

impl AgentHandoff {
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}

/// Serializes as a JSON object keyed by [`AgentInput::key`].
impl Serialize for AgentHandoff {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.inputs.len()))?;
        for input in &self.inputs {
            map.serialize_entry(&input.key, input)?;
        }
        map.end()
    }
}

/// Select records with line and column whose widest context line stays
/// under `max_context_tokens`. An absent token count is treated as zero.
pub fn agent_inputs(corpus: &Corpus, max_context_tokens: usize) -> AgentHandoff {
    let mut handoff = AgentHandoff::default();

    for (url, records) in corpus.iter() {
        for (index, record) in records.iter().enumerate() {
            if !record.has_location() {
                handoff.missing_location += 1;
                continue;
            }
            if record.max_tokens_length_in_code_context.unwrap_or(0) >= max_context_tokens {
                handoff.context_too_long += 1;
                continue;
            }
            handoff.inputs.push(AgentInput::from_record(url, index, record));
        }
    }

    tracing::debug!(
        inputs = handoff.inputs.len(),
        missing_location = handoff.missing_location,
        context_too_long = handoff.context_too_long,
        "agent inputs selected"
    );
    handoff
}

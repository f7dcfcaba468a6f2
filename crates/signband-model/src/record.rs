use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RecordError;

/// Stable identifier of an input record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Metadata carried by an image record.
///
/// The renderer only reads `pct_offset`. The rest is passed through untouched to
/// the host's detail view; fields nobody names land in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    /// Dominant colors as hex strings without the leading `#`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub colors: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,

    /// Explicit orbit phase offset; overrides `index / count` when present.
    #[serde(default, rename = "pctOffset", skip_serializing_if = "Option::is_none")]
    pub pct_offset: Option<f32>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One record from data acquisition. Immutable once received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputRecord {
    #[serde(rename = "_id", alias = "id")]
    pub id: RecordId,

    #[serde(flatten)]
    pub metadata: RecordMetadata,
}

impl InputRecord {
    pub fn new(id: impl Into<RecordId>) -> Self {
        Self {
            id: id.into(),
            metadata: RecordMetadata::default(),
        }
    }

    pub fn with_metadata(id: impl Into<RecordId>, metadata: RecordMetadata) -> Self {
        Self {
            id: id.into(),
            metadata,
        }
    }
}

/// Decodes a JSON array of records.
pub fn parse_batch(src: &str) -> Result<Vec<InputRecord>, RecordError> {
    let batch: Vec<InputRecord> = serde_json::from_str(src)?;
    if let Some(position) = batch.iter().position(|r| r.id.as_str().is_empty()) {
        return Err(RecordError::EmptyId { position });
    }
    Ok(batch)
}

/// Ordered, append-only record sequence.
///
/// Position in the sequence is the instance index and therefore the picking key,
/// so records are never reordered or removed.
#[derive(Debug, Clone, Default)]
pub struct RecordSequence {
    records: Vec<InputRecord>,
    seen: HashSet<RecordId>,
}

impl RecordSequence {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[inline]
    pub fn records(&self) -> &[InputRecord] {
        &self.records
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&InputRecord> {
        self.records.get(index)
    }

    /// Concatenates a batch and returns how many records were appended.
    ///
    /// A duplicate id is still appended: the index must line up with the batch
    /// the host sent, so records are addressed by index, not by id.
    pub fn append(&mut self, batch: Vec<InputRecord>) -> usize {
        let appended = batch.len();
        for record in batch {
            let index = self.records.len();
            if !self.seen.insert(record.id.clone()) {
                log::warn!("duplicate record id {} at index {index}", record.id);
            }
            self.records.push(record);
        }
        appended
    }

    /// Index one step after (or before) `from`, clamped to the ends.
    ///
    /// With no current index, steps onto the first (or last) record. `None`
    /// only for an empty sequence.
    pub fn step(&self, from: Option<usize>, forward: bool) -> Option<usize> {
        let last = self.records.len().checked_sub(1)?;
        let index = match from {
            Some(i) if forward => i.saturating_add(1).min(last),
            Some(i) => i.saturating_sub(1).min(last),
            None if forward => 0,
            None => last,
        };
        Some(index)
    }
}

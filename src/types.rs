//! Core data types shared across the crate.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Dense, zero-based identifier assigned to documents in insertion order.
///
/// Ids double as positions: the document with id `i` sits at position `i` in
/// both the vector index and the document store. They are never reused or
/// renumbered, including across a save/load cycle.
pub type DocumentId = usize;

/// Key/value metadata attached to a document.
///
/// Backed by a `BTreeMap` so serialization order is deterministic, which the
/// persistence codec relies on for byte-identical re-saves.
pub type Metadata = BTreeMap<String, MetadataValue>;

/// Metadata key under which the catalog stamps each document's own id.
pub const DOCUMENT_IDX_KEY: &str = "document_idx";

/// A loosely typed metadata value.
///
/// Serializes untagged, so metadata round-trips as natural JSON:
/// `true`, `7`, `1.5`, `"tag"`, `{"nested": 1}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    /// Boolean flag.
    Bool(bool),
    /// 64-bit signed integer.
    Integer(i64),
    /// 64-bit float.
    Float(f64),
    /// UTF-8 string.
    String(String),
    /// Nested mapping.
    Map(BTreeMap<String, MetadataValue>),
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<DocumentId> for MetadataValue {
    #[allow(clippy::cast_possible_wrap)]
    fn from(value: DocumentId) -> Self {
        Self::Integer(value as i64)
    }
}

/// A stored document: raw text plus its metadata, keyed by id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Dense id assigned at insertion.
    pub id: DocumentId,
    /// Original text the embedding was computed from.
    pub text: String,
    /// Caller-supplied metadata, plus the stamped [`DOCUMENT_IDX_KEY`] entry.
    pub metadata: Metadata,
}

impl Document {
    /// Creates a document from its parts.
    #[must_use]
    pub fn new(id: DocumentId, text: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            id,
            text: text.into(),
            metadata,
        }
    }
}

/// A single ranked search hit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// 1-based rank within the result list.
    pub rank: usize,
    /// Id of the matched document.
    pub id: DocumentId,
    /// Squared Euclidean distance from the query vector. Smaller is closer;
    /// the square root is never taken, so values are not metric distances.
    pub distance: f32,
    /// Text of the matched document.
    pub text: String,
    /// Metadata of the matched document.
    pub metadata: Metadata,
}

//! Error types for the semadex crate.

use std::path::PathBuf;
use thiserror::Error;

use crate::types::DocumentId;

/// Errors that can occur in catalog, index and persistence operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Embedding failed, or the embedder returned an unusable batch
    /// (wrong vector count, zero-width vectors).
    #[error("embedding failed: {0}")]
    Embedding(#[source] anyhow::Error),

    /// Vector width disagrees with the index dimensionality.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimensionality the index is fixed to.
        expected: usize,
        /// Width of the offending vector.
        actual: usize,
    },

    /// Metadata batch length disagrees with the text batch length.
    #[error("length mismatch: {texts} texts but {metadata} metadata entries")]
    LengthMismatch {
        /// Number of texts in the batch.
        texts: usize,
        /// Number of metadata mappings supplied for the batch.
        metadata: usize,
    },

    /// Search was issued against an index holding no vectors.
    ///
    /// The catalog never surfaces this: searching an empty catalog returns an
    /// empty result list instead.
    #[error("search on empty index")]
    EmptyIndex,

    /// Document id out of range.
    #[error("document not found: {0}")]
    NotFound(DocumentId),

    /// Persisted artifacts are missing, unreadable or mutually inconsistent.
    ///
    /// Loading is read-only, so the artifacts themselves are left untouched.
    #[error("corrupt state at {path}: {detail}")]
    CorruptState {
        /// Artifact or location where the inconsistency was detected.
        path: PathBuf,
        /// What failed validation.
        detail: String,
    },

    /// Index and store went out of sync. Signals a defect in the catalog
    /// logic rather than bad input; unreachable under correct operation.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Serialization of an artifact failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Filesystem operation failed while writing artifacts.
    #[error("persistence error at {path}: {source}")]
    Persistence {
        /// Path where the error occurred.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for semadex operations.
pub type Result<T> = std::result::Result<T, Error>;

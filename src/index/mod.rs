//! Vector index implementations.
//!
//! [`VectorIndex`] is the seam between the catalog and whatever structure
//! actually holds the vectors. The default is [`FlatIndex`], an exact
//! brute-force scanner; an approximate index (graph- or partition-based) can
//! be swapped in behind the same trait without touching the catalog or the
//! persistence codec, as long as its recall trade-offs are documented.

mod flat;

pub use flat::FlatIndex;

use crate::error::Result;

/// A fixed-dimensionality store of vectors supporting nearest-neighbor
/// search by squared Euclidean distance.
///
/// Positions are dense and assigned in insertion order; the catalog relies on
/// position `i` here lining up with document id `i` in its store.
pub trait VectorIndex: Send + Sync {
    /// Creates an empty index fixed to `dimension`.
    fn create(dimension: usize) -> Self
    where
        Self: Sized;

    /// Appends `vectors` in order, assigning them the next positions.
    ///
    /// # Errors
    ///
    /// Fails with [`crate::Error::DimensionMismatch`] if any vector's width
    /// differs from the index dimensionality. The batch is all-or-nothing:
    /// on failure, nothing is appended.
    fn add(&mut self, vectors: Vec<Vec<f32>>) -> Result<()>;

    /// Returns the positions and squared Euclidean distances of the `k`
    /// stored vectors closest to `query`, ascending by distance, ties broken
    /// by lower position. `k` larger than the stored count is clamped.
    ///
    /// # Errors
    ///
    /// Fails with [`crate::Error::DimensionMismatch`] if the query width
    /// differs from the index dimensionality, and with
    /// [`crate::Error::EmptyIndex`] if no vectors are stored.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>>;

    /// The dimensionality every stored vector and query must have.
    fn dimension(&self) -> usize;

    /// Number of stored vectors.
    fn len(&self) -> usize;

    /// Returns `true` if no vectors are stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Encodes the index into an opaque binary blob.
    ///
    /// # Errors
    ///
    /// Fails with [`crate::Error::Serialization`] if encoding fails.
    fn to_bytes(&self) -> Result<Vec<u8>>;

    /// Decodes an index from a blob produced by [`VectorIndex::to_bytes`].
    ///
    /// # Errors
    ///
    /// Fails with [`crate::Error::Serialization`] if the blob does not parse
    /// or is internally inconsistent.
    fn from_bytes(bytes: &[u8]) -> Result<Self>
    where
        Self: Sized;
}

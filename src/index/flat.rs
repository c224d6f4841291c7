//! Exact brute-force vector index.

use core::fmt;

use ordered_float::OrderedFloat;
use rayon::prelude::*;
use rkyv::rancor::Error as RkyvError;
use rkyv::{from_bytes, to_bytes};

use super::VectorIndex;
use crate::error::{Error, Result};

/// Serialized form of a [`FlatIndex`].
#[derive(Debug, rkyv::Archive, rkyv::Deserialize, rkyv::Serialize)]
#[rkyv(derive(Debug))]
struct IndexBlob {
    dimension: u32,
    count: u32,
    vectors: Vec<f32>,
}

/// Exact nearest-neighbor index backed by a brute-force scan.
///
/// Vectors live row-major in one contiguous buffer, so a search streams
/// through memory once, comparing the query against every stored vector in
/// parallel. Cost is O(n * dimension) per query. The scan is exact; swap in
/// an approximate [`VectorIndex`] implementation once collections outgrow
/// what a full scan sustains.
///
/// Scores are squared Euclidean distances. The square root is monotonic, so
/// skipping it leaves the ranking identical while saving a sqrt per vector.
pub struct FlatIndex {
    dimension: usize,
    vectors: Vec<f32>,
}

impl fmt::Debug for FlatIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlatIndex")
            .field("dimension", &self.dimension)
            .field("len", &self.len())
            .finish()
    }
}

impl FlatIndex {
    /// Creates an empty index fixed to `dimension`.
    #[must_use]
    pub const fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: Vec::new(),
        }
    }

    /// Returns the vector stored at `position`, if any.
    #[must_use]
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        if self.dimension == 0 {
            return None;
        }
        let start = position.checked_mul(self.dimension)?;
        let end = start.checked_add(self.dimension)?;
        self.vectors.get(start..end)
    }
}

/// Squared Euclidean distance between two equal-width vectors.
fn squared_distance(a: &[f32], b: &[f32]) -> f32 {
    let mut sum = 0.0_f32;
    for (lhs, rhs) in a.iter().zip(b) {
        let delta = lhs - rhs;
        sum += delta * delta;
    }
    sum
}

impl VectorIndex for FlatIndex {
    fn create(dimension: usize) -> Self {
        Self::new(dimension)
    }

    fn add(&mut self, vectors: Vec<Vec<f32>>) -> Result<()> {
        // Validate the whole batch before touching the buffer, so a bad
        // vector in the middle cannot leave a partial append behind.
        for vector in &vectors {
            if vector.len() != self.dimension {
                return Err(Error::DimensionMismatch {
                    expected: self.dimension,
                    actual: vector.len(),
                });
            }
        }
        self.vectors.reserve(vectors.len() * self.dimension);
        for vector in vectors {
            self.vectors.extend_from_slice(&vector);
        }
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        if query.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if self.vectors.is_empty() {
            return Err(Error::EmptyIndex);
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .par_chunks_exact(self.dimension)
            .enumerate()
            .map(|(position, row)| (position, squared_distance(query, row)))
            .collect();

        // Sorting by (distance, position) makes equal-distance results come
        // out in insertion order, deterministically.
        scored.par_sort_unstable_by_key(|&(position, distance)| (OrderedFloat(distance), position));
        scored.truncate(scored.len().min(k));
        Ok(scored)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.vectors.len() / self.dimension
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn to_bytes(&self) -> Result<Vec<u8>> {
        let blob = IndexBlob {
            dimension: self.dimension as u32,
            count: self.len() as u32,
            vectors: self.vectors.clone(),
        };
        let bytes =
            to_bytes::<RkyvError>(&blob).map_err(|e| Error::Serialization(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let blob = from_bytes::<IndexBlob, RkyvError>(bytes)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        let dimension = blob.dimension as usize;
        let count = blob.count as usize;
        if blob.vectors.len() != dimension * count {
            return Err(Error::Serialization(format!(
                "index blob claims {count} vectors of width {dimension} but holds {} values",
                blob.vectors.len()
            )));
        }
        Ok(Self {
            dimension,
            vectors: blob.vectors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_search() {
        let mut index = FlatIndex::new(2);
        index
            .add(vec![vec![0.0, 0.0], vec![3.0, 4.0], vec![1.0, 1.0]])
            .unwrap();
        assert_eq!(index.len(), 3);

        let hits = index.search(&[0.0, 0.0], 2).unwrap();
        assert_eq!(hits, vec![(0, 0.0), (2, 2.0)]);
    }

    #[test]
    fn distances_are_squared() {
        let mut index = FlatIndex::new(2);
        index.add(vec![vec![3.0, 4.0]]).unwrap();

        // A 3-4-5 triangle: squared distance is 25, not 5.
        let hits = index.search(&[0.0, 0.0], 1).unwrap();
        assert!((hits[0].1 - 25.0).abs() < f32::EPSILON);
    }

    #[test]
    fn ties_break_by_insertion_order() {
        let mut index = FlatIndex::new(2);
        index
            .add(vec![vec![1.0, 0.0], vec![1.0, 0.0], vec![1.0, 0.0]])
            .unwrap();

        let hits = index.search(&[0.0, 0.0], 3).unwrap();
        let positions: Vec<usize> = hits.iter().map(|&(position, _)| position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[test]
    fn k_clamps_to_stored_count() {
        let mut index = FlatIndex::new(1);
        index.add(vec![vec![1.0], vec![2.0]]).unwrap();

        let hits = index.search(&[0.0], 10).unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn search_on_empty_index_fails() {
        let index = FlatIndex::new(4);
        assert!(matches!(index.search(&[0.0; 4], 1), Err(Error::EmptyIndex)));
    }

    #[test]
    fn add_rejects_mismatched_widths_without_appending() {
        let mut index = FlatIndex::new(2);
        let result = index.add(vec![vec![1.0, 2.0], vec![1.0, 2.0, 3.0]]);
        assert!(matches!(
            result,
            Err(Error::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
        assert_eq!(index.len(), 0);
    }

    #[test]
    fn search_rejects_mismatched_query_width() {
        let mut index = FlatIndex::new(2);
        index.add(vec![vec![1.0, 2.0]]).unwrap();
        assert!(matches!(
            index.search(&[1.0], 1),
            Err(Error::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn blob_round_trip_is_deterministic() {
        let mut index = FlatIndex::new(3);
        index
            .add(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]])
            .unwrap();

        let bytes = index.to_bytes().unwrap();
        let restored = FlatIndex::from_bytes(&bytes).unwrap();

        assert_eq!(restored.dimension(), 3);
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.vector(1), Some(&[4.0, 5.0, 6.0][..]));
        assert_eq!(restored.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn empty_index_round_trips() {
        let index = FlatIndex::new(8);
        let bytes = index.to_bytes().unwrap();
        let restored = FlatIndex::from_bytes(&bytes).unwrap();
        assert_eq!(restored.dimension(), 8);
        assert!(restored.is_empty());
    }

    #[test]
    fn from_bytes_rejects_inconsistent_blob() {
        let blob = IndexBlob {
            dimension: 3,
            count: 5,
            vectors: vec![0.0; 6],
        };
        let bytes = to_bytes::<RkyvError>(&blob).unwrap();
        assert!(matches!(
            FlatIndex::from_bytes(&bytes),
            Err(Error::Serialization(_))
        ));
    }

    #[test]
    fn from_bytes_rejects_garbage() {
        assert!(FlatIndex::from_bytes(&[1, 2, 3]).is_err());
    }
}

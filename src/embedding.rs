//! The embedding capability consumed by the catalog.
//!
//! The catalog never computes vectors itself; every insertion and search is
//! handed an [`Embedder`] that turns text into vectors. Anything that
//! satisfies the contract works: a remote inference API, a local model, or a
//! deterministic hash for tests.

use core::future::Future;

/// Converts batches of texts into vector representations.
///
/// Implementations must be deterministic for a given configuration (the same
/// text always embeds to the same vector) and must produce vectors of one
/// fixed, non-zero width. The catalog validates both on every call: a batch
/// with the wrong vector count or zero-width vectors is rejected before
/// anything is stored.
///
/// # Example
///
/// ```rust
/// use semadex::Embedder;
///
/// struct BagOfBytes;
///
/// impl Embedder for BagOfBytes {
///     fn id(&self) -> &str {
///         "bag-of-bytes-4"
///     }
///
///     async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
///         Ok(texts
///             .iter()
///             .map(|text| {
///                 let mut vector = vec![0.0_f32; 4];
///                 for byte in text.bytes() {
///                     vector[usize::from(byte) % 4] += 1.0;
///                 }
///                 vector
///             })
///             .collect())
///     }
/// }
///
/// # tokio_test::block_on(async {
/// let embedder = BagOfBytes;
/// let vectors = embedder.embed(&["abc".to_owned()]).await.unwrap();
/// assert_eq!(vectors.len(), 1);
/// assert_eq!(vectors[0].len(), 4);
/// # });
/// ```
pub trait Embedder: Send + Sync {
    /// Identifier for this embedder configuration.
    ///
    /// Persisted alongside a saved catalog so that an equivalent embedder can
    /// be reconstructed when the catalog is loaded. Vectors from different
    /// ids are not comparable; loading a catalog and querying it through an
    /// embedder with a different id gives meaningless distances.
    fn id(&self) -> &str;

    /// Embeds every text in `texts`, returning one vector per input in the
    /// same order.
    fn embed(&self, texts: &[String]) -> impl Future<Output = anyhow::Result<Vec<Vec<f32>>>> + Send;
}

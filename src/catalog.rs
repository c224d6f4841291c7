//! The catalog: a vector index and a document store composed transactionally.

use std::fmt;
use std::path::Path;

use parking_lot::RwLock;

use crate::embedding::Embedder;
use crate::error::{Error, Result};
use crate::index::{FlatIndex, VectorIndex};
use crate::persistence::{self, CatalogSnapshot};
use crate::store::DocumentStore;
use crate::types::{DOCUMENT_IDX_KEY, Document, DocumentId, Metadata, MetadataValue, SearchResult};

/// In-memory vector search database pairing a vector index with a document
/// store.
///
/// All mutation goes through [`Catalog::add_documents`], which keeps the two
/// halves length-synchronized transactionally; neither half is ever handed
/// out mutably. Reads take a shared lock and run concurrently; a mutation
/// takes the exclusive lock. Embedding happens before any lock is taken,
/// since model inference can take arbitrarily long while the locked section
/// is synchronous and brief. Cancelling `add_documents` at its await point
/// therefore leaves the catalog exactly as it was, with no ids consumed.
///
/// The dimensionality is not chosen up front: the first successful insertion
/// fixes it from the width of the embedded vectors, and every later batch
/// and query must match it.
///
/// The index implementation is a type parameter so an approximate index can
/// replace the default exact [`FlatIndex`] scan without touching callers:
///
/// ```rust
/// use semadex::Catalog;
///
/// let catalog: Catalog = Catalog::new();
/// assert_eq!(catalog.total_count(), 0);
/// ```
pub struct Catalog<I: VectorIndex = FlatIndex> {
    inner: RwLock<CatalogInner<I>>,
}

struct CatalogInner<I> {
    /// `None` until the first successful insertion fixes the dimensionality.
    index: Option<I>,
    store: DocumentStore,
    /// Id of the embedder that last populated this catalog.
    embedder_id: Option<String>,
}

impl<I: VectorIndex> fmt::Debug for Catalog<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("Catalog")
            .field("count", &inner.store.len())
            .field("dimension", &inner.index.as_ref().map(I::dimension))
            .field("embedder_id", &inner.embedder_id)
            .finish()
    }
}

impl<I: VectorIndex> Default for Catalog<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: VectorIndex> Catalog<I> {
    /// Creates an empty catalog with no fixed dimensionality.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(CatalogInner {
                index: None,
                store: DocumentStore::new(),
                embedder_id: None,
            }),
        }
    }

    /// Embeds `texts` and inserts them as documents, returning the assigned
    /// ids in input order.
    ///
    /// `metadata`, when given, must supply one mapping per text. Each stored
    /// document additionally carries its own id under
    /// [`DOCUMENT_IDX_KEY`](crate::types::DOCUMENT_IDX_KEY), overwriting any
    /// caller-supplied value for that key.
    ///
    /// The batch is all-or-nothing: either every document is inserted and
    /// searchable, or the catalog is unchanged. An empty `texts` batch is a
    /// no-op and does not invoke the embedder.
    ///
    /// # Errors
    ///
    /// Fails with [`crate::Error::LengthMismatch`] if `metadata` and `texts`
    /// disagree in length, [`crate::Error::Embedding`] if the embedder fails
    /// or returns an unusable batch, and
    /// [`crate::Error::DimensionMismatch`] if the embedded width disagrees
    /// with the dimensionality fixed by an earlier insertion.
    pub async fn add_documents<E: Embedder>(
        &self,
        texts: Vec<String>,
        metadata: Option<Vec<Metadata>>,
        embedder: &E,
    ) -> Result<Vec<DocumentId>> {
        if let Some(metadata) = &metadata {
            if metadata.len() != texts.len() {
                return Err(Error::LengthMismatch {
                    texts: texts.len(),
                    metadata: metadata.len(),
                });
            }
        }
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let embeddings = embedder.embed(&texts).await.map_err(Error::Embedding)?;
        if embeddings.len() != texts.len() {
            return Err(Error::Embedding(anyhow::anyhow!(
                "embedder returned {} vectors for {} texts",
                embeddings.len(),
                texts.len()
            )));
        }
        let width = embeddings.first().map_or(0, Vec::len);
        if width == 0 {
            return Err(Error::Embedding(anyhow::anyhow!(
                "embedder returned zero-width vectors"
            )));
        }

        let metadata = metadata.unwrap_or_else(|| vec![Metadata::new(); texts.len()]);

        let mut guard = self.inner.write();
        let inner = &mut *guard;
        let created = inner.index.is_none();

        let base = inner.store.len();
        let mut ids = Vec::with_capacity(texts.len());
        for (text, mut meta) in texts.into_iter().zip(metadata) {
            let id = inner.store.len();
            meta.insert(DOCUMENT_IDX_KEY.to_owned(), MetadataValue::from(id));
            inner.store.append(Document::new(id, text, meta));
            ids.push(id);
        }

        let added = {
            let index = inner.index.get_or_insert_with(|| I::create(width));
            index.add(embeddings)
        };
        if let Err(err) = added {
            // Roll the store back so the two halves stay in lockstep. A
            // failed first batch also leaves the dimensionality unfixed.
            inner.store.truncate(base);
            if created {
                inner.index = None;
            }
            return Err(err);
        }

        let index_len = inner.index.as_ref().map_or(0, I::len);
        if index_len != inner.store.len() {
            return Err(Error::InvariantViolation(format!(
                "index holds {index_len} vectors but store holds {} documents",
                inner.store.len()
            )));
        }

        inner.embedder_id = Some(embedder.id().to_owned());

        tracing::debug!(added = ids.len(), total = inner.store.len(), "added documents");
        Ok(ids)
    }

    /// Embeds `query` and returns the `k` closest documents, ranked by
    /// ascending squared Euclidean distance, ties broken by lower id.
    ///
    /// `k` larger than the stored count is clamped. Searching an empty
    /// catalog returns an empty list without invoking the embedder.
    ///
    /// # Errors
    ///
    /// Fails with [`crate::Error::Embedding`] if the embedder fails and
    /// [`crate::Error::DimensionMismatch`] if the embedded query width
    /// disagrees with the catalog dimensionality.
    pub async fn search<E: Embedder>(
        &self,
        query: &str,
        k: usize,
        embedder: &E,
    ) -> Result<Vec<SearchResult>> {
        if self.is_empty() {
            return Ok(Vec::new());
        }

        let texts = [query.to_owned()];
        let mut embeddings = embedder.embed(&texts).await.map_err(Error::Embedding)?;
        if embeddings.len() != 1 {
            return Err(Error::Embedding(anyhow::anyhow!(
                "embedder returned {} vectors for one query",
                embeddings.len()
            )));
        }
        let query_vector = embeddings.swap_remove(0);

        let inner = self.inner.read();
        let Some(index) = inner.index.as_ref() else {
            return Ok(Vec::new());
        };
        let hits = index.search(&query_vector, k)?;

        let mut results = Vec::with_capacity(hits.len());
        for (rank, (position, distance)) in hits.into_iter().enumerate() {
            let document = inner.store.get(position).map_err(|_| {
                Error::InvariantViolation(format!(
                    "index returned position {position} outside the store"
                ))
            })?;
            results.push(SearchResult {
                rank: rank + 1,
                id: document.id,
                distance,
                text: document.text.clone(),
                metadata: document.metadata.clone(),
            });
        }

        tracing::debug!(k, hits = results.len(), "search complete");
        Ok(results)
    }

    /// Returns a copy of the stored document with the given id.
    ///
    /// # Errors
    ///
    /// Fails with [`crate::Error::NotFound`] if no document has that id.
    pub fn document(&self, id: DocumentId) -> Result<Document> {
        self.inner.read().store.get(id).cloned()
    }

    /// Number of documents in the catalog.
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.inner.read().store.len()
    }

    /// Returns `true` if the catalog holds no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_count() == 0
    }

    /// The fixed vector dimensionality, or `None` before the first
    /// successful insertion.
    #[must_use]
    pub fn dimension(&self) -> Option<usize> {
        self.inner.read().index.as_ref().map(I::dimension)
    }

    /// Id of the embedder that last populated this catalog, or `None` if
    /// nothing has been inserted yet.
    #[must_use]
    pub fn embedder_id(&self) -> Option<String> {
        self.inner.read().embedder_id.clone()
    }

    /// Saves the catalog into the directory at `location`, creating it if
    /// needed. See the [`persistence`](crate::persistence) module for the
    /// artifact layout.
    ///
    /// # Errors
    ///
    /// Fails with [`crate::Error::Persistence`] on filesystem errors and
    /// [`crate::Error::Serialization`] if an artifact cannot be encoded.
    pub fn save(&self, location: impl AsRef<Path>) -> Result<()> {
        persistence::save(self, location.as_ref())
    }

    /// Loads a catalog previously written by [`Catalog::save`].
    ///
    /// # Errors
    ///
    /// Fails with [`crate::Error::CorruptState`] if artifacts are missing,
    /// unreadable or mutually inconsistent.
    pub fn load(location: impl AsRef<Path>) -> Result<Self> {
        persistence::load(location.as_ref())
    }

    /// Captures everything persistence needs under a single read lock.
    pub(crate) fn snapshot(&self) -> Result<CatalogSnapshot> {
        let inner = self.inner.read();
        let index_bytes = match inner.index.as_ref() {
            Some(index) => index.to_bytes()?,
            None => Vec::new(),
        };
        Ok(CatalogSnapshot {
            index_bytes,
            dimension: inner.index.as_ref().map(I::dimension),
            documents: inner.store.documents().to_vec(),
            embedder_id: inner.embedder_id.clone().unwrap_or_default(),
        })
    }

    /// Rebuilds a catalog from loaded parts. The caller is responsible for
    /// having validated that index and documents agree in length.
    pub(crate) fn from_parts(
        index: Option<I>,
        documents: Vec<Document>,
        embedder_id: Option<String>,
    ) -> Self {
        let mut store = DocumentStore::new();
        for document in documents {
            store.append(document);
        }
        Self {
            inner: RwLock::new(CatalogInner {
                index,
                store,
                embedder_id,
            }),
        }
    }
}

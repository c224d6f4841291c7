//! Append-only document storage.

use crate::error::{Error, Result};
use crate::types::{Document, DocumentId};

/// Append-only array of documents, keyed by position.
///
/// The store is the text half of a catalog: position `i` holds the document
/// whose vector sits at position `i` in the index. Keeping the two in
/// lockstep is the catalog's job; the store itself accepts any append.
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: Vec<Document>,
}

impl DocumentStore {
    /// Creates an empty store.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            documents: Vec::new(),
        }
    }

    /// Appends `document`; its position is the store length before the call.
    pub fn append(&mut self, document: Document) {
        self.documents.push(document);
    }

    /// Returns the document with the given id.
    ///
    /// # Errors
    ///
    /// Fails with [`crate::Error::NotFound`] if `id` is out of range.
    pub fn get(&self, id: DocumentId) -> Result<&Document> {
        self.documents.get(id).ok_or(Error::NotFound(id))
    }

    /// Number of stored documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Returns `true` if the store holds no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// All documents in insertion order.
    #[must_use]
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Drops every document at position `len` or later.
    ///
    /// Only used to roll back a batch whose index append failed; the public
    /// surface of the crate never removes documents.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.documents.truncate(len);
    }
}

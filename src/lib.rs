//! Embedded vector similarity search with a parallel document store and
//! durable persistence.
//!
//! `semadex` pairs an exact in-memory vector index with an append-only
//! document store behind a single [`Catalog`]:
//!
//! - [`Catalog::add_documents`] embeds raw texts through an injected
//!   [`Embedder`] and inserts them under dense, stable ids.
//! - [`Catalog::search`] embeds a query and returns ranked matches by
//!   squared Euclidean distance.
//! - [`Catalog::save`] and [`Catalog::load`] round-trip the whole catalog
//!   through a directory of inspectable artifacts.
//!
//! The default index is [`FlatIndex`], a brute-force scanner: exact,
//! parallel and simple, the right trade-off up to tens of thousands of
//! documents. The [`VectorIndex`] trait is the seam for swapping in an
//! approximate index once collections outgrow a full scan.
//!
//! # Example
//!
//! ```rust
//! use semadex::{Catalog, Embedder};
//!
//! struct BagOfBytes;
//!
//! impl Embedder for BagOfBytes {
//!     fn id(&self) -> &str {
//!         "bag-of-bytes-4"
//!     }
//!
//!     async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
//!         Ok(texts
//!             .iter()
//!             .map(|text| {
//!                 let mut vector = vec![0.0_f32; 4];
//!                 for byte in text.bytes() {
//!                     vector[usize::from(byte) % 4] += 1.0;
//!                 }
//!                 vector
//!             })
//!             .collect())
//!     }
//! }
//!
//! # tokio_test::block_on(async {
//! let catalog: Catalog = Catalog::new();
//! let embedder = BagOfBytes;
//!
//! catalog
//!     .add_documents(
//!         vec![
//!             "the quick brown fox".to_owned(),
//!             "jumped over the lazy dog".to_owned(),
//!         ],
//!         None,
//!         &embedder,
//!     )
//!     .await
//!     .unwrap();
//!
//! let results = catalog.search("quick fox", 1, &embedder).await.unwrap();
//! assert_eq!(results[0].id, 0);
//! assert_eq!(results[0].rank, 1);
//! # });
//! ```

pub mod catalog;
pub mod embedding;
pub mod error;
pub mod index;
pub mod persistence;
pub mod store;
pub mod types;

pub use catalog::Catalog;
pub use embedding::Embedder;
pub use error::{Error, Result};
pub use index::{FlatIndex, VectorIndex};
pub use store::DocumentStore;
pub use types::{Document, DocumentId, Metadata, MetadataValue, SearchResult};

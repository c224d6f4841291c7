//! Directory-based persistence for catalogs.
//!
//! A saved catalog is a directory of five artifacts:
//!
//! - [`INDEX_FILE`]: the vector index as an opaque binary blob, format owned
//!   by the index implementation. Empty when the catalog holds no documents.
//! - [`DOCUMENTS_FILE`]: ordered JSON array of document texts.
//! - [`METADATA_FILE`]: ordered JSON array of per-document metadata.
//! - [`EMBEDDER_ID_FILE`]: plain-text id of the embedder the catalog was
//!   built with, so an equivalent embedder can be reconstructed on load.
//! - [`MANIFEST_FILE`]: format version, document count and dimensionality.
//!
//! Each artifact is written to a temporary file and renamed into place. The
//! manifest acts as the commit marker: a save removes any previous manifest
//! before replacing data artifacts and writes the new one last, so a save
//! interrupted partway, whether fresh or overwriting, leaves a directory
//! that refuses to load rather than a readable mix of old and new
//! artifacts. An interrupted overwrite can lose the previous save; callers
//! that need rollback save into a fresh directory instead. The JSON
//! artifacts are pretty-printed with deterministically ordered keys, which
//! makes a save/load/save cycle byte-identical and the files diffable.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::index::VectorIndex;
use crate::types::{Document, Metadata};

/// Binary vector-index blob.
pub const INDEX_FILE: &str = "index.bin";
/// Ordered JSON array of document texts.
pub const DOCUMENTS_FILE: &str = "documents.json";
/// Ordered JSON array of per-document metadata mappings.
pub const METADATA_FILE: &str = "metadata.json";
/// Plain-text identifier of the embedder the catalog was built with.
pub const EMBEDDER_ID_FILE: &str = "embedder_id.txt";
/// Save manifest; removed first, rewritten last, required by [`load`].
pub const MANIFEST_FILE: &str = "manifest.json";

const FORMAT_VERSION: u32 = 1;

/// Everything [`save`] persists, captured under one catalog read lock.
pub(crate) struct CatalogSnapshot {
    pub(crate) index_bytes: Vec<u8>,
    pub(crate) dimension: Option<usize>,
    pub(crate) documents: Vec<Document>,
    pub(crate) embedder_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    version: u32,
    count: usize,
    dimension: Option<usize>,
}

/// Saves `catalog` into the directory at `location`, creating it if needed.
///
/// Overwrites any previous save at the same location, invalidating its
/// manifest up front so an interruption cannot leave the old marker over a
/// mix of artifacts. The catalog itself is untouched; concurrent reads keep
/// working while the snapshot is written out.
///
/// # Errors
///
/// Fails with [`crate::Error::Persistence`] on filesystem errors and
/// [`crate::Error::Serialization`] if an artifact cannot be encoded. A
/// failed save may leave partial artifacts behind, and an interrupted
/// overwrite may have consumed the previous manifest, but a location
/// without a fresh manifest never loads.
pub fn save<I: VectorIndex>(catalog: &Catalog<I>, location: &Path) -> Result<()> {
    fs::create_dir_all(location).map_err(|source| Error::Persistence {
        path: location.to_path_buf(),
        source,
    })?;

    let snapshot = catalog.snapshot()?;
    let texts: Vec<&str> = snapshot
        .documents
        .iter()
        .map(|doc| doc.text.as_str())
        .collect();
    let metadata: Vec<&Metadata> = snapshot.documents.iter().map(|doc| &doc.metadata).collect();
    let manifest = Manifest {
        version: FORMAT_VERSION,
        count: snapshot.documents.len(),
        dimension: snapshot.dimension,
    };
    let documents_json = to_json(&texts)?;
    let metadata_json = to_json(&metadata)?;
    let manifest_json = to_json(&manifest)?;

    // Consume any previous commit marker before replacing data artifacts:
    // until the new manifest lands, the directory refuses to load, so a
    // stale marker can never sit over a mix of old and new artifacts.
    let manifest_path = location.join(MANIFEST_FILE);
    match fs::remove_file(&manifest_path) {
        Ok(()) => {}
        Err(source) if source.kind() == io::ErrorKind::NotFound => {}
        Err(source) => {
            return Err(Error::Persistence {
                path: manifest_path,
                source,
            });
        }
    }

    write_atomic(&location.join(INDEX_FILE), &snapshot.index_bytes)?;
    write_atomic(&location.join(DOCUMENTS_FILE), &documents_json)?;
    write_atomic(&location.join(METADATA_FILE), &metadata_json)?;
    write_atomic(
        &location.join(EMBEDDER_ID_FILE),
        snapshot.embedder_id.as_bytes(),
    )?;
    write_atomic(&manifest_path, &manifest_json)?;

    tracing::info!(path = %location.display(), count = manifest.count, "saved catalog");
    Ok(())
}

/// Loads a catalog from the directory at `location`.
///
/// Loading is read-only and validates the artifacts against each other
/// before constructing anything.
///
/// # Errors
///
/// Fails with [`crate::Error::CorruptState`] if any artifact is missing or
/// unparseable, or if the artifacts disagree about count or dimensionality.
pub fn load<I: VectorIndex>(location: &Path) -> Result<Catalog<I>> {
    let manifest_path = location.join(MANIFEST_FILE);
    let manifest: Manifest = read_json(&manifest_path)?;
    if manifest.version != FORMAT_VERSION {
        return Err(corrupt(
            &manifest_path,
            format!("unsupported format version {}", manifest.version),
        ));
    }

    let texts: Vec<String> = read_json(&location.join(DOCUMENTS_FILE))?;
    let metadata: Vec<Metadata> = read_json(&location.join(METADATA_FILE))?;
    let embedder_id = read_string(&location.join(EMBEDDER_ID_FILE))?;
    let index_bytes = read_bytes(&location.join(INDEX_FILE))?;

    if texts.len() != metadata.len() {
        return Err(corrupt(
            location,
            format!(
                "{} documents but {} metadata entries",
                texts.len(),
                metadata.len()
            ),
        ));
    }
    if texts.len() != manifest.count {
        return Err(corrupt(
            location,
            format!(
                "manifest records {} documents but artifacts hold {}",
                manifest.count,
                texts.len()
            ),
        ));
    }

    let index = if index_bytes.is_empty() {
        None
    } else {
        let index = I::from_bytes(&index_bytes)
            .map_err(|err| corrupt(&location.join(INDEX_FILE), err.to_string()))?;
        Some(index)
    };

    let index_len = index.as_ref().map_or(0, I::len);
    if index_len != texts.len() {
        return Err(corrupt(
            location,
            format!(
                "index holds {index_len} vectors but store holds {} documents",
                texts.len()
            ),
        ));
    }
    if manifest.dimension != index.as_ref().map(I::dimension) {
        return Err(corrupt(
            &manifest_path,
            "manifest dimension disagrees with the index blob".to_owned(),
        ));
    }

    let documents = texts
        .into_iter()
        .zip(metadata)
        .enumerate()
        .map(|(id, (text, meta))| Document::new(id, text, meta))
        .collect();
    let embedder_id = (!embedder_id.is_empty()).then_some(embedder_id);

    tracing::info!(path = %location.display(), count = manifest.count, "loaded catalog");
    Ok(Catalog::from_parts(index, documents, embedder_id))
}

fn corrupt(path: &Path, detail: String) -> Error {
    Error::CorruptState {
        path: path.to_path_buf(),
        detail,
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(value).map_err(|e| Error::Serialization(e.to_string()))
}

/// Writes `bytes` to a sibling temp file, then renames it over `path`.
/// Readers of a previous save never observe a half-written artifact.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, bytes)
        .and_then(|()| fs::rename(&tmp, path))
        .map_err(|source| Error::Persistence {
            path: path.to_path_buf(),
            source,
        })
}

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|err| corrupt(path, err.to_string()))
}

fn read_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|err| corrupt(path, err.to_string()))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = read_bytes(path)?;
    serde_json::from_slice(&bytes).map_err(|err| corrupt(path, err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::Embedder;
    use crate::types::MetadataValue;
    use tempfile::tempdir;

    struct MockEmbedder {
        dimension: usize,
    }

    impl MockEmbedder {
        fn new(dimension: usize) -> Self {
            Self { dimension }
        }
    }

    impl Embedder for MockEmbedder {
        fn id(&self) -> &str {
            "mock"
        }

        #[allow(clippy::cast_precision_loss)]
        async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|text| {
                    (0..self.dimension)
                        .map(|i| ((text.len() + i) % 10) as f32 / 10.0)
                        .collect()
                })
                .collect())
        }
    }

    async fn sample_catalog(embedder: &MockEmbedder) -> Catalog {
        let catalog: Catalog = Catalog::new();
        let metadata: Vec<Metadata> = (0..3)
            .map(|i| {
                let mut meta = Metadata::new();
                meta.insert("source".to_owned(), MetadataValue::from(format!("doc-{i}")));
                meta
            })
            .collect();
        catalog
            .add_documents(
                vec![
                    "alpha".to_owned(),
                    "beta trail".to_owned(),
                    "gamma ray burst".to_owned(),
                ],
                Some(metadata),
                embedder,
            )
            .await
            .unwrap();
        catalog
    }

    const ALL_ARTIFACTS: [&str; 5] = [
        INDEX_FILE,
        DOCUMENTS_FILE,
        METADATA_FILE,
        EMBEDDER_ID_FILE,
        MANIFEST_FILE,
    ];

    #[tokio::test]
    async fn round_trip_preserves_documents_and_search_results() {
        let embedder = MockEmbedder::new(6);
        let catalog = sample_catalog(&embedder).await;
        let dir = tempdir().unwrap();

        catalog.save(dir.path()).unwrap();
        let restored: Catalog = Catalog::load(dir.path()).unwrap();

        assert_eq!(restored.total_count(), catalog.total_count());
        assert_eq!(restored.dimension(), catalog.dimension());
        assert_eq!(restored.embedder_id(), Some("mock".to_owned()));
        for id in 0..catalog.total_count() {
            assert_eq!(
                restored.document(id).unwrap(),
                catalog.document(id).unwrap()
            );
        }

        let before = catalog.search("beta", 3, &embedder).await.unwrap();
        let after = restored.search("beta", 3, &embedder).await.unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn resave_is_byte_identical() {
        let embedder = MockEmbedder::new(6);
        let catalog = sample_catalog(&embedder).await;
        let first = tempdir().unwrap();
        let second = tempdir().unwrap();

        catalog.save(first.path()).unwrap();
        let restored: Catalog = Catalog::load(first.path()).unwrap();
        restored.save(second.path()).unwrap();

        for name in ALL_ARTIFACTS {
            let a = fs::read(first.path().join(name)).unwrap();
            let b = fs::read(second.path().join(name)).unwrap();
            assert_eq!(a, b, "{name} differs after a load/save cycle");
        }
    }

    #[tokio::test]
    async fn empty_catalog_round_trips() {
        let catalog: Catalog = Catalog::new();
        let dir = tempdir().unwrap();
        catalog.save(dir.path()).unwrap();

        let restored: Catalog = Catalog::load(dir.path()).unwrap();
        assert_eq!(restored.total_count(), 0);
        assert_eq!(restored.dimension(), None);
        assert_eq!(restored.embedder_id(), None);

        let results = restored
            .search("anything", 3, &MockEmbedder::new(6))
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn save_leaves_only_the_five_artifacts() {
        let embedder = MockEmbedder::new(6);
        let catalog = sample_catalog(&embedder).await;
        let dir = tempdir().unwrap();
        catalog.save(dir.path()).unwrap();

        let mut names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        let mut expected = ALL_ARTIFACTS.to_vec();
        expected.sort_unstable();
        assert_eq!(names, expected);
    }

    #[tokio::test]
    async fn saved_artifacts_are_inspectable() {
        let embedder = MockEmbedder::new(6);
        let catalog = sample_catalog(&embedder).await;
        let dir = tempdir().unwrap();
        catalog.save(dir.path()).unwrap();

        let texts: Vec<String> =
            serde_json::from_slice(&fs::read(dir.path().join(DOCUMENTS_FILE)).unwrap()).unwrap();
        assert_eq!(texts, vec!["alpha", "beta trail", "gamma ray burst"]);

        let manifest: serde_json::Value =
            serde_json::from_slice(&fs::read(dir.path().join(MANIFEST_FILE)).unwrap()).unwrap();
        assert_eq!(manifest["version"], 1);
        assert_eq!(manifest["count"], 3);
        assert_eq!(manifest["dimension"], 6);

        let id = fs::read_to_string(dir.path().join(EMBEDDER_ID_FILE)).unwrap();
        assert_eq!(id, "mock");
    }

    #[tokio::test]
    async fn missing_artifact_is_corrupt_state() {
        let embedder = MockEmbedder::new(6);
        let catalog = sample_catalog(&embedder).await;
        let dir = tempdir().unwrap();
        catalog.save(dir.path()).unwrap();

        fs::remove_file(dir.path().join(DOCUMENTS_FILE)).unwrap();
        let result: Result<Catalog> = Catalog::load(dir.path());
        assert!(matches!(result, Err(Error::CorruptState { .. })));
    }

    #[tokio::test]
    async fn truncated_documents_file_is_corrupt_state() {
        let embedder = MockEmbedder::new(6);
        let catalog = sample_catalog(&embedder).await;
        let dir = tempdir().unwrap();
        catalog.save(dir.path()).unwrap();

        let path = dir.path().join(DOCUMENTS_FILE);
        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();

        let result: Result<Catalog> = Catalog::load(dir.path());
        assert!(matches!(result, Err(Error::CorruptState { .. })));
    }

    #[tokio::test]
    async fn document_count_disagreement_is_corrupt_state() {
        let embedder = MockEmbedder::new(6);
        let catalog = sample_catalog(&embedder).await;
        let dir = tempdir().unwrap();
        catalog.save(dir.path()).unwrap();

        fs::write(dir.path().join(DOCUMENTS_FILE), b"[\"only one\"]").unwrap();
        let result: Result<Catalog> = Catalog::load(dir.path());
        assert!(matches!(result, Err(Error::CorruptState { .. })));
    }

    #[tokio::test]
    async fn save_without_manifest_never_loads() {
        let embedder = MockEmbedder::new(6);
        let catalog = sample_catalog(&embedder).await;
        let dir = tempdir().unwrap();
        catalog.save(dir.path()).unwrap();

        // A save that died before its last write leaves no manifest behind.
        fs::remove_file(dir.path().join(MANIFEST_FILE)).unwrap();
        let result: Result<Catalog> = Catalog::load(dir.path());
        assert!(matches!(result, Err(Error::CorruptState { .. })));
    }

    #[tokio::test]
    async fn saving_over_an_existing_save_replaces_it() {
        let embedder = MockEmbedder::new(6);
        let dir = tempdir().unwrap();

        let tagged = |tag: &str| {
            let mut meta = Metadata::new();
            meta.insert("origin".to_owned(), MetadataValue::from(tag));
            meta
        };

        let original: Catalog = Catalog::new();
        original
            .add_documents(
                vec!["old one".to_owned(), "old two".to_owned()],
                Some(vec![tagged("old"), tagged("old")]),
                &embedder,
            )
            .await
            .unwrap();
        original.save(dir.path()).unwrap();

        // Same count and dimension as the first save, so a mix of old and
        // new artifacts would slip past the manifest cross-checks.
        let replacement: Catalog = Catalog::new();
        replacement
            .add_documents(
                vec!["new one".to_owned(), "new two".to_owned()],
                Some(vec![tagged("new"), tagged("new")]),
                &embedder,
            )
            .await
            .unwrap();
        replacement.save(dir.path()).unwrap();

        let restored: Catalog = Catalog::load(dir.path()).unwrap();
        assert_eq!(restored.total_count(), 2);
        let doc = restored.document(0).unwrap();
        assert_eq!(doc.text, "new one");
        assert_eq!(doc.metadata.get("origin"), Some(&MetadataValue::from("new")));
    }

    #[tokio::test]
    async fn interrupted_overwrite_refuses_to_load() {
        let embedder = MockEmbedder::new(6);
        let catalog = sample_catalog(&embedder).await;
        let dir = tempdir().unwrap();
        catalog.save(dir.path()).unwrap();

        // A directory occupying the temp path makes the first artifact
        // write fail, stopping the overwrite before anything is renamed
        // into place.
        fs::create_dir(dir.path().join(format!("{INDEX_FILE}.tmp"))).unwrap();
        let result = catalog.save(dir.path());
        assert!(matches!(result, Err(Error::Persistence { .. })));

        // The previous commit marker is consumed up front, so the torn
        // directory refuses to load instead of serving stale state.
        assert!(!dir.path().join(MANIFEST_FILE).exists());
        let loaded: Result<Catalog> = Catalog::load(dir.path());
        assert!(matches!(loaded, Err(Error::CorruptState { .. })));
    }

    #[tokio::test]
    async fn corrupt_index_blob_is_corrupt_state() {
        let embedder = MockEmbedder::new(6);
        let catalog = sample_catalog(&embedder).await;
        let dir = tempdir().unwrap();
        catalog.save(dir.path()).unwrap();

        fs::write(dir.path().join(INDEX_FILE), b"not an index").unwrap();
        let result: Result<Catalog> = Catalog::load(dir.path());
        assert!(matches!(result, Err(Error::CorruptState { .. })));
    }

    #[tokio::test]
    async fn unknown_format_version_is_rejected() {
        let embedder = MockEmbedder::new(6);
        let catalog = sample_catalog(&embedder).await;
        let dir = tempdir().unwrap();
        catalog.save(dir.path()).unwrap();

        let manifest = serde_json::json!({"version": 99, "count": 3, "dimension": 6});
        fs::write(
            dir.path().join(MANIFEST_FILE),
            serde_json::to_vec_pretty(&manifest).unwrap(),
        )
        .unwrap();

        let result: Result<Catalog> = Catalog::load(dir.path());
        assert!(matches!(result, Err(Error::CorruptState { .. })));
    }

    #[tokio::test]
    async fn ids_continue_after_reload() {
        let embedder = MockEmbedder::new(6);
        let catalog = sample_catalog(&embedder).await;
        let dir = tempdir().unwrap();
        catalog.save(dir.path()).unwrap();

        let restored: Catalog = Catalog::load(dir.path()).unwrap();
        let ids = restored
            .add_documents(vec!["delta".to_owned(), "epsilon".to_owned()], None, &embedder)
            .await
            .unwrap();
        assert_eq!(ids, vec![3, 4]);
        assert_eq!(restored.total_count(), 5);

        let results = restored.search("delta", 5, &embedder).await.unwrap();
        assert_eq!(results.len(), 5);
    }
}

//! Basic catalog flow: insert a few documents, search, save and reload.

use semadex::{Catalog, Embedder, Metadata, MetadataValue};

struct DemoEmbedder;

impl Embedder for DemoEmbedder {
    fn id(&self) -> &str {
        "demo-bag-of-bytes-4"
    }

    async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut vector = vec![0.0_f32; 4];
                for (idx, byte) in text.bytes().enumerate() {
                    vector[idx % 4] += f32::from(byte) / 64.0;
                }
                vector
            })
            .collect())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let catalog: Catalog = Catalog::new();
    let embedder = DemoEmbedder;

    let texts = vec![
        "Embeddings map text into vectors that preserve meaning.".to_owned(),
        "A brute-force scan compares the query against every stored vector.".to_owned(),
        "Squared Euclidean distance ranks matches without taking a root.".to_owned(),
    ];
    let metadata: Vec<Metadata> = ["notes", "docs", "book"]
        .iter()
        .map(|source| Metadata::from([("source".to_owned(), MetadataValue::from(*source))]))
        .collect();

    catalog
        .add_documents(texts, Some(metadata), &embedder)
        .await?;

    let results = catalog
        .search("how does vector search rank results?", 2, &embedder)
        .await?;
    println!("Top matches:");
    for hit in &results {
        println!(
            "{}: doc {} (distance = {:.3}) - {}",
            hit.rank, hit.id, hit.distance, hit.text
        );
    }

    let dir = std::env::temp_dir().join("semadex-demo");
    catalog.save(&dir)?;
    let restored: Catalog = Catalog::load(&dir)?;
    println!(
        "reloaded {} documents from {}",
        restored.total_count(),
        dir.display()
    );

    Ok(())
}

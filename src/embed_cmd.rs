use anyhow::{bail, Result};
use serde::Serialize;

use simcheck_core::store::CorpusStore;
use simcheck_core::SimilarityEngine;

use crate::config::Config;
use crate::embedding::build_engine;
use crate::get::find_batch;
use crate::sqlite_store::SqliteStore;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EmbedReport {
    pub total_documents: usize,
    pub up_to_date: usize,
    pub embedded: usize,
    pub failed: usize,
}

/// Embed every document whose stored passages are missing or were made
/// with different chunking parameters or a different model.
///
/// Documents are processed one at a time; a failure is counted and the
/// run continues.
pub async fn embed_pending<S: CorpusStore + ?Sized>(
    store: &S,
    engine: &SimilarityEngine,
    batch: Option<&str>,
) -> Result<EmbedReport> {
    let batches = match batch {
        Some(name) => vec![find_batch(store, name).await?],
        None => store.list_batches().await?,
    };

    let chunking = engine.params().chunking;
    let model = engine.embedder().model_name().to_string();
    let dims = engine.embedder().dims();
    let mut report = EmbedReport::default();

    for batch in &batches {
        // An empty exclude id returns the whole batch with its passages.
        let docs = store.fetch_candidates(&batch.id, "").await?;
        for doc in &docs {
            report.total_documents += 1;
            let current = doc
                .passages
                .as_ref()
                .is_some_and(|set| set.is_compatible(&chunking, &model, dims));
            if current {
                report.up_to_date += 1;
                continue;
            }

            match engine.embed_strict(doc).await {
                Ok(set) => {
                    store.replace_passages(&doc.id, &set).await?;
                    report.embedded += 1;
                }
                Err(e) => {
                    tracing::warn!(doc_id = %doc.id, error = %e, "embedding failed");
                    report.failed += 1;
                }
            }
        }
    }

    Ok(report)
}

/// CLI entry point for `simcheck embed pending`.
pub async fn run_embed_pending(config: &Config, batch: Option<&str>) -> Result<()> {
    if !config.embedding.is_enabled() {
        bail!("Embedding provider is disabled. Set [embedding] provider in config.");
    }

    let engine = build_engine(config)?;
    let store = SqliteStore::open(config).await?;
    let report = embed_pending(&store, &engine, batch).await?;

    println!("embed pending");
    println!("  documents: {}", report.total_documents);
    println!("  up to date: {}", report.up_to_date);
    println!("  embedded: {}", report.embedded);
    println!("  failed: {}", report.failed);

    store.close().await;
    Ok(())
}

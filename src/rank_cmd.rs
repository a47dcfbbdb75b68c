//! `simcheck rank`: rank a document's batch by similarity to it.

use anyhow::Result;

use simcheck_core::models::{BatchRanking, Signal};
use simcheck_core::rank::CancellationFlag;

use crate::compare_cmd::snippet;
use crate::config::Config;
use crate::embedding::build_engine;
use crate::get::require_document;
use crate::sqlite_store::SqliteStore;

pub async fn run_rank(config: &Config, id: &str, limit: Option<usize>, json: bool) -> Result<()> {
    let engine = build_engine(config)?;
    let store = SqliteStore::open(config).await?;
    let doc = require_document(&store, id).await?;

    let cancel = CancellationFlag::new();
    let on_signal = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, cancelling ranking");
            on_signal.cancel();
        }
    });

    let result = engine.rank_batch(&store, &doc, &cancel).await;
    watcher.abort();
    store.close().await;

    let mut ranking = result?;
    if let Some(limit) = limit {
        ranking.entries.truncate(limit);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&ranking)?);
    } else {
        print_ranking(&doc.filename, &ranking);
    }
    Ok(())
}

fn print_ranking(filename: &str, ranking: &BatchRanking) {
    println!("rank {} ({})", filename, ranking.target_id);
    println!("  candidates: {}", ranking.candidates_considered);
    if let Signal::NoSignal { reason } = &ranking.signal {
        println!("  no signal: {}", reason);
        println!("  nothing was compared; scores are unavailable, not zero");
    }
    println!("  relevant: {}", ranking.entries.len());
    for (i, entry) in ranking.entries.iter().enumerate() {
        println!(
            "  {}. {:.2}%  {}  ({})",
            i + 1,
            entry.similarity * 100.0,
            entry.filename,
            entry.document_id
        );
        if let Some(best) = entry
            .matches
            .iter()
            .max_by(|a, b| a.score.total_cmp(&b.score))
        {
            println!("       best match {:.4}: {}", best.score, snippet(&best.target_chunk));
        }
    }
    if !ranking.no_signal.is_empty() {
        println!("  unscored (no embeddings): {}", ranking.no_signal.len());
        if ranking.signal.is_embedded() {
            for missing in &ranking.no_signal {
                println!("    {}: {}", missing.candidate_id, missing.reason);
            }
        }
    }
    if !ranking.failures.is_empty() {
        println!("  failed: {}", ranking.failures.len());
        for failure in &ranking.failures {
            println!("    {}: {}", failure.candidate_id, failure.reason);
        }
    }
}

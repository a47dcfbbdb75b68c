//! `simcheck compare`: one directional comparison, between two stored
//! documents or two files on disk.

use anyhow::{Context, Result};
use std::path::Path;

use simcheck_core::models::{ComparisonResult, Signal};

use crate::config::Config;
use crate::embedding::build_engine;
use crate::get::require_document;
use crate::sqlite_store::SqliteStore;

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

pub async fn run_compare(
    config: &Config,
    source: &str,
    target: &str,
    files: bool,
    json: bool,
) -> Result<()> {
    let engine = build_engine(config)?;

    let result = if files {
        let a = read_text(Path::new(source))?;
        let b = read_text(Path::new(target))?;
        engine.compare_texts(&a, &b).await?
    } else {
        let store = SqliteStore::open(config).await?;
        let a = require_document(&store, source).await?;
        let b = require_document(&store, target).await?;
        store.close().await;
        engine.compare_documents(&a, &b).await?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(source, target, &result);
    }
    Ok(())
}

fn print_result(source: &str, target: &str, result: &ComparisonResult) {
    println!("compare {} -> {}", source, target);
    println!("  similarity: {:.2}%", result.score * 100.0);
    println!("  source passages: {}", result.chunks_a);
    println!("  target passages: {}", result.chunks_b);
    if let Signal::NoSignal { reason } = &result.signal {
        println!("  no signal: {}", reason);
        return;
    }
    println!("  matches: {}", result.matches.len());
    for m in &result.matches {
        println!(
            "    [{} -> {}] {:.4}",
            m.source_index, m.target_index, m.score
        );
        println!("      source: {}", snippet(&m.source_chunk));
        println!("      target: {}", snippet(&m.target_chunk));
    }
}

/// First 80 characters of `text` on one line.
pub(crate) fn snippet(text: &str) -> String {
    let flat: String = text
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .collect();
    match flat.char_indices().nth(80) {
        Some((idx, _)) => format!("{}…", &flat[..idx]),
        None => flat,
    }
}

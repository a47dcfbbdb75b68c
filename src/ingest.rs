//! File ingestion.
//!
//! Walks a file or directory, reads each matching file as UTF-8 text,
//! skips content already in the corpus (by content hash), and inserts the
//! rest into a named batch. When an engine is supplied the new documents
//! are embedded inline; an embedding failure is logged and leaves the
//! document for `embed pending`.

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use simcheck_core::hash::content_hash;
use simcheck_core::models::{Batch, Document};
use simcheck_core::store::CorpusStore;
use simcheck_core::SimilarityEngine;

use crate::config::{Config, IngestConfig};
use crate::embedding::build_engine;
use crate::sqlite_store::SqliteStore;

/// A file found by [`scan_path`], with the name it is stored under.
#[derive(Debug, Clone, PartialEq)]
pub struct ScannedFile {
    pub path: PathBuf,
    pub filename: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestedFile {
    pub document_id: String,
    pub filename: String,
    pub embedded: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DuplicateFile {
    pub filename: String,
    pub existing_id: String,
    pub existing_filename: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedFile {
    pub filename: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub batch: Batch,
    pub inserted: Vec<IngestedFile>,
    pub duplicates: Vec<DuplicateFile>,
    pub skipped: Vec<SkippedFile>,
}

impl IngestReport {
    pub fn embedded_count(&self) -> usize {
        self.inserted.iter().filter(|f| f.embedded).count()
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("Invalid glob: {}", pattern))?);
    }
    Ok(builder.build()?)
}

/// List the files to ingest under `path`.
///
/// A single file is taken as-is. A directory is walked and filtered by the
/// include / exclude globs, matched against paths relative to `path`.
/// Results are sorted by relative path.
pub fn scan_path(path: &Path, config: &IngestConfig) -> Result<Vec<ScannedFile>> {
    if !path.exists() {
        bail!("Path does not exist: {}", path.display());
    }

    if path.is_file() {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        return Ok(vec![ScannedFile {
            path: path.to_path_buf(),
            filename,
        }]);
    }

    let include_set = build_globset(&config.include_globs)?;
    let mut excludes = vec!["**/.git/**".to_string(), "**/target/**".to_string()];
    excludes.extend(config.exclude_globs.clone());
    let exclude_set = build_globset(&excludes)?;

    let mut files = Vec::new();
    for entry in WalkDir::new(path).follow_links(config.follow_symlinks) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry.path().strip_prefix(path).unwrap_or(entry.path());
        let rel_str = relative.to_string_lossy().to_string();

        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }

        files.push(ScannedFile {
            path: entry.path().to_path_buf(),
            filename: rel_str,
        });
    }

    files.sort_by(|a, b| a.filename.cmp(&b.filename));
    Ok(files)
}

/// Ingest every file under `path` into the batch called `batch_name`.
pub async fn ingest_path<S: CorpusStore + ?Sized>(
    store: &S,
    engine: Option<&SimilarityEngine>,
    batch_name: &str,
    path: &Path,
    config: &IngestConfig,
) -> Result<IngestReport> {
    let files = scan_path(path, config)?;
    let batch = store.upsert_batch(batch_name).await?;

    let mut report = IngestReport {
        batch,
        inserted: Vec::new(),
        duplicates: Vec::new(),
        skipped: Vec::new(),
    };

    for file in files {
        let bytes = std::fs::read(&file.path)
            .with_context(|| format!("Failed to read {}", file.path.display()))?;

        let hash = content_hash(&bytes);
        if let Some(existing) = store.find_by_hash(&hash).await? {
            tracing::info!(file = %file.filename, existing = %existing.id, "duplicate content");
            report.duplicates.push(DuplicateFile {
                filename: file.filename,
                existing_id: existing.id,
                existing_filename: existing.filename,
            });
            continue;
        }

        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(_) => {
                tracing::warn!(file = %file.filename, "skipping file that is not UTF-8 text");
                report.skipped.push(SkippedFile {
                    filename: file.filename,
                    reason: "not UTF-8 text".to_string(),
                });
                continue;
            }
        };

        let doc = Document::new(&report.batch.id, &file.filename, &text);
        store.insert_document(&doc).await?;

        let embedded = match engine {
            Some(engine) => embed_inline(store, engine, &doc).await,
            None => false,
        };

        report.inserted.push(IngestedFile {
            document_id: doc.id,
            filename: doc.filename,
            embedded,
        });
    }

    Ok(report)
}

/// Embed and persist one document's passages. Non-fatal on failure.
async fn embed_inline<S: CorpusStore + ?Sized>(
    store: &S,
    engine: &SimilarityEngine,
    doc: &Document,
) -> bool {
    let set = match engine.embed_strict(doc).await {
        Ok(set) => set,
        Err(e) => {
            tracing::warn!(doc_id = %doc.id, error = %e, "inline embedding failed");
            return false;
        }
    };
    match store.replace_passages(&doc.id, &set).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(doc_id = %doc.id, error = %e, "failed to store passages");
            false
        }
    }
}

/// CLI entry point for `simcheck ingest`.
pub async fn run_ingest(config: &Config, path: &Path, batch: &str, no_embed: bool) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let engine = if no_embed || !config.embedding.is_enabled() {
        None
    } else {
        Some(build_engine(config)?)
    };

    let report = ingest_path(&store, engine.as_ref(), batch, path, &config.ingest).await?;

    println!("ingest {}", path.display());
    println!("  batch: {} ({})", report.batch.name, report.batch.id);
    println!("  inserted documents: {}", report.inserted.len());
    println!("  duplicates skipped: {}", report.duplicates.len());
    for dup in &report.duplicates {
        println!(
            "    {} duplicates {} ({})",
            dup.filename, dup.existing_filename, dup.existing_id
        );
    }
    println!("  unreadable skipped: {}", report.skipped.len());
    if engine.is_some() {
        println!("  embedded: {}", report.embedded_count());
        println!(
            "  embeddings pending: {}",
            report.inserted.len() - report.embedded_count()
        );
    }
    println!("ok");

    store.close().await;
    Ok(())
}

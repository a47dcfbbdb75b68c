//! Commands that inspect a single file without touching the corpus:
//! `simcheck hash` and `simcheck detect`.

use anyhow::{Context, Result};
use std::path::Path;

use simcheck_core::classify::{detect_ai_text, AiDetection};
use simcheck_core::hash::content_hash;

use crate::config::Config;
use crate::detection::create_classifier;

pub fn run_hash(path: &Path) -> Result<()> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    println!("{}  {}", content_hash(&bytes), path.display());
    Ok(())
}

pub async fn detect_file(config: &Config, path: &Path) -> Result<AiDetection> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let classifier = create_classifier(&config.detection)?;
    Ok(detect_ai_text(classifier.as_ref(), &text, config.detection.max_chars).await)
}

pub async fn run_detect(config: &Config, path: &Path, json: bool) -> Result<()> {
    let verdict = detect_file(config, path).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&verdict)?);
        return Ok(());
    }

    println!("detect {}", path.display());
    println!("  label: {}", verdict.label);
    println!("  ai generated: {}", if verdict.is_ai { "yes" } else { "no" });
    println!("  ai probability: {:.2}%", verdict.score * 100.0);
    println!("  confidence: {:.2}%", verdict.confidence * 100.0);
    println!("  {}", verdict.message);
    Ok(())
}

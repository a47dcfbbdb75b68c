//! TOML configuration.
//!
//! Every section except `[db]` is optional and falls back to the defaults
//! below. [`load_config`] rejects values the engine cannot run with before
//! any command touches the database.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use simcheck_core::chunk::{ChunkParams, DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP};
use simcheck_core::classify::DEFAULT_MAX_CHARS;
use simcheck_core::compare::{MatchParams, DEFAULT_MIN_RELEVANCE};
use simcheck_core::matching::DEFAULT_MATCH_THRESHOLD;
use simcheck_core::EngineParams;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}
fn default_overlap() -> usize {
    DEFAULT_OVERLAP
}

#[derive(Debug, Deserialize, Clone)]
pub struct MatchingConfig {
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f64,
    #[serde(default = "default_min_relevance")]
    pub min_relevance: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            min_relevance: DEFAULT_MIN_RELEVANCE,
        }
    }
}

fn default_match_threshold() -> f64 {
    DEFAULT_MATCH_THRESHOLD
}
fn default_min_relevance() -> f64 {
    DEFAULT_MIN_RELEVANCE
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Base URL for the Ollama provider.
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            dims: None,
            batch_size: 64,
            max_retries: 5,
            timeout_secs: 30,
            url: None,
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DetectionConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            max_chars: DEFAULT_MAX_CHARS,
            timeout_secs: 30,
        }
    }
}

fn default_max_chars() -> usize {
    DEFAULT_MAX_CHARS
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
            follow_symlinks: false,
        }
    }
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.txt".to_string(), "**/*.md".to_string()]
}

impl Config {
    /// Defaults with the database under `./data`, for commands that run
    /// without a config file.
    pub fn minimal() -> Self {
        Self {
            db: DbConfig {
                path: PathBuf::from("./data/simcheck.sqlite"),
            },
            chunking: ChunkingConfig::default(),
            matching: MatchingConfig::default(),
            embedding: EmbeddingConfig::default(),
            detection: DetectionConfig::default(),
            ingest: IngestConfig::default(),
        }
    }

    pub fn engine_params(&self) -> EngineParams {
        EngineParams {
            chunking: ChunkParams {
                chunk_size: self.chunking.chunk_size,
                overlap: self.chunking.overlap,
            },
            matching: MatchParams {
                match_threshold: self.matching.match_threshold,
                min_relevance: self.matching.min_relevance,
            },
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    config
        .engine_params()
        .validate()
        .context("Invalid [chunking] or [matching] section")?;

    let embedding = &config.embedding;
    match embedding.provider.as_str() {
        "disabled" | "local" | "hashed" => {}
        "openai" | "ollama" => {
            if embedding.model.is_none() {
                anyhow::bail!(
                    "embedding.model must be specified when provider is '{}'",
                    embedding.provider
                );
            }
        }
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, ollama, local, or hashed.",
            other
        ),
    }
    if embedding.is_enabled() && embedding.dims == Some(0) {
        anyhow::bail!("embedding.dims must be > 0");
    }
    if matches!(embedding.provider.as_str(), "openai" | "ollama") && embedding.dims.is_none() {
        anyhow::bail!(
            "embedding.dims must be specified when provider is '{}'",
            embedding.provider
        );
    }
    if embedding.batch_size == 0 {
        anyhow::bail!("embedding.batch_size must be > 0");
    }

    match config.detection.provider.as_str() {
        "disabled" | "openai" => {}
        other => anyhow::bail!(
            "Unknown detection provider: '{}'. Must be disabled or openai.",
            other
        ),
    }
    if config.detection.max_chars == 0 {
        anyhow::bail!("detection.max_chars must be > 0");
    }

    Ok(())
}

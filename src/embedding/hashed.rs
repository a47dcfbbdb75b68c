//! Offline feature-hashing embedder.
//!
//! Each lowercase alphanumeric token is hashed with SHA-256; the first
//! eight digest bytes pick a bucket and the ninth picks a sign. The bucket
//! counts are L2-normalized. Texts sharing vocabulary score high, which
//! is enough for near-copy detection without downloading a model.

use anyhow::{bail, Result};
use async_trait::async_trait;
use sha2::{Digest, Sha256};

use simcheck_core::embedding::Embedder;

pub struct HashedEmbedder {
    name: String,
    dims: usize,
}

impl HashedEmbedder {
    pub fn new(dims: usize) -> Result<Self> {
        if dims == 0 {
            bail!("hashed embedder needs dims > 0");
        }
        Ok(Self {
            name: format!("hashed-{}", dims),
            dims,
        })
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut buckets = vec![0.0f64; self.dims];
        let tokens = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty());

        for token in tokens {
            let digest = Sha256::digest(token.to_lowercase().as_bytes());
            let mut head = [0u8; 8];
            head.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(head) % self.dims as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            buckets[bucket] += sign;
        }

        let norm = buckets.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm == 0.0 {
            return vec![0.0; self.dims];
        }
        buckets.iter().map(|v| (v / norm) as f32).collect()
    }
}

#[async_trait]
impl Embedder for HashedEmbedder {
    fn model_name(&self) -> &str {
        &self.name
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

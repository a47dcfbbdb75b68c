//! Concrete AI-text classifiers.
//!
//! The `openai` provider asks a chat model for a JSON verdict of the form
//! `{"is_ai": bool, "confidence": number}` and maps it onto the core
//! [`ClassifierOutput`] labels `Fake` / `Real`.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use simcheck_core::classify::{Classifier, ClassifierOutput, DisabledClassifier};

use crate::config::DetectionConfig;
use crate::embedding::post_json_with_retry;

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_DETECTION_MODEL: &str = "gpt-4o-mini";
const DETECTION_RETRIES: u32 = 2;

const SYSTEM_PROMPT: &str = "You judge whether a text was written by a language model or by a \
human. Reply with a JSON object only: {\"is_ai\": true|false, \"confidence\": 0.0-1.0}, where \
confidence is how sure you are of your verdict.";

pub struct OpenAIClassifier {
    model: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAIClassifier {
    pub fn new(config: &DetectionConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            model: config
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_DETECTION_MODEL.to_string()),
            api_key,
            client,
        })
    }
}

#[derive(Debug, Deserialize)]
struct Verdict {
    is_ai: bool,
    confidence: f64,
}

fn parse_chat_verdict(json: &serde_json::Value) -> Result<ClassifierOutput> {
    let content = json
        .pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .ok_or_else(|| anyhow!("Invalid chat response: missing message content"))?;

    let verdict: Verdict = serde_json::from_str(content.trim())
        .map_err(|e| anyhow!("Classifier reply is not a verdict: {}", e))?;

    Ok(ClassifierOutput {
        label: if verdict.is_ai { "Fake" } else { "Real" }.to_string(),
        score: verdict.confidence,
    })
}

#[async_trait]
impl Classifier for OpenAIClassifier {
    fn name(&self) -> &str {
        &self.model
    }

    async fn classify(&self, text: &str) -> Result<ClassifierOutput> {
        let body = serde_json::json!({
            "model": self.model,
            "temperature": 0,
            "response_format": {"type": "json_object"},
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": text},
            ],
        });
        let json = post_json_with_retry(
            &self.client,
            OPENAI_CHAT_URL,
            Some(&self.api_key),
            &body,
            DETECTION_RETRIES,
            "OpenAI",
        )
        .await?;
        parse_chat_verdict(&json)
    }
}

/// Create the [`Classifier`] named by `config.provider`.
///
/// Without `OPENAI_API_KEY` the `openai` provider falls back to
/// [`DisabledClassifier`], so `detect` reports `UNKNOWN` instead of failing.
pub fn create_classifier(config: &DetectionConfig) -> Result<Arc<dyn Classifier>> {
    classifier_with_key(config, std::env::var("OPENAI_API_KEY").ok())
}

fn classifier_with_key(
    config: &DetectionConfig,
    api_key: Option<String>,
) -> Result<Arc<dyn Classifier>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledClassifier)),
        "openai" => match api_key.filter(|k| !k.trim().is_empty()) {
            Some(key) => Ok(Arc::new(OpenAIClassifier::new(config, key)?)),
            None => {
                tracing::warn!("OPENAI_API_KEY is not set; AI detection is disabled");
                Ok(Arc::new(DisabledClassifier))
            }
        },
        other => anyhow::bail!("Unknown detection provider: {}", other),
    }
}

//! AI-generated-text detection capability.
//!
//! The classifier itself is an opaque, injected [`Classifier`]. This module
//! owns what happens around it: input truncation, mapping model labels to
//! an AI/human verdict, normalizing the score to an AI probability, and
//! turning classifier failures into an `ERROR` verdict instead of an error.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Default number of characters sent to the classifier.
pub const DEFAULT_MAX_CHARS: usize = 2000;

/// Raw classifier output: the winning label and its probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierOutput {
    pub label: String,
    pub score: f64,
}

/// Text classifier that labels text as machine- or human-written.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Identifier shown in verdict messages.
    fn name(&self) -> &str;
    /// Whether the classifier can run at all.
    fn is_enabled(&self) -> bool {
        true
    }
    async fn classify(&self, text: &str) -> Result<ClassifierOutput>;
}

/// Verdict returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiDetection {
    pub is_ai: bool,
    /// Probability that the text is AI-generated, in `[0.0, 1.0]`.
    pub score: f64,
    /// The classifier's confidence in its own label.
    pub confidence: f64,
    pub label: String,
    pub message: String,
}

impl AiDetection {
    fn unavailable(label: &str, message: String) -> Self {
        Self {
            is_ai: false,
            score: 0.0,
            confidence: 0.0,
            label: label.to_string(),
            message,
        }
    }
}

/// Labels that mean "machine-generated" across common detector models.
fn is_ai_label(label: &str) -> bool {
    matches!(
        label.to_ascii_lowercase().as_str(),
        "fake" | "ai" | "machine" | "generated" | "label_1"
    )
}

/// First `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Run `classifier` on the first `max_chars` characters of `text`.
///
/// Never fails: a disabled classifier yields label `UNKNOWN`, a failing
/// one yields label `ERROR`, both with a zero score.
pub async fn detect_ai_text(
    classifier: &dyn Classifier,
    text: &str,
    max_chars: usize,
) -> AiDetection {
    if !classifier.is_enabled() {
        return AiDetection::unavailable(
            "UNKNOWN",
            "AI detection unavailable (classifier disabled)".to_string(),
        );
    }

    let input = truncate_chars(text, max_chars);
    match classifier.classify(input).await {
        Ok(output) => {
            let confidence = output.score.clamp(0.0, 1.0);
            let is_ai = is_ai_label(&output.label);
            AiDetection {
                is_ai,
                score: if is_ai { confidence } else { 1.0 - confidence },
                confidence,
                label: output.label,
                message: format!("Analysis complete ({})", classifier.name()),
            }
        }
        Err(e) => {
            tracing::warn!(classifier = classifier.name(), error = %e, "AI detection failed");
            AiDetection::unavailable("ERROR", format!("{:#}", e))
        }
    }
}

/// A classifier that is never enabled.
pub struct DisabledClassifier;

#[async_trait]
impl Classifier for DisabledClassifier {
    fn name(&self) -> &str {
        "disabled"
    }

    fn is_enabled(&self) -> bool {
        false
    }

    async fn classify(&self, _text: &str) -> Result<ClassifierOutput> {
        anyhow::bail!("AI detection is disabled")
    }
}

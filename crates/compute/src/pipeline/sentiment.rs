//! Sentiment mismatch: feedback whose wording disagrees with its rating.

use std::sync::Arc;

use signal_core::config::PipelineConfig;
use signal_core::{FeedbackItem, Insight, InsightPayload};
use tracing::{debug, warn};

use crate::embedding::{cosine_similarity, Embedder, EmbeddingError};
use crate::error::ComputeError;

use super::{Detector, WindowData};

pub const POSITIVE_ANCHOR: &str = "I love this product and it works great";
pub const NEGATIVE_ANCHOR: &str = "This product is frustrating and broken";

/// Lowercase substrings that make the keyword fallback read as positive.
pub const POSITIVE_KEYWORDS: &[&str] = &["love", "great", "helpful"];

/// Lexical polarity: `+1.0` when any positive keyword appears, else `-1.0`.
pub fn keyword_polarity(text: &str) -> f64 {
    let lower = text.to_lowercase();
    if POSITIVE_KEYWORDS.iter().any(|w| lower.contains(w)) {
        1.0
    } else {
        -1.0
    }
}

/// Mismatch score for a rating/polarity pair, `None` when they agree or
/// the rating is absent or neutral.
pub fn mismatch_score(rating: Option<i64>, polarity: f64) -> Option<f64> {
    match rating {
        Some(r) if r <= 2 && polarity > 0.0 => Some(polarity),
        Some(r) if r >= 4 && polarity < 0.0 => Some(polarity.abs()),
        _ => None,
    }
}

pub struct SentimentDetector {
    embedder: Arc<dyn Embedder>,
    noise_threshold: f64,
}

impl SentimentDetector {
    pub fn new(embedder: Arc<dyn Embedder>, noise_threshold: f64) -> Self {
        Self {
            embedder,
            noise_threshold,
        }
    }

    pub fn from_config(config: &PipelineConfig, embedder: Arc<dyn Embedder>) -> Self {
        Self::new(embedder, config.sentiment_noise_threshold)
    }

    /// `cos(text, positive anchor) − cos(text, negative anchor)` per text.
    pub fn embedding_polarity(&self, texts: &[&str]) -> Result<Vec<f64>, EmbeddingError> {
        let embeddings = self.embedder.encode(texts)?;
        // Anchors are encoded one call each.
        let pos = self.encode_one(POSITIVE_ANCHOR)?;
        let neg = self.encode_one(NEGATIVE_ANCHOR)?;

        Ok(embeddings
            .iter()
            .map(|e| cosine_similarity(e, &pos) - cosine_similarity(e, &neg))
            .collect())
    }

    fn encode_one(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.embedder
            .encode(&[text])?
            .into_iter()
            .next()
            .ok_or(EmbeddingError::CountMismatch {
                expected: 1,
                actual: 0,
            })
    }

    /// Final polarity for each text, using the keyword fallback when the
    /// embedding signal is below the noise threshold.
    pub fn polarities(&self, texts: &[&str]) -> Vec<f64> {
        let raw = match self.embedding_polarity(texts) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(
                    backend = self.embedder.name(),
                    error = %e,
                    "embedding failed, using keyword polarity for this window"
                );
                vec![0.0; texts.len()]
            }
        };

        texts
            .iter()
            .zip(raw)
            .map(|(text, score)| {
                if score.abs() < self.noise_threshold {
                    keyword_polarity(text)
                } else {
                    score
                }
            })
            .collect()
    }

    pub fn detect(&self, feedback: &[FeedbackItem]) -> Vec<Insight> {
        if feedback.is_empty() {
            return Vec::new();
        }

        let texts: Vec<&str> = feedback.iter().map(|f| f.text.as_str()).collect();
        let polarities = self.polarities(&texts);

        feedback
            .iter()
            .zip(polarities)
            .filter_map(|(item, polarity)| {
                let score = mismatch_score(item.rating, polarity)?;
                let rating = item.rating?;
                debug!(user_id = item.user_id, rating, polarity, "sentiment mismatch");
                Some(Insight::new(
                    InsightPayload::SentimentMismatch {
                        user_id: item.user_id,
                        rating,
                        text: item.text.clone(),
                    },
                    score,
                ))
            })
            .collect()
    }
}

impl Detector for SentimentDetector {
    fn name(&self) -> &str {
        "sentiment"
    }

    fn detect(&self, data: &WindowData<'_>) -> Result<Vec<Insight>, ComputeError> {
        Ok(SentimentDetector::detect(self, data.feedback))
    }
}

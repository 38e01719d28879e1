//! Sentence embedding backends for the sentiment detector.
//!
//! The backend is picked once, at construction, by [`embedder_from_config`]:
//! the configured primary (Ollama) when it answers a probe, otherwise the
//! deterministic [`SeededEmbedder`].

pub mod ollama;
pub mod seeded;
pub mod traits;

use std::sync::Arc;

use signal_core::config::{EmbeddingConfig, OllamaConfig};
use tracing::{info, warn};

pub use ollama::OllamaEmbedder;
pub use seeded::SeededEmbedder;
pub use traits::{Embedder, EmbeddingError};

/// Vector size of the fallback encoder.
pub const FALLBACK_DIMENSIONS: usize = 8;

/// Select the embedding backend for this process.
pub fn embedder_from_config(embedding: &EmbeddingConfig, ollama: &OllamaConfig) -> Arc<dyn Embedder> {
    match embedding.provider.as_str() {
        "ollama" => {
            let primary = OllamaEmbedder::new(
                ollama.url.clone(),
                ollama.embedding_model.clone(),
                embedding.dimensions,
            );
            match primary.probe() {
                Ok(()) => {
                    info!(url = %ollama.url, model = %ollama.embedding_model, "using ollama embeddings");
                    Arc::new(primary)
                }
                Err(e) => {
                    warn!(error = %e, url = %ollama.url, "ollama embeddings unavailable, using seeded fallback");
                    fallback(embedding)
                }
            }
        }
        "seeded" | "stub" => fallback(embedding),
        other => {
            warn!(provider = %other, "unknown embedding provider, using seeded fallback");
            fallback(embedding)
        }
    }
}

fn fallback(embedding: &EmbeddingConfig) -> Arc<dyn Embedder> {
    Arc::new(SeededEmbedder::new(embedding.seed, FALLBACK_DIMENSIONS))
}

/// Cosine similarity between two vectors. Returns 0.0 for zero-length or zero-norm vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let dim = a.len().min(b.len());
    if dim == 0 {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for i in 0..dim {
        let (x, y) = (a[i] as f64, b[i] as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom <= f64::EPSILON {
        return 0.0;
    }

    (dot / denom).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedding_config(provider: &str) -> EmbeddingConfig {
        EmbeddingConfig {
            provider: provider.to_string(),
            dimensions: 384,
            seed: 42,
        }
    }

    fn ollama_config() -> OllamaConfig {
        OllamaConfig {
            url: "http://127.0.0.1:9".to_string(),
            embedding_model: "all-minilm".to_string(),
        }
    }

    #[test]
    fn seeded_provider_is_selected_directly() {
        let embedder = embedder_from_config(&embedding_config("seeded"), &ollama_config());
        assert_eq!(embedder.name(), "seeded");
        assert_eq!(embedder.dimensions(), FALLBACK_DIMENSIONS);
    }

    #[test]
    fn unreachable_ollama_falls_back() {
        let embedder = embedder_from_config(&embedding_config("ollama"), &ollama_config());
        assert_eq!(embedder.name(), "seeded");
    }

    #[test]
    fn unknown_provider_falls_back() {
        let embedder = embedder_from_config(&embedding_config("onnx"), &ollama_config());
        assert_eq!(embedder.name(), "seeded");
    }

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let v = [0.3f32, -0.2, 0.9];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn cosine_of_opposite_vectors_is_minus_one() {
        let a = [1.0f32, 0.0];
        let b = [-1.0f32, 0.0];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn cosine_with_zero_vector_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }
}

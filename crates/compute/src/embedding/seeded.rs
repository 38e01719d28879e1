use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::traits::{Embedder, EmbeddingError};

/// Deterministic stand-in used when no real embedding model is available.
///
/// Every `encode` call restarts the generator from the same seed, so the
/// vector for a text depends only on its position in the batch. Two texts
/// encoded in separate single-item calls therefore get identical vectors,
/// which gives zero polarity and hands the decision to the keyword path.
pub struct SeededEmbedder {
    seed: u64,
    dimensions: usize,
}

impl SeededEmbedder {
    pub fn new(seed: u64, dimensions: usize) -> Self {
        Self {
            seed,
            dimensions: dimensions.max(1),
        }
    }
}

impl Embedder for SeededEmbedder {
    fn encode(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        Ok(texts
            .iter()
            .map(|_| {
                (0..self.dimensions)
                    .map(|_| rng.gen_range(-1.0f32..1.0))
                    .collect()
            })
            .collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "seeded"
    }
}

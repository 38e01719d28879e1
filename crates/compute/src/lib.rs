pub mod algorithms;
pub mod embedding;
pub mod error;
pub mod pipeline;

pub use embedding::{embedder_from_config, Embedder, EmbeddingError, OllamaEmbedder, SeededEmbedder};
pub use error::ComputeError;
pub use pipeline::features::FeatureTable;
pub use pipeline::{rank_by_score, top_n, Detector, InsightPipeline, RunReport, WindowData};

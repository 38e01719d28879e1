use thiserror::Error;

use crate::algorithms::kmeans::KmeansError;

/// Failures that abort an insight run. No partial output is produced.
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Cohort clustering failed: {0}")]
    Clustering(#[from] KmeansError),

    #[error("Detector {detector} failed: {reason}")]
    Detector { detector: String, reason: String },
}

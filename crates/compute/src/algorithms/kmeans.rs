use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use signal_core::UserId;

/// Reasons a k-means fit can be rejected.
#[derive(Debug, Error, PartialEq)]
pub enum KmeansError {
    #[error("kmeans: points must not be empty")]
    EmptyInput,

    #[error("kmeans: k must be at least 1")]
    ZeroK,

    #[error("kmeans: k ({k}) must be <= number of points ({points})")]
    TooManyClusters { k: usize, points: usize },

    #[error("kmeans: row {row} has {actual} columns, expected {expected}")]
    DimensionMismatch {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("kmeans: row {row} contains a non-finite value")]
    NonFinite { row: usize },
}

/// Fit parameters.
#[derive(Debug, Clone)]
pub struct KmeansParams {
    pub k: usize,
    pub max_iterations: usize,
    /// Seed for k-means++ sampling; equal seeds give equal fits.
    pub seed: u64,
    /// Number of independent restarts; `None` selects automatically
    /// (a single run, since k-means++ seeding is already spread out).
    pub n_init: Option<usize>,
}

impl Default for KmeansParams {
    fn default() -> Self {
        Self {
            k: 3,
            max_iterations: 300,
            seed: 42,
            n_init: None,
        }
    }
}

impl KmeansParams {
    /// Resolve the restart count.
    pub fn effective_n_init(&self) -> usize {
        self.n_init.unwrap_or(1).max(1)
    }
}

/// Result of a full batch K-means run.
#[derive(Debug, Clone)]
pub struct KmeansResult {
    /// Assignment of each point to its cluster index.
    pub assignments: HashMap<UserId, usize>,
    /// Final centroid vectors, indexed by cluster id.
    pub centroids: Vec<Vec<f64>>,
    /// Number of clusters.
    pub k: usize,
    /// Lloyd's iterations performed by the winning restart.
    pub iterations: usize,
    /// Sum of squared distances from each point to its assigned centroid.
    pub inertia: f64,
}

/// Run Lloyd's K-means with seeded K-means++ initialization.
///
/// With more than one restart the fit with the lowest inertia wins.
/// Iterates until assignments stabilize or `max_iterations` is reached.
pub fn kmeans(points: &[(UserId, Vec<f64>)], params: &KmeansParams) -> Result<KmeansResult, KmeansError> {
    validate(points, params.k)?;

    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut best: Option<Fit> = None;

    for _ in 0..params.effective_n_init() {
        let centroids = kmeanspp_init(points, params.k, &mut rng);
        let fit = lloyd(points, centroids, params.max_iterations);
        let better = best.as_ref().map_or(true, |b| fit.inertia < b.inertia);
        if better {
            best = Some(fit);
        }
    }

    let fit = best.ok_or(KmeansError::EmptyInput)?;
    let assignments = points
        .iter()
        .zip(fit.assignments.iter())
        .map(|((id, _), &cluster)| (*id, cluster))
        .collect();

    Ok(KmeansResult {
        assignments,
        centroids: fit.centroids,
        k: params.k,
        iterations: fit.iterations,
        inertia: fit.inertia,
    })
}

// ── Internal helpers ─────────────────────────────────────────

struct Fit {
    assignments: Vec<usize>,
    centroids: Vec<Vec<f64>>,
    iterations: usize,
    inertia: f64,
}

fn validate(points: &[(UserId, Vec<f64>)], k: usize) -> Result<(), KmeansError> {
    if points.is_empty() {
        return Err(KmeansError::EmptyInput);
    }
    if k == 0 {
        return Err(KmeansError::ZeroK);
    }
    if k > points.len() {
        return Err(KmeansError::TooManyClusters {
            k,
            points: points.len(),
        });
    }

    let dim = points[0].1.len();
    for (row, (_, vec)) in points.iter().enumerate() {
        if vec.len() != dim {
            return Err(KmeansError::DimensionMismatch {
                row,
                expected: dim,
                actual: vec.len(),
            });
        }
        if vec.iter().any(|v| !v.is_finite()) {
            return Err(KmeansError::NonFinite { row });
        }
    }
    Ok(())
}

fn lloyd(points: &[(UserId, Vec<f64>)], mut centroids: Vec<Vec<f64>>, max_iterations: usize) -> Fit {
    let k = centroids.len();
    let dim = points[0].1.len();
    let n = points.len();

    let mut assignments = vec![0usize; n];
    let mut iterations = 0;

    for _ in 0..max_iterations.max(1) {
        iterations += 1;

        // Assignment step: assign each point to nearest centroid.
        let mut changed = false;
        for (i, (_id, vec)) in points.iter().enumerate() {
            let nearest = nearest_centroid(vec, &centroids);
            if assignments[i] != nearest {
                assignments[i] = nearest;
                changed = true;
            }
        }

        if !changed && iterations > 1 {
            break;
        }

        // Update step: recompute centroids as mean of assigned points.
        let mut new_centroids = vec![vec![0.0; dim]; k];
        let mut counts = vec![0usize; k];

        for (i, (_id, vec)) in points.iter().enumerate() {
            let cluster = assignments[i];
            counts[cluster] += 1;
            for (j, &val) in vec.iter().enumerate() {
                new_centroids[cluster][j] += val;
            }
        }

        for (c, centroid) in new_centroids.iter_mut().enumerate() {
            if counts[c] > 0 {
                let count = counts[c] as f64;
                for val in centroid.iter_mut() {
                    *val /= count;
                }
            } else {
                // Empty cluster: keep previous centroid.
                centroid.clone_from(&centroids[c]);
            }
        }

        centroids = new_centroids;
    }

    let inertia = points
        .iter()
        .zip(assignments.iter())
        .map(|((_, vec), &cluster)| squared_euclidean(vec, &centroids[cluster]))
        .sum();

    Fit {
        assignments,
        centroids,
        iterations,
        inertia,
    }
}

/// K-means++ initialization: first centroid uniformly at random, the rest
/// sampled proportionally to D² from the chosen set.
fn kmeanspp_init(points: &[(UserId, Vec<f64>)], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let n = points.len();
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.gen_range(0..n)].1.clone());

    for _ in 1..k {
        let distances: Vec<f64> = points
            .iter()
            .map(|(_, vec)| {
                centroids
                    .iter()
                    .map(|c| squared_euclidean(vec, c))
                    .fold(f64::MAX, f64::min)
            })
            .collect();
        let total: f64 = distances.iter().sum();

        // All remaining points coincide with a centroid.
        if total <= f64::EPSILON {
            centroids.push(points[rng.gen_range(0..n)].1.clone());
            continue;
        }

        let target = rng.gen::<f64>() * total;
        let mut cumulative = 0.0;
        let mut chosen = n - 1;
        for (i, d) in distances.iter().enumerate() {
            cumulative += d;
            if cumulative >= target && *d > 0.0 {
                chosen = i;
                break;
            }
        }
        centroids.push(points[chosen].1.clone());
    }

    centroids
}

/// Find the index of the nearest centroid.
fn nearest_centroid(point: &[f64], centroids: &[Vec<f64>]) -> usize {
    let mut best_idx = 0;
    let mut best_dist = f64::MAX;
    for (i, centroid) in centroids.iter().enumerate() {
        let dist = squared_euclidean(point, centroid);
        if dist < best_dist {
            best_dist = dist;
            best_idx = i;
        }
    }
    best_idx
}

/// Squared Euclidean distance.
#[inline]
fn squared_euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

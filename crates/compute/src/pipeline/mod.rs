//! Insight pipeline orchestrator.
//!
//! Wires feature extraction, cohort clustering and the detectors into one
//! batch run over a closed window:
//!
//! 1. Build per-user feature vectors.
//! 2. Refit cohorts (skipped when no user was active) and relabel users in memory.
//! 3. Run every registered detector over the same window.
//! 4. Concatenate findings, fall back to one placeholder, explain and stamp features.

pub mod anomaly;
pub mod cohorts;
pub mod explain;
pub mod features;
pub mod metrics;
pub mod misuse;
pub mod sentiment;

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use signal_core::config::PipelineConfig;
use signal_core::{Config, Event, FeedbackItem, Insight, UserId, UserRecord, Window};

use crate::algorithms::kmeans::KmeansParams;
use crate::embedding::{embedder_from_config, Embedder};
use crate::error::ComputeError;

use self::anomaly::AnomalyDetector;
use self::cohorts::{apply_cohorts, cluster_users};
use self::explain::explain;
use self::features::FeatureTable;
use self::metrics::RunMetrics;
use self::misuse::MisuseDetector;
use self::sentiment::SentimentDetector;

/// Default number of insights shown by listings.
pub const DEFAULT_LISTING_LIMIT: usize = 10;
/// Upper bound for listing limits.
pub const MAX_LISTING_LIMIT: usize = 100;

/// The window's input tables, shared read-only by all detectors.
#[derive(Debug, Clone, Copy)]
pub struct WindowData<'a> {
    pub events: &'a [Event],
    pub feedback: &'a [FeedbackItem],
}

/// A detector turns one window of data into typed findings.
///
/// Detectors hold no mutable state and may run concurrently. An `Err`
/// aborts the whole run.
pub trait Detector: Send + Sync {
    /// Short name for logs and metrics.
    fn name(&self) -> &str;

    fn detect(&self, data: &WindowData<'_>) -> Result<Vec<Insight>, ComputeError>;
}

/// Everything one run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub insights: Vec<Insight>,
    /// Proposed cohort label per active user (already applied in memory).
    pub cohorts: BTreeMap<UserId, String>,
    pub metrics: RunMetrics,
}

struct DetectorOutcome {
    name: String,
    findings: Vec<Insight>,
    elapsed: Duration,
}

/// Main pipeline orchestrator. Build once per process and reuse across windows.
pub struct InsightPipeline {
    config: PipelineConfig,
    detectors: Vec<Box<dyn Detector>>,
}

impl InsightPipeline {
    /// Create a pipeline with the built-in detectors: anomaly, misuse, sentiment.
    pub fn new(config: PipelineConfig, embedder: Arc<dyn Embedder>) -> Self {
        let detectors: Vec<Box<dyn Detector>> = vec![
            Box::new(AnomalyDetector::from_config(&config)),
            Box::new(MisuseDetector::from_config(&config)),
            Box::new(SentimentDetector::from_config(&config, embedder)),
        ];
        Self { config, detectors }
    }

    /// Build from process configuration, selecting the embedding backend once.
    pub fn from_config(config: &Config) -> Self {
        let embedder = embedder_from_config(&config.embedding, &config.ollama);
        Self::new(config.pipeline.clone(), embedder)
    }

    /// Append a detector; its findings follow those of earlier detectors.
    pub fn register(&mut self, detector: Box<dyn Detector>) {
        self.detectors.push(detector);
    }

    pub fn detector_names(&self) -> Vec<&str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn kmeans_params(&self) -> KmeansParams {
        KmeansParams {
            k: self.config.cohort_k,
            max_iterations: self.config.cohort_max_iterations,
            seed: self.config.cohort_seed,
            n_init: self.config.cohort_n_init,
        }
    }

    /// Generate insights for one window. Always returns at least one insight.
    ///
    /// `users` receives the proposed cohort labels in memory; persisting
    /// them and the returned insights is the caller's job.
    pub fn run(
        &self,
        events: &[Event],
        feedback: &[FeedbackItem],
        users: &mut [UserRecord],
        window: &Window,
    ) -> Result<Vec<Insight>, ComputeError> {
        Ok(self.run_with_report(events, feedback, users, window)?.insights)
    }

    /// Like [`run`](Self::run) but also returns cohorts and run metrics.
    pub fn run_with_report(
        &self,
        events: &[Event],
        feedback: &[FeedbackItem],
        users: &mut [UserRecord],
        window: &Window,
    ) -> Result<RunReport, ComputeError> {
        let started = Instant::now();
        info!(
            start = %window.start,
            end = %window.end,
            events = events.len(),
            feedback = feedback.len(),
            users = users.len(),
            "insight run started"
        );

        let mut metrics = RunMetrics {
            events: events.len(),
            feedback_items: feedback.len(),
            users: users.len(),
            ..RunMetrics::default()
        };

        let features = FeatureTable::build(events);
        metrics.active_users = features.len();

        let cohorts = if features.is_empty() {
            debug!("no active users, skipping cohort fit");
            BTreeMap::new()
        } else {
            let fit_started = Instant::now();
            let cohorts = cluster_users(&features, &self.kmeans_params())?;
            metrics.cohort_fit_ms = fit_started.elapsed().as_micros() as f64 / 1000.0;
            cohorts
        };
        metrics.cohorts = cohorts.values().collect::<BTreeSet<_>>().len();
        metrics.relabeled_users = apply_cohorts(users, &cohorts);

        let data = WindowData { events, feedback };
        let mut insights = Vec::new();
        for outcome in self.run_detectors(&data)? {
            metrics.record_detector(&outcome.name, outcome.findings.len(), outcome.elapsed);
            insights.extend(outcome.findings);
        }

        if insights.is_empty() {
            metrics.placeholder_used = true;
            insights.push(Insight::placeholder());
        }

        let records = features.records();
        let insights = insights
            .into_iter()
            .map(|insight| {
                let explanation = explain(&insight.payload);
                insight
                    .with_explanation(explanation)
                    .with_features(records.clone())
            })
            .collect();

        metrics.total_ms = started.elapsed().as_micros() as f64 / 1000.0;
        metrics.log();

        Ok(RunReport {
            insights,
            cohorts,
            metrics,
        })
    }

    /// Output order always follows registration order.
    fn run_detectors(&self, data: &WindowData<'_>) -> Result<Vec<DetectorOutcome>, ComputeError> {
        if self.config.parallel_detectors {
            self.detectors
                .par_iter()
                .map(|d| run_detector(d.as_ref(), data))
                .collect()
        } else {
            self.detectors
                .iter()
                .map(|d| run_detector(d.as_ref(), data))
                .collect()
        }
    }
}

fn run_detector(detector: &dyn Detector, data: &WindowData<'_>) -> Result<DetectorOutcome, ComputeError> {
    let started = Instant::now();
    let findings = detector.detect(data)?;
    Ok(DetectorOutcome {
        name: detector.name().to_string(),
        findings,
        elapsed: started.elapsed(),
    })
}

/// Sort by descending score; ties keep their detector order.
pub fn rank_by_score(insights: &mut [Insight]) {
    insights.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
}

/// Highest-scoring `limit` insights, with `limit` clamped to `1..=100`.
pub fn top_n(mut insights: Vec<Insight>, limit: usize) -> Vec<Insight> {
    rank_by_score(&mut insights);
    insights.truncate(limit.clamp(1, MAX_LISTING_LIMIT));
    insights
}

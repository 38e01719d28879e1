use std::time::Duration;

use serde::Serialize;
use tracing::info;

/// Findings and timing of one detector in one run.
#[derive(Debug, Clone, Serialize)]
pub struct DetectorStats {
    pub detector: String,
    pub findings: usize,
    pub elapsed_ms: f64,
}

/// Summary of a single pipeline run, logged when the run finishes.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunMetrics {
    pub events: usize,
    pub feedback_items: usize,
    pub users: usize,
    /// Users with at least one event in the window.
    pub active_users: usize,
    pub cohorts: usize,
    /// User records whose cohort label changed.
    pub relabeled_users: usize,
    pub cohort_fit_ms: f64,
    pub detectors: Vec<DetectorStats>,
    pub placeholder_used: bool,
    pub total_ms: f64,
}

impl RunMetrics {
    pub fn record_detector(&mut self, detector: &str, findings: usize, elapsed: Duration) {
        self.detectors.push(DetectorStats {
            detector: detector.to_string(),
            findings,
            elapsed_ms: elapsed.as_micros() as f64 / 1000.0,
        });
    }

    pub fn total_findings(&self) -> usize {
        self.detectors.iter().map(|d| d.findings).sum()
    }

    pub fn log(&self) {
        for d in &self.detectors {
            info!(detector = %d.detector, findings = d.findings, elapsed_ms = d.elapsed_ms, "detector finished");
        }
        info!(
            events = self.events,
            feedback = self.feedback_items,
            active_users = self.active_users,
            cohorts = self.cohorts,
            findings = self.total_findings(),
            placeholder = self.placeholder_used,
            total_ms = self.total_ms,
            "insight run complete"
        );
    }
}

//! Silent churn risk: a user's latest daily activity falls well below
//! their own trailing trend.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use signal_core::config::PipelineConfig;
use signal_core::{Event, Insight, InsightPayload, UserId};
use tracing::debug;

use crate::algorithms::rolling::{trailing_stats, z_score};
use crate::error::ComputeError;

use super::{Detector, WindowData};

/// Per-user daily event counts keyed by calendar day (UTC).
/// Days without events are absent.
pub fn daily_counts(events: &[Event]) -> BTreeMap<UserId, BTreeMap<NaiveDate, u64>> {
    let mut daily: BTreeMap<UserId, BTreeMap<NaiveDate, u64>> = BTreeMap::new();
    for event in events {
        *daily
            .entry(event.user_id)
            .or_default()
            .entry(event.timestamp.date_naive())
            .or_insert(0) += 1;
    }
    daily
}

#[derive(Debug, Clone)]
pub struct AnomalyDetector {
    /// Minimum distinct active days before a user is scored.
    pub min_days: usize,
    /// Trailing window for mean and std.
    pub window: usize,
    /// Emit when `z` is strictly below this.
    pub z_threshold: f64,
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl AnomalyDetector {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            min_days: config.anomaly_min_days,
            window: config.anomaly_window,
            z_threshold: config.anomaly_z_threshold,
        }
    }

    /// Score every user with enough history; users are visited in
    /// ascending id order and findings are not ranked.
    pub fn detect(&self, events: &[Event]) -> Vec<Insight> {
        let mut insights = Vec::new();

        for (user_id, days) in daily_counts(events) {
            if days.len() < self.min_days {
                continue;
            }

            let series: Vec<f64> = days.values().map(|&c| c as f64).collect();
            let Some(stats) = trailing_stats(&series, self.window) else {
                continue;
            };
            let Some(&last) = days.values().next_back() else {
                continue;
            };

            let z = z_score(last as f64, &stats);
            debug!(user_id, last, mean = stats.mean, std = stats.std_dev, z, "daily trend scored");

            if z < self.z_threshold {
                insights.push(Insight::new(
                    InsightPayload::SilentChurnRisk {
                        user_id,
                        recent_count: last,
                        mean: stats.mean,
                    },
                    z.abs(),
                ));
            }
        }

        insights
    }
}

impl Detector for AnomalyDetector {
    fn name(&self) -> &str {
        "anomaly"
    }

    fn detect(&self, data: &WindowData<'_>) -> Result<Vec<Insight>, ComputeError> {
        Ok(AnomalyDetector::detect(self, data.events))
    }
}

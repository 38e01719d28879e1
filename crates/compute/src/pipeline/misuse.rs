//! Feature misuse: users who trigger a fixed metadata pattern too often.

use std::collections::BTreeMap;

use signal_core::config::PipelineConfig;
use signal_core::{Event, Insight, InsightPayload, UserId};

use crate::error::ComputeError;

use super::{Detector, WindowData};

/// Metadata key the misuse rules match on.
pub const FEATURE_KEY: &str = "feature";

/// One fixed pattern: `metadata.feature == feature`, at least `min_count` times.
#[derive(Debug, Clone, PartialEq)]
pub struct MisuseRule {
    pub feature: String,
    pub min_count: u64,
}

impl MisuseRule {
    pub fn new(feature: impl Into<String>, min_count: u64) -> Self {
        Self {
            feature: feature.into(),
            min_count,
        }
    }

    pub fn matches(&self, event: &Event) -> bool {
        event.metadata_str(FEATURE_KEY) == Some(self.feature.as_str())
    }

    /// Flag every user whose matching-event count reaches `min_count`.
    pub fn evaluate(&self, events: &[Event]) -> Vec<Insight> {
        let mut counts: BTreeMap<UserId, u64> = BTreeMap::new();
        for event in events.iter().filter(|e| self.matches(e)) {
            *counts.entry(event.user_id).or_insert(0) += 1;
        }

        counts
            .into_iter()
            .filter(|&(_, count)| count >= self.min_count)
            .map(|(user_id, count)| {
                Insight::new(
                    InsightPayload::FeatureMisuse {
                        user_id,
                        feature: self.feature.clone(),
                        count,
                    },
                    count as f64,
                )
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct MisuseDetector {
    rules: Vec<MisuseRule>,
}

impl Default for MisuseDetector {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl MisuseDetector {
    /// The single configured rule (`export` by default).
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::with_rules(vec![MisuseRule::new(
            config.misuse_feature.clone(),
            config.misuse_min_count,
        )])
    }

    pub fn with_rules(rules: Vec<MisuseRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[MisuseRule] {
        &self.rules
    }

    pub fn detect(&self, events: &[Event]) -> Vec<Insight> {
        self.rules.iter().flat_map(|rule| rule.evaluate(events)).collect()
    }
}

impl Detector for MisuseDetector {
    fn name(&self) -> &str {
        "misuse"
    }

    fn detect(&self, data: &WindowData<'_>) -> Result<Vec<Insight>, ComputeError> {
        Ok(MisuseDetector::detect(self, data.events))
    }
}

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SignalError;
use crate::event::{FeatureRow, UserId};

/// Kinds of findings the pipeline can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightType {
    /// Daily activity dropped sharply against the user's own trend.
    SilentChurnRisk,
    /// A fixed metadata pattern was triggered repeatedly.
    FeatureMisuse,
    /// Feedback wording disagrees with its numeric rating.
    SentimentMismatch,
}

impl InsightType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsightType::SilentChurnRisk => "silent_churn_risk",
            InsightType::FeatureMisuse => "feature_misuse",
            InsightType::SentimentMismatch => "sentiment_mismatch",
        }
    }
}

impl fmt::Display for InsightType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for InsightType {
    type Err = SignalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "silent_churn_risk" => Ok(InsightType::SilentChurnRisk),
            "feature_misuse" => Ok(InsightType::FeatureMisuse),
            "sentiment_mismatch" => Ok(InsightType::SentimentMismatch),
            _ => Err(SignalError::InvalidInput(format!("unknown insight type: {s}"))),
        }
    }
}

/// Type-specific facts behind an insight.
///
/// Serialized as a flat object; the variant is carried by [`Insight::insight_type`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InsightPayload {
    SilentChurnRisk {
        user_id: UserId,
        recent_count: u64,
        mean: f64,
    },
    FeatureMisuse {
        user_id: UserId,
        feature: String,
        count: u64,
    },
    SentimentMismatch {
        user_id: UserId,
        rating: i64,
        text: String,
    },
}

impl InsightPayload {
    pub fn insight_type(&self) -> InsightType {
        match self {
            InsightPayload::SilentChurnRisk { .. } => InsightType::SilentChurnRisk,
            InsightPayload::FeatureMisuse { .. } => InsightType::FeatureMisuse,
            InsightPayload::SentimentMismatch { .. } => InsightType::SentimentMismatch,
        }
    }

    pub fn user_id(&self) -> UserId {
        match self {
            InsightPayload::SilentChurnRisk { user_id, .. }
            | InsightPayload::FeatureMisuse { user_id, .. }
            | InsightPayload::SentimentMismatch { user_id, .. } => *user_id,
        }
    }

    /// Payload facts as `(key, value)` pairs in declaration order.
    ///
    /// `mean` is a float and keeps its decimal point, so the placeholder
    /// renders `mean=0.0` rather than `mean=0`.
    pub fn facts(&self) -> Vec<(&'static str, String)> {
        match self {
            InsightPayload::SilentChurnRisk {
                user_id,
                recent_count,
                mean,
            } => vec![
                ("user_id", user_id.to_string()),
                ("recent_count", recent_count.to_string()),
                ("mean", format!("{:?}", mean)),
            ],
            InsightPayload::FeatureMisuse {
                user_id,
                feature,
                count,
            } => vec![
                ("user_id", user_id.to_string()),
                ("feature", feature.clone()),
                ("count", count.to_string()),
            ],
            InsightPayload::SentimentMismatch {
                user_id,
                rating,
                text,
            } => vec![
                ("user_id", user_id.to_string()),
                ("rating", rating.to_string()),
                ("text", text.clone()),
            ],
        }
    }
}

/// A scored, explained finding handed to the caller for persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub insight_type: InsightType,
    /// Always non-negative.
    pub score: f64,
    pub payload: InsightPayload,
    pub explanation: Option<String>,
    /// Feature table of the window that produced this insight, for display.
    #[serde(default)]
    pub features: Vec<FeatureRow>,
}

impl Insight {
    /// Create an insight; the type follows the payload and the score is made non-negative.
    pub fn new(payload: InsightPayload, score: f64) -> Self {
        Self {
            insight_type: payload.insight_type(),
            score: score.abs(),
            payload,
            explanation: None,
            features: Vec::new(),
        }
    }

    /// The fallback emitted when a window yields no findings at all.
    pub fn placeholder() -> Self {
        Self::new(
            InsightPayload::SilentChurnRisk {
                user_id: 0,
                recent_count: 0,
                mean: 0.0,
            },
            0.1,
        )
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    pub fn with_features(mut self, features: Vec<FeatureRow>) -> Self {
        self.features = features;
        self
    }
}

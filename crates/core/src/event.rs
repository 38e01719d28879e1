use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, SignalError};

/// User identifier as assigned by the storage layer.
pub type UserId = i64;

/// A single product-usage event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub user_id: UserId,
    pub event_type: String,
    /// Free-form attributes; `null` or absent is treated as empty.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub metadata: Map<String, Value>,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    pub fn new(user_id: UserId, event_type: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            user_id,
            event_type: event_type.into(),
            metadata: Map::new(),
            timestamp,
        }
    }

    /// Attach a metadata attribute.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Extract a metadata attribute as a string, `None` when absent or not a string.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

/// A free-text feedback item with an optional 1–5 rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackItem {
    pub user_id: UserId,
    pub text: String,
    #[serde(default)]
    pub rating: Option<i64>,
    pub timestamp: DateTime<Utc>,
}

impl FeedbackItem {
    pub fn new(
        user_id: UserId,
        text: impl Into<String>,
        rating: Option<i64>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            text: text.into(),
            rating,
            timestamp,
        }
    }
}

/// A user as known to the storage layer. `cohort_label` may be rewritten
/// in memory by the pipeline; persisting it is the caller's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: UserId,
    #[serde(default = "default_plan")]
    pub plan: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub cohort_label: Option<String>,
}

fn default_plan() -> String {
    "free".to_string()
}

impl UserRecord {
    pub fn new(user_id: UserId, plan: impl Into<String>) -> Self {
        Self {
            user_id,
            plan: plan.into(),
            country: None,
            cohort_label: None,
        }
    }
}

/// Per-user feature record: one count per observed event type plus
/// the derived `event_count` total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub user_id: UserId,
    #[serde(flatten)]
    pub counts: BTreeMap<String, u64>,
}

impl FeatureRow {
    /// Look up a named column, `0` for event types the user never triggered.
    pub fn get(&self, column: &str) -> u64 {
        self.counts.get(column).copied().unwrap_or(0)
    }
}

/// Inclusive analysis window `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start > end {
            return Err(SignalError::InvalidWindow {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts <= self.end
    }

    /// Copy the events that fall inside the window.
    pub fn scope_events(&self, events: &[Event]) -> Vec<Event> {
        events
            .iter()
            .filter(|e| self.contains(e.timestamp))
            .cloned()
            .collect()
    }

    /// Copy the feedback items that fall inside the window.
    pub fn scope_feedback(&self, feedback: &[FeedbackItem]) -> Vec<FeedbackItem> {
        feedback
            .iter()
            .filter(|f| self.contains(f.timestamp))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn window_rejects_inverted_bounds() {
        let err = Window::new(ts(5), ts(1)).unwrap_err();
        assert!(matches!(err, SignalError::InvalidWindow { .. }));
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let window = Window::new(ts(1), ts(3)).unwrap();
        assert!(window.contains(ts(1)));
        assert!(window.contains(ts(3)));
        assert!(!window.contains(ts(4)));
    }

    #[test]
    fn scope_events_filters_outside_window() {
        let window = Window::new(ts(2), ts(3)).unwrap();
        let events = vec![
            Event::new(1, "login", ts(1)),
            Event::new(1, "login", ts(2)),
            Event::new(2, "login", ts(3)),
            Event::new(2, "login", ts(9)),
        ];
        let scoped = window.scope_events(&events);
        assert_eq!(scoped.len(), 2);
        assert!(scoped.iter().all(|e| window.contains(e.timestamp)));
    }

    #[test]
    fn event_metadata_null_or_missing_is_empty() {
        let with_null: Event = serde_json::from_str(
            r#"{"user_id":1,"event_type":"login","metadata":null,"timestamp":"2026-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert!(with_null.metadata.is_empty());

        let missing: Event = serde_json::from_str(
            r#"{"user_id":1,"event_type":"login","timestamp":"2026-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert!(missing.metadata.is_empty());
    }

    #[test]
    fn metadata_str_ignores_non_strings() {
        let event = Event::new(1, "feature_use", ts(1))
            .with_metadata("feature", "export")
            .with_metadata("attempts", 3);
        assert_eq!(event.metadata_str("feature"), Some("export"));
        assert_eq!(event.metadata_str("attempts"), None);
        assert_eq!(event.metadata_str("missing"), None);
    }

    #[test]
    fn non_numeric_rating_is_rejected() {
        let result: std::result::Result<FeedbackItem, _> = serde_json::from_str(
            r#"{"user_id":1,"text":"ok","rating":"five","timestamp":"2026-01-01T00:00:00Z"}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn feature_row_serializes_flat() {
        let mut counts = BTreeMap::new();
        counts.insert("login".to_string(), 2);
        counts.insert("event_count".to_string(), 2);
        let row = FeatureRow { user_id: 7, counts };

        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["user_id"], 7);
        assert_eq!(json["login"], 2);
        assert_eq!(json["event_count"], 2);
        assert_eq!(row.get("signup"), 0);
    }
}

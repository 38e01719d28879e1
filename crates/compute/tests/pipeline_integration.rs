//! End-to-end tests for the insight pipeline over small fixed windows.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use signal_compute::pipeline::anomaly::AnomalyDetector;
use signal_compute::pipeline::misuse::MisuseDetector;
use signal_compute::pipeline::sentiment::SentimentDetector;
use signal_compute::{InsightPipeline, SeededEmbedder};
use signal_core::config::PipelineConfig;
use signal_core::{Event, FeedbackItem, InsightPayload, InsightType, UserId, UserRecord, Window};

// ============================================================================
// Test Helpers
// ============================================================================

fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, day, 9, 30, 0).unwrap()
}

fn january() -> Window {
    Window::new(
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2026, 1, 31, 23, 59, 59).unwrap(),
    )
    .unwrap()
}

fn pipeline_with(config: PipelineConfig) -> InsightPipeline {
    InsightPipeline::new(config, Arc::new(SeededEmbedder::new(42, 8)))
}

fn pipeline() -> InsightPipeline {
    pipeline_with(PipelineConfig::default())
}

fn export(user_id: UserId, day: u32) -> Event {
    Event::new(user_id, "feature_use", at(day)).with_metadata("feature", "export")
}

fn login(user_id: UserId, day: u32) -> Event {
    Event::new(user_id, "login", at(day))
}

/// Three users: user 1 exports three times, user 2 logs in five times with
/// the last login after a gap, user 3 leaves a low rating with positive words.
fn fixture() -> (Vec<Event>, Vec<FeedbackItem>, Vec<UserRecord>) {
    let events = vec![
        export(1, 1),
        export(1, 2),
        export(1, 3),
        login(2, 1),
        login(2, 1),
        login(2, 2),
        login(2, 2),
        login(2, 10),
    ];
    let feedback = vec![FeedbackItem::new(3, "I love this product", Some(1), at(2))];
    let users = vec![
        UserRecord::new(1, "free"),
        UserRecord::new(2, "pro"),
        UserRecord::new(3, "free"),
    ];
    (events, feedback, users)
}

fn partition(labels: &BTreeMap<UserId, String>) -> BTreeSet<BTreeSet<UserId>> {
    let mut groups: BTreeMap<&String, BTreeSet<UserId>> = BTreeMap::new();
    for (user, label) in labels {
        groups.entry(label).or_default().insert(*user);
    }
    groups.into_values().collect()
}

// ============================================================================
// Pipeline
// ============================================================================

#[test]
fn fixture_yields_all_three_insight_types() {
    let (events, feedback, mut users) = fixture();
    let insights = pipeline().run(&events, &feedback, &mut users, &january()).unwrap();

    let types: BTreeSet<InsightType> = insights.iter().map(|i| i.insight_type).collect();
    assert_eq!(
        types,
        BTreeSet::from([
            InsightType::SilentChurnRisk,
            InsightType::FeatureMisuse,
            InsightType::SentimentMismatch,
        ])
    );

    let churn = insights
        .iter()
        .find(|i| i.insight_type == InsightType::SilentChurnRisk)
        .unwrap();
    assert_eq!(churn.payload.user_id(), 2);
    assert!(insights.iter().all(|i| i.score >= 0.0));
}

#[test]
fn fixture_findings_follow_detector_order() {
    let (events, feedback, mut users) = fixture();
    let insights = pipeline().run(&events, &feedback, &mut users, &january()).unwrap();
    let order: Vec<InsightType> = insights.iter().map(|i| i.insight_type).collect();
    assert_eq!(
        order,
        vec![
            InsightType::SilentChurnRisk,
            InsightType::FeatureMisuse,
            InsightType::SentimentMismatch,
        ]
    );
}

#[test]
fn fixture_stamps_feature_records_on_every_insight() {
    let (events, feedback, mut users) = fixture();
    let insights = pipeline().run(&events, &feedback, &mut users, &january()).unwrap();

    for insight in &insights {
        // Only users 1 and 2 had events.
        let ids: Vec<UserId> = insight.features.iter().map(|r| r.user_id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(insight.features[1].get("login"), 5);
        assert_eq!(insight.features[1].get("event_count"), 5);
        assert!(insight
            .explanation
            .as_deref()
            .unwrap()
            .contains(&format!("Insight type: {}", insight.insight_type)));
    }
}

#[test]
fn cohorts_are_applied_to_active_users_only() {
    let (events, feedback, mut users) = fixture();
    let report = pipeline()
        .run_with_report(&events, &feedback, &mut users, &january())
        .unwrap();

    assert_eq!(report.cohorts.len(), 2);
    assert!(users[0].cohort_label.is_some());
    assert!(users[1].cohort_label.is_some());
    assert!(users[2].cohort_label.is_none());
    assert_eq!(report.metrics.active_users, 2);
    assert!(!report.metrics.placeholder_used);
}

#[test]
fn identical_input_gives_identical_findings() {
    let (events, feedback, users) = fixture();

    let mut first_users = users.clone();
    let first = pipeline()
        .run_with_report(&events, &feedback, &mut first_users, &january())
        .unwrap();
    let mut second_users = users;
    let second = pipeline()
        .run_with_report(&events, &feedback, &mut second_users, &january())
        .unwrap();

    assert_eq!(first.insights, second.insights);
    assert_eq!(partition(&first.cohorts), partition(&second.cohorts));
}

#[test]
fn parallel_detectors_match_sequential_output() {
    let (events, feedback, users) = fixture();
    let sequential = pipeline()
        .run(&events, &feedback, &mut users.clone(), &january())
        .unwrap();
    let parallel = pipeline_with(PipelineConfig {
        parallel_detectors: true,
        ..PipelineConfig::default()
    })
    .run(&events, &feedback, &mut users.clone(), &january())
    .unwrap();
    assert_eq!(sequential, parallel);
}

#[test]
fn empty_tables_give_exactly_one_placeholder() {
    assert!(AnomalyDetector::default().detect(&[]).is_empty());
    assert!(MisuseDetector::default().detect(&[]).is_empty());
    assert!(SentimentDetector::new(Arc::new(SeededEmbedder::new(42, 8)), 0.05)
        .detect(&[])
        .is_empty());

    let mut users = vec![UserRecord::new(1, "free")];
    let insights = pipeline().run(&[], &[], &mut users, &january()).unwrap();

    assert_eq!(insights.len(), 1);
    assert_eq!(insights[0].insight_type, InsightType::SilentChurnRisk);
    assert_eq!(insights[0].score, 0.1);
    assert_eq!(
        insights[0].payload,
        InsightPayload::SilentChurnRisk {
            user_id: 0,
            recent_count: 0,
            mean: 0.0,
        }
    );
    assert!(users[0].cohort_label.is_none());
}

#[test]
fn quiet_window_still_returns_placeholder() {
    // Activity without any finding: two exports and a steady login series.
    let events = vec![export(1, 1), export(1, 2), login(2, 1), login(2, 2), login(2, 3)];
    let feedback = vec![FeedbackItem::new(3, "Great product", Some(5), at(2))];
    let mut users = Vec::new();

    let insights = pipeline().run(&events, &feedback, &mut users, &january()).unwrap();
    assert_eq!(insights.len(), 1);
    assert_eq!(insights[0].payload.user_id(), 0);
    assert_eq!(insights[0].features.len(), 2);
}

#[test]
fn tuned_thresholds_change_findings() {
    let events: Vec<Event> = (1..=2).map(|d| export(1, d)).collect();
    let mut users = Vec::new();
    let insights = pipeline_with(PipelineConfig {
        misuse_min_count: 2,
        ..PipelineConfig::default()
    })
    .run(&events, &[], &mut users, &january())
    .unwrap();

    assert_eq!(insights[0].insight_type, InsightType::FeatureMisuse);
    assert_eq!(insights[0].score, 2.0);
}

#[test]
fn report_serializes_for_callers() {
    let (events, feedback, mut users) = fixture();
    let report = pipeline()
        .run_with_report(&events, &feedback, &mut users, &january())
        .unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["insights"].as_array().unwrap().len(), 3);
    assert_eq!(json["insights"][1]["type"], "feature_misuse");
    assert_eq!(json["insights"][1]["payload"]["feature"], "export");
    assert!(json["cohorts"]["1"].as_str().unwrap().starts_with("cohort_"));
    assert_eq!(json["metrics"]["detectors"].as_array().unwrap().len(), 3);
}

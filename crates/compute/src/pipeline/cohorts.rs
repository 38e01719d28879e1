use std::collections::BTreeMap;

use signal_core::{UserId, UserRecord};
use tracing::debug;

use crate::algorithms::kmeans::{kmeans, KmeansError, KmeansParams};

use super::features::FeatureTable;

/// Label used for cluster `index`.
pub fn cohort_label(index: usize) -> String {
    format!("cohort_{index}")
}

/// Group active users into cohorts by their feature vectors.
///
/// `params.k` is clamped to `min(k, max(1, rows))`. An empty table gives an
/// empty mapping. Every call refits from scratch, so label indices carry no
/// meaning across windows.
pub fn cluster_users(
    table: &FeatureTable,
    params: &KmeansParams,
) -> Result<BTreeMap<UserId, String>, KmeansError> {
    if table.is_empty() {
        return Ok(BTreeMap::new());
    }

    let points = table.points();
    let k = params.k.min(points.len().max(1));
    let params = KmeansParams {
        k,
        ..params.clone()
    };

    let result = kmeans(&points, &params)?;
    debug!(
        users = points.len(),
        k,
        iterations = result.iterations,
        inertia = result.inertia,
        "cohort fit complete"
    );

    Ok(result
        .assignments
        .into_iter()
        .map(|(user_id, cluster)| (user_id, cohort_label(cluster)))
        .collect())
}

/// Write proposed labels into the in-memory user records.
///
/// Users absent from `cohorts` keep their label. Returns the number of
/// records whose label changed.
pub fn apply_cohorts(users: &mut [UserRecord], cohorts: &BTreeMap<UserId, String>) -> usize {
    let mut changed = 0;
    for user in users.iter_mut() {
        if let Some(label) = cohorts.get(&user.user_id) {
            if user.cohort_label.as_deref() != Some(label.as_str()) {
                user.cohort_label = Some(label.clone());
                changed += 1;
            }
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use signal_core::Event;
    use std::collections::BTreeSet;

    fn events_for(user_id: UserId, event_type: &str, count: usize) -> Vec<Event> {
        (0..count)
            .map(|_| Event::new(user_id, event_type, Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()))
            .collect()
    }

    #[test]
    fn empty_table_yields_empty_mapping() {
        let cohorts = cluster_users(&FeatureTable::default(), &KmeansParams::default()).unwrap();
        assert!(cohorts.is_empty());
    }

    #[test]
    fn single_user_gets_single_cohort() {
        let table = FeatureTable::build(&events_for(1, "login", 4));
        let cohorts = cluster_users(&table, &KmeansParams::default()).unwrap();
        assert_eq!(cohorts.len(), 1);
        assert_eq!(cohorts[&1], "cohort_0");
    }

    #[test]
    fn two_users_never_exceed_two_cohorts() {
        let mut events = events_for(1, "login", 1);
        events.extend(events_for(2, "export", 9));
        let table = FeatureTable::build(&events);
        let cohorts = cluster_users(&table, &KmeansParams::default()).unwrap();

        assert_eq!(cohorts.len(), 2);
        let labels: BTreeSet<&String> = cohorts.values().collect();
        assert!(labels.len() <= 2);
    }

    #[test]
    fn separates_heavy_and_light_users() {
        let mut events = Vec::new();
        for uid in 1..=4 {
            events.extend(events_for(uid, "login", 1));
        }
        for uid in 5..=8 {
            events.extend(events_for(uid, "login", 50));
        }
        let table = FeatureTable::build(&events);
        let params = KmeansParams {
            k: 2,
            ..KmeansParams::default()
        };
        let cohorts = cluster_users(&table, &params).unwrap();

        assert!((2..=4).all(|uid| cohorts[&uid] == cohorts[&1]));
        assert!((6..=8).all(|uid| cohorts[&uid] == cohorts[&5]));
        assert_ne!(cohorts[&1], cohorts[&5]);
    }

    #[test]
    fn apply_only_touches_clustered_users() {
        let mut users = vec![UserRecord::new(1, "free"), UserRecord::new(2, "pro")];
        users[1].cohort_label = Some("legacy".into());
        let mut cohorts = BTreeMap::new();
        cohorts.insert(1, cohort_label(0));

        assert_eq!(apply_cohorts(&mut users, &cohorts), 1);
        assert_eq!(users[0].cohort_label.as_deref(), Some("cohort_0"));
        assert_eq!(users[1].cohort_label.as_deref(), Some("legacy"));
        // Re-applying the same labels changes nothing.
        assert_eq!(apply_cohorts(&mut users, &cohorts), 0);
    }
}

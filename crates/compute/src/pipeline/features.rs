use std::collections::{BTreeMap, BTreeSet};

use signal_core::{Event, FeatureRow, UserId};

/// Name of the derived per-user total column.
pub const EVENT_COUNT: &str = "event_count";

/// Per-user event-type counts for one analysis window.
///
/// Rows exist only for users with at least one event. Columns are the union
/// of observed event types plus [`EVENT_COUNT`]; consumers look columns up by
/// name and must not rely on their order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureTable {
    event_types: BTreeSet<String>,
    rows: BTreeMap<UserId, BTreeMap<String, u64>>,
}

impl FeatureTable {
    /// Aggregate a window's events into one row per active user.
    pub fn build(events: &[Event]) -> Self {
        let mut table = Self::default();
        for event in events {
            table.event_types.insert(event.event_type.clone());
            *table
                .rows
                .entry(event.user_id)
                .or_default()
                .entry(event.event_type.clone())
                .or_insert(0) += 1;
        }
        table
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of active users.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Column names: observed event types, then [`EVENT_COUNT`].
    pub fn columns(&self) -> Vec<&str> {
        self.event_types
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(EVENT_COUNT))
            .collect()
    }

    /// Named lookup. `None` for an inactive user or an unknown column;
    /// known columns the user never triggered read as `0`.
    pub fn value(&self, user_id: UserId, column: &str) -> Option<u64> {
        let row = self.rows.get(&user_id)?;
        if column == EVENT_COUNT {
            return Some(row.values().sum());
        }
        if !self.event_types.contains(column) {
            return None;
        }
        Some(row.get(column).copied().unwrap_or(0))
    }

    /// Numeric matrix for clustering: every column except the user id,
    /// in one fixed order shared by all rows.
    pub fn points(&self) -> Vec<(UserId, Vec<f64>)> {
        self.rows
            .iter()
            .map(|(&user_id, counts)| {
                let mut vec: Vec<f64> = self
                    .event_types
                    .iter()
                    .map(|ty| counts.get(ty).copied().unwrap_or(0) as f64)
                    .collect();
                vec.push(counts.values().sum::<u64>() as f64);
                (user_id, vec)
            })
            .collect()
    }

    /// One record per active user with every column filled (missing counts are 0).
    pub fn records(&self) -> Vec<FeatureRow> {
        self.rows
            .iter()
            .map(|(&user_id, counts)| {
                let mut row: BTreeMap<String, u64> = self
                    .event_types
                    .iter()
                    .map(|ty| (ty.clone(), counts.get(ty).copied().unwrap_or(0)))
                    .collect();
                row.insert(EVENT_COUNT.to_string(), counts.values().sum());
                FeatureRow {
                    user_id,
                    counts: row,
                }
            })
            .collect()
    }
}

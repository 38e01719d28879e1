use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use signal_core::{Event, FeedbackItem, UserRecord, Window};

/// Tables for one run, already scoped to the window.
#[derive(Debug, Default)]
pub struct Inputs {
    pub events: Vec<Event>,
    pub feedback: Vec<FeedbackItem>,
    pub users: Vec<UserRecord>,
}

/// Read a JSON array file into records.
pub fn read_json_array<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let raw = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let records: Vec<T> =
        serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))?;
    debug!(path = %path.display(), records = records.len(), "loaded input");
    Ok(records)
}

pub fn write_json<T: Serialize>(path: &Path, value: &T, pretty: bool) -> Result<()> {
    let body = to_json(value, pretty)?;
    fs::write(path, body).with_context(|| format!("failed to write {}", path.display()))
}

pub fn to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    let body = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(body)
}

/// Load the input tables, dropping events and feedback outside `window`.
/// User records are kept whole.
pub fn load_inputs(
    events: &Path,
    feedback: Option<&Path>,
    users: Option<&Path>,
    window: &Window,
) -> Result<Inputs> {
    let events = window.scope_events(&read_json_array(events)?);
    let feedback = match feedback {
        Some(path) => window.scope_feedback(&read_json_array(path)?),
        None => Vec::new(),
    };
    let users = match users {
        Some(path) => read_json_array(path)?,
        None => Vec::new(),
    };

    Ok(Inputs {
        events,
        feedback,
        users,
    })
}

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::Parser;

/// Batch insight run over one closed time window.
///
/// Reads events, feedback and user records as JSON arrays, clusters active
/// users into cohorts, runs the detectors and prints the report as JSON.
#[derive(Parser, Debug)]
#[command(name = "signal-insights", version, about)]
pub struct CliArgs {
    /// JSON array of events
    #[arg(long)]
    pub events: PathBuf,

    /// JSON array of feedback items
    #[arg(long)]
    pub feedback: Option<PathBuf>,

    /// JSON array of user records; relabeled in memory with cohort labels
    #[arg(long)]
    pub users: Option<PathBuf>,

    /// Window start (RFC 3339, inclusive)
    #[arg(long)]
    pub start: DateTime<Utc>,

    /// Window end (RFC 3339, inclusive)
    #[arg(long)]
    pub end: DateTime<Utc>,

    /// Config profile (overrides SIGNAL_PROFILE)
    #[arg(long, env = "SIGNAL_PROFILE", default_value = "")]
    pub profile: String,

    /// Number of cohorts override
    #[arg(long)]
    pub k: Option<usize>,

    /// Embedding backend override: ollama or seeded
    #[arg(long)]
    pub embedding_provider: Option<String>,

    /// Run detectors on the rayon pool
    #[arg(long)]
    pub parallel: bool,

    /// Only keep the N highest-scoring insights (default 10, clamped to 1..=100)
    #[arg(long, value_name = "N")]
    pub top: Option<Option<usize>>,

    /// Write the relabeled user records to this path
    #[arg(long)]
    pub users_out: Option<PathBuf>,

    /// Write the report here instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,
}

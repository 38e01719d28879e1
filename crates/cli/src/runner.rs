use anyhow::{Context, Result};
use tracing::info;

use signal_compute::pipeline::DEFAULT_LISTING_LIMIT;
use signal_compute::{top_n, InsightPipeline, RunReport};
use signal_core::{Config, Window};

use crate::cli::CliArgs;
use crate::input::{load_inputs, write_json};

/// Apply command-line overrides on top of the environment config.
pub fn apply_overrides(config: &mut Config, args: &CliArgs) {
    if let Some(k) = args.k {
        config.pipeline.cohort_k = k;
    }
    if let Some(provider) = &args.embedding_provider {
        config.embedding.provider = provider.clone();
    }
    if args.parallel {
        config.pipeline.parallel_detectors = true;
    }
}

/// Load inputs, run the pipeline once and return the report.
pub fn run(args: &CliArgs, config: &Config) -> Result<RunReport> {
    let window = Window::new(args.start, args.end)?;
    let mut inputs = load_inputs(
        &args.events,
        args.feedback.as_deref(),
        args.users.as_deref(),
        &window,
    )?;

    let pipeline = InsightPipeline::from_config(config);
    info!(
        detectors = ?pipeline.detector_names(),
        parallel = pipeline.config().parallel_detectors,
        "pipeline ready"
    );

    let mut report = pipeline
        .run_with_report(&inputs.events, &inputs.feedback, &mut inputs.users, &window)
        .context("insight run failed")?;

    if let Some(limit) = args.top {
        report.insights = top_n(report.insights, limit.unwrap_or(DEFAULT_LISTING_LIMIT));
    }

    if let Some(path) = &args.users_out {
        write_json(path, &inputs.users, args.pretty)?;
        info!(path = %path.display(), users = inputs.users.len(), "user records written");
    }

    Ok(report)
}

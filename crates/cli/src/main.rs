mod cli;
mod input;
mod runner;

use std::io::Write;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use signal_core::config::load_dotenv;
use signal_core::Config;

use crate::cli::CliArgs;
use crate::input::{to_json, write_json};

fn main() -> Result<()> {
    // Logs go to stderr so stdout stays clean JSON.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    load_dotenv();
    let args = CliArgs::parse();

    let mut config = Config::for_profile(&args.profile);
    runner::apply_overrides(&mut config, &args);
    config.log_summary();

    let report = runner::run(&args, &config)?;

    match &args.output {
        Some(path) => {
            write_json(path, &report, args.pretty)?;
            info!(path = %path.display(), insights = report.insights.len(), "report written");
        }
        None => {
            let body = to_json(&report, args.pretty)?;
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{body}").context("failed to write report")?;
        }
    }

    Ok(())
}

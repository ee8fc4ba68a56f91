//! sessionscope-aggregate - CLI tool to compute corpus-wide statistics
//!
//! Runs import and extraction over a transcript directory, aggregates the
//! metrics set, and prints the aggregate report. An empty corpus is a hard
//! failure with a nonzero exit.

use anyhow::{Context, Result};
use clap::Parser;
use sessionscope_core::{Aggregator, Config, Pipeline, ReportWriter};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sessionscope-aggregate")]
#[command(about = "Aggregate session metrics into a corpus report")]
#[command(version)]
struct Args {
    /// Directory containing raw transcript files (*.jsonl)
    #[arg(short, long)]
    source: PathBuf,

    /// Also write aggregate_report.json into this directory
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    Config::ensure_xdg_env();
    let config = Config::load().context("failed to load configuration")?;
    let _log_guard =
        sessionscope_core::logging::init(&config.logging).context("failed to initialize logging")?;

    let pipeline = Pipeline::new(&config);
    let (metrics, files_skipped, excluded) = pipeline
        .collect_metrics(&args.source)
        .context("failed to extract metrics")?;

    if files_skipped > 0 || !excluded.is_empty() {
        eprintln!(
            "warning: {} file(s) skipped, {} session(s) excluded",
            files_skipped,
            excluded.len()
        );
    }

    let aggregator = Aggregator::new(config.complexity.clone());
    let report = aggregator
        .aggregate(&metrics)
        .context("failed to aggregate corpus")?;

    println!("{}", serde_json::to_string_pretty(&report)?);

    if let Some(output) = &args.output {
        let path = ReportWriter::new(output)
            .write_aggregate(&report)
            .context("failed to write aggregate report")?;
        eprintln!("wrote {}", path.display());
    }

    Ok(())
}

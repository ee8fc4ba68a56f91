//! sessionscope-report - full pipeline CLI
//!
//! Imports a transcript directory, extracts per-session metrics, aggregates
//! them, and writes the complete report layout to the output directory.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use sessionscope_core::{Aggregator, Config, MetricExtractor, ReportWriter, SessionImporter};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sessionscope-report")]
#[command(about = "Run the full session-metrics pipeline over a transcript corpus")]
#[command(version)]
struct Args {
    /// Directory containing raw transcript files (*.jsonl)
    #[arg(short, long)]
    source: PathBuf,

    /// Directory the report layout is written to
    #[arg(short, long)]
    output: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();

    Config::ensure_xdg_env();
    let config = Config::load().context("failed to load configuration")?;
    let _log_guard =
        sessionscope_core::logging::init(&config.logging).context("failed to initialize logging")?;

    tracing::info!(
        source = %args.source.display(),
        output = %args.output.display(),
        "Pipeline starting"
    );

    let importer = SessionImporter::new(&args.source);
    let files = importer
        .discover_files()
        .context("failed to discover transcripts")?;

    let bar = ProgressBar::new(files.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}")
            .expect("valid progress template"),
    );
    bar.set_message("importing");

    let mut session_iter = importer.sessions().context("failed to start import")?;
    let mut sessions = Vec::new();
    for session in session_iter.by_ref() {
        bar.inc(1);
        sessions.push(session);
    }
    bar.finish_and_clear();

    let skipped = session_iter.skipped;
    for (path, reason) in &skipped {
        eprintln!("warning: skipped {}: {}", path.display(), reason);
    }

    let extractor = MetricExtractor::new(config.scoring.clone());
    let (metrics, excluded) = extractor.extract_all(&sessions);
    for (session_id, reason) in &excluded {
        eprintln!("warning: excluded session {}: {}", session_id, reason);
    }

    let aggregator = Aggregator::new(config.complexity.clone());
    let report = aggregator
        .aggregate(&metrics)
        .context("failed to aggregate corpus")?;

    let writer = ReportWriter::new(&args.output);
    let summary = writer
        .write(&report, &metrics)
        .context("failed to write report")?;

    println!("Report complete:");
    println!("  Sessions aggregated: {}", metrics.len());
    println!("  Files skipped:       {}", skipped.len());
    println!("  Sessions excluded:   {}", excluded.len());
    println!("  Aggregate report:    {}", summary.aggregate_path.display());
    println!("  Session files:       {}", summary.session_files.len());
    if let Some(ratio) = report.complexity.session_length_ratio {
        println!("  Complexity ratio:    {:.2}x", ratio);
    }
    println!(
        "  Mean delegation:     {:.2}",
        report.mean_delegation_score
    );

    Ok(())
}

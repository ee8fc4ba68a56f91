//! sessionscope-extract - CLI tool to compute per-session metrics
//!
//! Runs the importer and metric extractor over a transcript directory and
//! writes one metrics file per session.

use anyhow::{Context, Result};
use clap::Parser;
use sessionscope_core::{Config, Pipeline, ReportWriter};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sessionscope-extract")]
#[command(about = "Compute per-session metrics from a transcript directory")]
#[command(version)]
struct Args {
    /// Directory containing raw transcript files (*.jsonl)
    #[arg(short, long)]
    source: PathBuf,

    /// Directory the per-session metrics files are written to
    #[arg(short, long)]
    output: PathBuf,
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

    for (session_id, reason) in &excluded {
        eprintln!("warning: excluded session {}: {}", session_id, reason);
    }

    let writer = ReportWriter::new(&args.output);
    let session_files = writer
        .write_sessions(&metrics)
        .context("failed to write session metrics")?;

    println!(
        "Extracted {} session(s) to {} ({} file(s) skipped, {} session(s) excluded)",
        session_files.len(),
        writer.sessions_dir().display(),
        files_skipped,
        excluded.len()
    );

    Ok(())
}

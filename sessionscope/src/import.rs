//! sessionscope-import - CLI tool to inspect a transcript corpus
//!
//! Imports and normalizes a directory of session transcripts, listing what
//! the rest of the pipeline would see.

use anyhow::{Context, Result};
use clap::Parser;
use sessionscope_core::{Config, SessionImporter};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sessionscope-import")]
#[command(about = "Import and list sessions from a transcript directory")]
#[command(version)]
struct Args {
    /// Directory containing raw transcript files (*.jsonl)
    #[arg(short, long)]
    source: PathBuf,

    /// Output format: text (default) or json
    #[arg(short, long, default_value = "text")]
    format: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    Config::ensure_xdg_env();
    let config = Config::load().context("failed to load configuration")?;
    let _log_guard =
        sessionscope_core::logging::init(&config.logging).context("failed to initialize logging")?;

    let importer = SessionImporter::new(&args.source);
    let result = importer
        .import_all()
        .context("failed to import transcripts")?;

    if args.format == "json" {
        let output = serde_json::json!({
            "sessions": result.sessions.iter().map(|s| {
                serde_json::json!({
                    "id": s.id,
                    "project": s.project_name,
                    "started_at": s.started_at,
                    "ended_at": s.ended_at,
                    "messages": s.messages.len(),
                    "iterations": s.iteration_count(),
                })
            }).collect::<Vec<_>>(),
            "skipped": result.skipped.iter().map(|(path, reason)| {
                serde_json::json!({ "path": path, "reason": reason })
            }).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    for session in &result.sessions {
        println!(
            "{}  {}  {} messages, {} iterations ({})",
            session.started_at.format("%Y-%m-%d %H:%M"),
            session.id,
            session.messages.len(),
            session.iteration_count(),
            session.project_name.as_deref().unwrap_or("no project"),
        );
    }

    for (path, reason) in &result.skipped {
        eprintln!("warning: skipped {}: {}", path.display(), reason);
    }

    println!(
        "\nImported {} session(s), skipped {} file(s)",
        result.sessions.len(),
        result.skipped.len()
    );

    Ok(())
}

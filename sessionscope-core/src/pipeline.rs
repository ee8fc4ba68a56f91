//! End-to-end pipeline orchestration
//!
//! Runs the four components in order over a source directory:
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌────────────┐   ┌──────────────┐
//! │ Importer │ ► │ Extractor │ ► │ Aggregator │ ► │ ReportWriter │
//! └──────────┘   └───────────┘   └────────────┘   └──────────────┘
//! ```
//!
//! Per-session failures (malformed files, invalid sessions) are logged and
//! excluded; corpus-level and I/O failures propagate to the caller.

use crate::aggregate::{AggregateReport, Aggregator};
use crate::config::Config;
use crate::error::Result;
use crate::import::SessionImporter;
use crate::metrics::MetricExtractor;
use crate::report::ReportWriter;
use crate::types::SessionMetrics;
use std::path::{Path, PathBuf};

/// Outcome of one full pipeline run.
#[derive(Debug)]
pub struct PipelineSummary {
    /// Sessions that made it into the aggregate
    pub sessions_aggregated: usize,
    /// Transcript files skipped as malformed
    pub files_skipped: usize,
    /// Sessions excluded by validation, with the reason
    pub sessions_excluded: Vec<(String, String)>,
    /// The aggregate report that was written
    pub report: AggregateReport,
    /// Where the aggregate report landed
    pub aggregate_path: PathBuf,
    /// Per-session metrics files written
    pub session_files: Vec<PathBuf>,
}

/// The full import → extract → aggregate → report pipeline.
pub struct Pipeline {
    extractor: MetricExtractor,
    aggregator: Aggregator,
}

impl Pipeline {
    /// Build a pipeline from configuration.
    pub fn new(config: &Config) -> Self {
        Self {
            extractor: MetricExtractor::new(config.scoring.clone()),
            aggregator: Aggregator::new(config.complexity.clone()),
        }
    }

    /// Import and extract, returning the metrics set plus bookkeeping.
    ///
    /// Split out so callers can stop before aggregation (the extract CLI
    /// does exactly that).
    pub fn collect_metrics(
        &self,
        source_dir: &Path,
    ) -> Result<(Vec<SessionMetrics>, usize, Vec<(String, String)>)> {
        let importer = SessionImporter::new(source_dir);
        let imported = importer.import_all()?;

        let (metrics, excluded) = self.extractor.extract_all(&imported.sessions);

        tracing::info!(
            sessions = metrics.len(),
            files_skipped = imported.skipped.len(),
            sessions_excluded = excluded.len(),
            "Metric extraction complete"
        );

        Ok((metrics, imported.skipped.len(), excluded))
    }

    /// Run the whole pipeline and write the report.
    pub fn run(&self, source_dir: &Path, output_dir: &Path) -> Result<PipelineSummary> {
        let (metrics, files_skipped, sessions_excluded) = self.collect_metrics(source_dir)?;

        let report = self.aggregator.aggregate(&metrics)?;

        let writer = ReportWriter::new(output_dir);
        let written = writer.write(&report, &metrics)?;

        Ok(PipelineSummary {
            sessions_aggregated: metrics.len(),
            files_skipped,
            sessions_excluded,
            report,
            aggregate_path: written.aggregate_path,
            session_files: written.session_files,
        })
    }
}

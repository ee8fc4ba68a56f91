//! Report serialization
//!
//! Writes the aggregate report and the per-session metrics files to a fixed
//! on-disk layout consumed by the downstream figure generation:
//!
//! ```text
//! <output_dir>/
//!   aggregate_report.json
//!   sessions/
//!     <session_id>.json
//! ```
//!
//! Every file is replaced atomically: content is serialized to a temporary
//! file in the destination directory and persisted over the target only on
//! success, so a failed run never leaves a partial report behind.

use crate::aggregate::AggregateReport;
use crate::error::{Error, Result};
use crate::types::{LatencySummary, SessionMetrics};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

/// On-disk shape of one per-session metrics file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMetricsRecord {
    /// Session start timestamp, RFC 3339
    pub timestamp: String,
    pub prompt_tokens: i64,
    pub response_tokens: i64,
    /// Mean prompt-to-response latency, milliseconds
    pub response_time_ms: f64,
    pub delegation_score: f64,
    pub quality_score: f64,
    pub iteration_count: u64,
    pub context_used: Vec<String>,
    pub pattern_applied: String,
    pub success_indicators: Vec<String>,
    pub latency: LatencySummary,
}

impl SessionMetricsRecord {
    pub fn from_metrics(metrics: &SessionMetrics) -> Self {
        Self {
            timestamp: metrics.started_at.to_rfc3339(),
            prompt_tokens: metrics.prompt_tokens,
            response_tokens: metrics.response_tokens,
            response_time_ms: metrics.latency.mean_ms,
            delegation_score: metrics.delegation_score,
            quality_score: metrics.quality_score,
            iteration_count: metrics.iteration_count,
            context_used: metrics.context_used.clone(),
            pattern_applied: metrics.pattern_applied.as_str().to_string(),
            success_indicators: metrics.success_indicators.clone(),
            latency: metrics.latency,
        }
    }
}

/// Paths produced by one write.
#[derive(Debug)]
pub struct WriteSummary {
    pub aggregate_path: PathBuf,
    pub session_files: Vec<PathBuf>,
}

/// Writes reports to a fixed output layout.
pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Path of the aggregate report file.
    pub fn aggregate_path(&self) -> PathBuf {
        self.output_dir.join("aggregate_report.json")
    }

    /// Directory holding the per-session metrics files.
    pub fn sessions_dir(&self) -> PathBuf {
        self.output_dir.join("sessions")
    }

    /// Write only the aggregate report file.
    pub fn write_aggregate(&self, report: &AggregateReport) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.output_dir).map_err(|e| Error::Write {
            path: self.output_dir.clone(),
            source: e,
        })?;

        let aggregate_path = self.aggregate_path();
        write_json_atomic(&aggregate_path, report)?;
        Ok(aggregate_path)
    }

    /// Write only the per-session metrics files.
    pub fn write_sessions(&self, metrics: &[SessionMetrics]) -> Result<Vec<PathBuf>> {
        let sessions_dir = self.sessions_dir();
        std::fs::create_dir_all(&sessions_dir).map_err(|e| Error::Write {
            path: sessions_dir.clone(),
            source: e,
        })?;

        let mut session_files = Vec::with_capacity(metrics.len());
        for m in metrics {
            let record = SessionMetricsRecord::from_metrics(m);
            let path = sessions_dir.join(format!("{}.json", file_safe_id(&m.session_id)));
            write_json_atomic(&path, &record)?;
            session_files.push(path);
        }

        Ok(session_files)
    }

    /// Write the aggregate report and all per-session metrics files.
    ///
    /// Overwrites any prior report at the same paths.
    pub fn write(
        &self,
        report: &AggregateReport,
        metrics: &[SessionMetrics],
    ) -> Result<WriteSummary> {
        let aggregate_path = self.write_aggregate(report)?;
        let session_files = self.write_sessions(metrics)?;

        tracing::info!(
            aggregate = %aggregate_path.display(),
            sessions = session_files.len(),
            "Report written"
        );

        Ok(WriteSummary {
            aggregate_path,
            session_files,
        })
    }
}

/// Serialize `value` to `path` with an atomic replace.
fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = path.parent().ok_or_else(|| Error::Write {
        path: path.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "no parent directory"),
    })?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| Error::Write {
        path: path.to_path_buf(),
        source: e,
    })?;

    let json = serde_json::to_string_pretty(value)?;
    tmp.write_all(json.as_bytes())
        .and_then(|_| tmp.write_all(b"\n"))
        .map_err(|e| Error::Write {
            path: path.to_path_buf(),
            source: e,
        })?;

    tmp.persist(path).map_err(|e| Error::Write {
        path: path.to_path_buf(),
        source: e.error,
    })?;

    Ok(())
}

/// Keep session ids safe to use as file names.
fn file_safe_id(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

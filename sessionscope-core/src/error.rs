//! Error types for sessionscope-core

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the sessionscope-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Transcript file that cannot be read or parsed; the importer skips
    /// these with a warning rather than aborting the run
    #[error("malformed input {}: {message}", path.display())]
    MalformedInput { path: PathBuf, message: String },

    /// Session failing structural invariants; excluded from metrics
    #[error("validation error for session {session_id}: {message}")]
    Validation { session_id: String, message: String },

    /// Zero valid sessions reached the aggregator; fatal
    #[error("empty corpus: no valid sessions to aggregate")]
    EmptyCorpus,

    /// Report destination unwritable; fatal
    #[error("write error for {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether this error is recovered per-session (warn and continue)
    /// rather than aborting the pipeline.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::MalformedInput { .. } | Error::Validation { .. }
        )
    }
}

/// Result type alias for sessionscope-core
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        let malformed = Error::MalformedInput {
            path: PathBuf::from("bad.jsonl"),
            message: "not json".to_string(),
        };
        let validation = Error::Validation {
            session_id: "s1".to_string(),
            message: "end before start".to_string(),
        };
        assert!(malformed.is_recoverable());
        assert!(validation.is_recoverable());
        assert!(!Error::EmptyCorpus.is_recoverable());
    }
}

//! Session import layer
//!
//! Reads a directory of raw transcript files and emits one normalized
//! [`Session`] per well-formed transcript.
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────┐     ┌──────────────────┐
//! │ Transcript dir  │ ──► │ SessionImporter  │ ──► │ Session records  │
//! │ (**/*.jsonl)    │     │  (lazy, finite)  │     │ (one per file)   │
//! └─────────────────┘     └──────────────────┘     └──────────────────┘
//! ```
//!
//! Malformed files are skipped with a warning and counted; they never abort
//! the run. Each call to [`SessionImporter::sessions`] re-reads the
//! directory from scratch.

mod transcript;

pub use transcript::{parse_transcript, ParsedTranscript};

use crate::error::{Error, Result};
use crate::types::Session;
use std::path::{Path, PathBuf};

/// Result of importing a whole directory.
#[derive(Debug, Default)]
pub struct ImportResult {
    /// Sessions in discovery order (sorted by path)
    pub sessions: Vec<Session>,
    /// Files skipped as malformed, with the reason
    pub skipped: Vec<(PathBuf, String)>,
    /// Non-fatal line-level warnings from accepted files
    pub warnings: Vec<String>,
}

/// Imports normalized sessions from a directory of transcript files.
pub struct SessionImporter {
    source_dir: PathBuf,
}

impl SessionImporter {
    /// Create an importer over the given source directory.
    pub fn new(source_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
        }
    }

    /// Discover transcript files under the source directory.
    ///
    /// Paths are sorted so discovery order (and everything derived from it)
    /// is stable across runs.
    pub fn discover_files(&self) -> Result<Vec<PathBuf>> {
        if !self.source_dir.is_dir() {
            return Err(Error::Config(format!(
                "source directory not found: {}",
                self.source_dir.display()
            )));
        }

        let pattern = self.source_dir.join("**/*.jsonl");
        let pattern_str = pattern.to_string_lossy();

        let entries = glob::glob(&pattern_str)
            .map_err(|e| Error::Config(format!("invalid glob pattern: {}", e)))?;

        let mut files: Vec<PathBuf> = entries.flatten().collect();
        files.sort();

        tracing::info!(
            source_dir = %self.source_dir.display(),
            count = files.len(),
            "Discovered transcript files"
        );

        Ok(files)
    }

    /// Lazily iterate over the sessions in the source directory.
    ///
    /// The sequence is finite and not restartable; each call re-reads the
    /// directory. Malformed files are skipped with a logged warning and
    /// recorded on the iterator's skip list.
    pub fn sessions(&self) -> Result<Sessions> {
        let files = self.discover_files()?;
        Ok(Sessions {
            files: files.into_iter(),
            skipped: Vec::new(),
            warnings: Vec::new(),
        })
    }

    /// Import every session in the directory, collecting skip reasons.
    pub fn import_all(&self) -> Result<ImportResult> {
        let mut iter = self.sessions()?;
        let sessions: Vec<Session> = iter.by_ref().collect();

        Ok(ImportResult {
            sessions,
            skipped: iter.skipped,
            warnings: iter.warnings,
        })
    }
}

/// Lazy iterator over the sessions of a source directory.
pub struct Sessions {
    files: std::vec::IntoIter<PathBuf>,
    /// Files skipped so far, with the reason
    pub skipped: Vec<(PathBuf, String)>,
    /// Line-level warnings from accepted files so far
    pub warnings: Vec<String>,
}

impl Sessions {
    fn parse_one(&mut self, path: &Path) -> Option<Session> {
        match parse_transcript(path) {
            Ok(parsed) => {
                for warning in &parsed.warnings {
                    tracing::warn!(path = %path.display(), warning = %warning, "Transcript warning");
                }
                self.warnings.extend(
                    parsed
                        .warnings
                        .into_iter()
                        .map(|w| format!("{}: {}", path.display(), w)),
                );
                Some(parsed.session)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping malformed transcript");
                self.skipped.push((path.to_path_buf(), e.to_string()));
                None
            }
        }
    }
}

impl Iterator for Sessions {
    type Item = Session;

    fn next(&mut self) -> Option<Session> {
        loop {
            let path = self.files.next()?;
            if let Some(session) = self.parse_one(&path) {
                return Some(session);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn valid_transcript(id: &str) -> String {
        format!(
            concat!(
                r#"{{"sessionId":"{id}","type":"user","timestamp":"2025-06-02T10:00:00Z","message":{{"role":"user","content":"question"}}}}"#,
                "\n",
                r#"{{"sessionId":"{id}","type":"assistant","timestamp":"2025-06-02T10:00:04Z","message":{{"role":"assistant","content":"answer","usage":{{"input_tokens":10,"output_tokens":5}}}}}}"#,
                "\n",
            ),
            id = id
        )
    }

    #[test]
    fn test_import_skips_malformed_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.jsonl"), valid_transcript("a")).unwrap();
        fs::write(dir.path().join("b.jsonl"), valid_transcript("b")).unwrap();
        fs::write(dir.path().join("broken.jsonl"), "definitely not json\n").unwrap();

        let importer = SessionImporter::new(dir.path());
        let result = importer.import_all().expect("import should succeed");

        assert_eq!(result.sessions.len(), 2);
        assert_eq!(result.skipped.len(), 1);
        assert!(result.skipped[0].0.ends_with("broken.jsonl"));
    }

    #[test]
    fn test_import_is_sorted_by_path() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("zz.jsonl"), valid_transcript("zz")).unwrap();
        fs::write(dir.path().join("aa.jsonl"), valid_transcript("aa")).unwrap();

        let importer = SessionImporter::new(dir.path());
        let result = importer.import_all().expect("import should succeed");

        let ids: Vec<_> = result.sessions.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["aa", "zz"]);
    }

    #[test]
    fn test_import_recurses_into_subdirectories() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("project-x");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("a.jsonl"), valid_transcript("nested")).unwrap();

        let importer = SessionImporter::new(dir.path());
        let result = importer.import_all().expect("import should succeed");

        assert_eq!(result.sessions.len(), 1);
        assert_eq!(result.sessions[0].id, "nested");
    }

    #[test]
    fn test_missing_directory_is_config_error() {
        let dir = TempDir::new().unwrap();
        let importer = SessionImporter::new(dir.path().join("does-not-exist"));

        let err = importer.import_all().expect_err("should fail");
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_lazy_iterator_yields_each_session_once() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("one.jsonl"), valid_transcript("one")).unwrap();

        let importer = SessionImporter::new(dir.path());
        let mut sessions = importer.sessions().expect("discovery should succeed");

        assert_eq!(sessions.next().map(|s| s.id), Some("one".to_string()));
        assert!(sessions.next().is_none());
    }
}

//! # sessionscope-core
//!
//! Core library for sessionscope - a batch pipeline computing descriptive
//! statistics over a corpus of human-AI collaborative programming sessions.
//!
//! This library provides:
//! - Domain types for sessions, messages, and tool invocations
//! - A transcript importer with validation at the boundary
//! - Per-session metric extraction (tokens, latency, delegation score)
//! - Corpus-wide aggregation (complexity ratios, tool-usage percentages)
//! - Atomic report serialization
//! - Configuration management and logging infrastructure
//!
//! ## Architecture
//!
//! The pipeline is a linear batch job over a static corpus:
//! - **Importer:** raw transcript files → normalized [`Session`] records
//! - **Extractor:** one [`SessionMetrics`] per session
//! - **Aggregator:** the full metrics set → one [`AggregateReport`]
//! - **Report Writer:** stable JSON layout for downstream figure generation
//!
//! ## Example
//!
//! ```rust,no_run
//! use sessionscope_core::{Config, Pipeline};
//! use std::path::Path;
//!
//! let config = Config::load().expect("failed to load config");
//! let pipeline = Pipeline::new(&config);
//! let summary = pipeline
//!     .run(Path::new("transcripts"), Path::new("out"))
//!     .expect("pipeline failed");
//! println!("aggregated {} sessions", summary.sessions_aggregated);
//! ```

// Re-export commonly used items at the crate root
pub use aggregate::{AggregateReport, Aggregator};
pub use config::Config;
pub use error::{Error, Result};
pub use import::{ImportResult, SessionImporter};
pub use metrics::MetricExtractor;
pub use pipeline::{Pipeline, PipelineSummary};
pub use report::{ReportWriter, SessionMetricsRecord};
pub use types::*;

// Public modules
pub mod aggregate;
pub mod config;
pub mod error;
pub mod import;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod report;
pub mod types;

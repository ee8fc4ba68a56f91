//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/sessionscope/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/sessionscope/` (~/.config/sessionscope/)
//! - State/Logs: `$XDG_STATE_HOME/sessionscope/` (~/.local/state/sessionscope/)
//!
//! The scoring weights and the complexity threshold are research-tuned
//! parameters, not system contracts; they ship with documented defaults and
//! can be overridden per-run.

use crate::error::{Error, Result};
use crate::types::ToolCategory;
use serde::Deserialize;
use std::path::PathBuf;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Delegation and quality scoring weights
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Complexity-class partitioning
    #[serde(default)]
    pub complexity: ComplexityConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Weights used by the metric extractor.
///
/// The delegation score blends three terms: the category-weighted tool mix,
/// an iteration term, and the tool acceptance rate. All weights live in
/// [0,1] and the blend weights are normalized before use, so any positive
/// combination is valid.
#[derive(Debug, Deserialize, Clone)]
pub struct ScoringConfig {
    /// Per-category delegation weights (share of tool mix contributed)
    #[serde(default = "default_execution_weight")]
    pub execution_weight: f64,
    #[serde(default = "default_exploration_weight")]
    pub exploration_weight: f64,
    #[serde(default = "default_modification_weight")]
    pub modification_weight: f64,
    #[serde(default = "default_planning_weight")]
    pub planning_weight: f64,
    #[serde(default = "default_interaction_weight")]
    pub interaction_weight: f64,
    #[serde(default = "default_other_weight")]
    pub other_weight: f64,

    /// Blend weight of the tool-mix term
    #[serde(default = "default_tool_mix_blend")]
    pub tool_mix_blend: f64,
    /// Blend weight of the iteration term
    #[serde(default = "default_iteration_blend")]
    pub iteration_blend: f64,
    /// Blend weight of the acceptance term
    #[serde(default = "default_acceptance_blend")]
    pub acceptance_blend: f64,

    /// Quality: weight of the error-free ratio vs the completion indicator
    #[serde(default = "default_quality_success_weight")]
    pub quality_success_weight: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            execution_weight: default_execution_weight(),
            exploration_weight: default_exploration_weight(),
            modification_weight: default_modification_weight(),
            planning_weight: default_planning_weight(),
            interaction_weight: default_interaction_weight(),
            other_weight: default_other_weight(),
            tool_mix_blend: default_tool_mix_blend(),
            iteration_blend: default_iteration_blend(),
            acceptance_blend: default_acceptance_blend(),
            quality_success_weight: default_quality_success_weight(),
        }
    }
}

impl ScoringConfig {
    /// Delegation weight for a tool category.
    pub fn category_weight(&self, category: ToolCategory) -> f64 {
        match category {
            ToolCategory::Execution => self.execution_weight,
            ToolCategory::Exploration => self.exploration_weight,
            ToolCategory::Modification => self.modification_weight,
            ToolCategory::Planning => self.planning_weight,
            ToolCategory::Interaction => self.interaction_weight,
            ToolCategory::Other => self.other_weight,
        }
    }

    /// Validate configuration, returning an error message if invalid
    pub fn validate(&self) -> Result<()> {
        let category_weights = ToolCategory::ALL.map(|c| self.category_weight(c));
        if category_weights.iter().any(|w| !(0.0..=1.0).contains(w)) {
            return Err(Error::Config(
                "scoring category weights must be within [0, 1]".to_string(),
            ));
        }

        let blends = [
            self.tool_mix_blend,
            self.iteration_blend,
            self.acceptance_blend,
        ];
        if blends.iter().any(|w| *w < 0.0) {
            return Err(Error::Config(
                "scoring blend weights must be non-negative".to_string(),
            ));
        }
        if blends.iter().sum::<f64>() <= 0.0 {
            return Err(Error::Config(
                "at least one scoring blend weight must be positive".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.quality_success_weight) {
            return Err(Error::Config(
                "scoring.quality_success_weight must be within [0, 1]".to_string(),
            ));
        }

        Ok(())
    }
}

fn default_execution_weight() -> f64 {
    0.5
}

fn default_exploration_weight() -> f64 {
    1.0
}

fn default_modification_weight() -> f64 {
    0.5
}

fn default_planning_weight() -> f64 {
    1.0
}

fn default_interaction_weight() -> f64 {
    0.0
}

fn default_other_weight() -> f64 {
    0.5
}

fn default_tool_mix_blend() -> f64 {
    0.6
}

fn default_iteration_blend() -> f64 {
    0.2
}

fn default_acceptance_blend() -> f64 {
    0.2
}

fn default_quality_success_weight() -> f64 {
    0.7
}

/// Complexity-class partitioning configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ComplexityConfig {
    /// Sessions with at least this many iterations are classified Complex
    #[serde(default = "default_complex_iteration_threshold")]
    pub complex_iteration_threshold: u64,
}

impl Default for ComplexityConfig {
    fn default() -> Self {
        Self {
            complex_iteration_threshold: default_complex_iteration_threshold(),
        }
    }
}

impl ComplexityConfig {
    /// Validate configuration, returning an error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.complex_iteration_threshold < 1 {
            return Err(Error::Config(
                "complexity.complex_iteration_threshold must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_complex_iteration_threshold() -> u64 {
    4
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.scoring.validate()?;
        config.complexity.validate()?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/sessionscope/config.toml`
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("sessionscope").join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/sessionscope/`
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("sessionscope")
    }

    /// Returns the log file path
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("sessionscope.log")
    }

    /// Ensure XDG base directory environment variables are set.
    ///
    /// This is mainly for CLI binaries that want explicit, stable path
    /// behavior before invoking other components that read these env vars.
    pub fn ensure_xdg_env() {
        let home = home_dir();

        if std::env::var("XDG_STATE_HOME").is_err() {
            std::env::set_var("XDG_STATE_HOME", home.join(".local/state"));
        }

        if std::env::var("XDG_CONFIG_HOME").is_err() {
            std::env::set_var("XDG_CONFIG_HOME", home.join(".config"));
        }
    }
}

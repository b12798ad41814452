//! Configuration types for the level scheduler.

use pyo3::prelude::*;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while validating configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown tie-break rule: {0} (expected \"canonical\" or \"first_found\")")]
    UnknownTieBreak(String),
}

/// How Phase 2 chooses between vertices that are eligible at the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TieBreak {
    /// Coffman–Graham lexicographic rule: prefer the vertex whose placed
    /// direct dependencies, most recent first, have the smallest positions.
    #[default]
    Canonical,
    /// Greedy scan in input order, appending every eligible vertex found.
    /// Reproduces schedules produced by the earlier build tooling.
    FirstFound,
}

impl TieBreak {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Canonical => "canonical",
            Self::FirstFound => "first_found",
        }
    }
}

impl FromStr for TieBreak {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "canonical" => Ok(Self::Canonical),
            "first_found" => Ok(Self::FirstFound),
            other => Err(ConfigError::UnknownTieBreak(other.to_string())),
        }
    }
}

/// Host parallelism, read once when a config is built.
pub fn default_width() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Configuration for a scheduling request.
#[pyclass]
#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    /// Maximum number of units per level (parallel workers available)
    #[pyo3(get, set)]
    pub width: usize,
    /// Phase 2 tie-break rule: "canonical" or "first_found"
    #[pyo3(get, set)]
    pub tie_break: String,
    /// Verbosity level: 0=silent, 1=changes, 2=checks, 3=debug
    #[pyo3(get, set)]
    pub verbosity: u8,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            tie_break: TieBreak::default().as_str().to_string(),
            verbosity: 0,
        }
    }
}

impl SchedulerConfig {
    /// Config with an explicit width and defaults for everything else.
    pub fn with_width(width: usize) -> Self {
        Self {
            width,
            ..Self::default()
        }
    }

    /// Parse the configured tie-break rule.
    pub fn tie_break_rule(&self) -> Result<TieBreak, ConfigError> {
        self.tie_break.parse()
    }
}

#[pymethods]
impl SchedulerConfig {
    #[new]
    #[pyo3(signature = (width=None, tie_break=None, verbosity=None))]
    fn new(width: Option<usize>, tie_break: Option<String>, verbosity: Option<u8>) -> Self {
        let defaults = Self::default();
        Self {
            width: width.unwrap_or(defaults.width),
            tie_break: tie_break.unwrap_or(defaults.tie_break),
            verbosity: verbosity.unwrap_or(defaults.verbosity),
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "SchedulerConfig(width={}, tie_break={:?}, verbosity={})",
            self.width, self.tie_break, self.verbosity
        )
    }
}

//! Grader configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{GraderError, Result};

/// Knobs for a grading run. Every field has a default, so a config file only
/// needs the keys it changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GraderConfig {
    /// Visitor name the scenario logs in with.
    pub test_user: String,

    /// File that must exist (and be non-empty) in every candidate root.
    pub ignore_file: String,

    /// Manifest describing how to serve a candidate.
    pub manifest_file: String,

    /// Directory name prefixes that are never candidates.
    pub reserved_prefixes: Vec<String>,

    /// Directory names that are never candidates.
    pub excluded_dirs: Vec<String>,

    /// How long a candidate may take to answer its first request.
    pub startup_timeout_secs: u64,

    /// Delay between readiness polls.
    pub poll_interval_ms: u64,
}

impl Default for GraderConfig {
    fn default() -> Self {
        Self {
            test_user: "Test User".to_string(),
            ignore_file: ".gitignore".to_string(),
            manifest_file: "candidate.toml".to_string(),
            reserved_prefixes: vec![".".to_string(), "__".to_string()],
            excluded_dirs: vec!["venv".to_string(), "env".to_string(), "target".to_string()],
            startup_timeout_secs: 10,
            poll_interval_ms: 100,
        }
    }
}

impl GraderConfig {
    /// Load a TOML config file.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| GraderError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| GraderError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Whether a directory name is excluded from discovery.
    pub fn is_excluded(&self, dir_name: &str) -> bool {
        self.reserved_prefixes
            .iter()
            .any(|prefix| dir_name.starts_with(prefix.as_str()))
            || self.excluded_dirs.iter().any(|name| name == dir_name)
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

//! Error taxonomy for the grader.
//!
//! - [`LoadError`]: a candidate could not be brought up; its whole test group is skipped.
//! - [`GraderError`]: the grading run itself failed (bad root, bad config, report I/O).
//!
//! Per-case failures live in [`crate::check::CaseError`].

use std::path::PathBuf;

/// Why a candidate could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("manifest not found: {}", .0.display())]
    ManifestMissing(PathBuf),

    #[error("invalid manifest {}: {source}", .path.display())]
    ManifestInvalid {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid launch configuration: {0}")]
    InvalidLaunch(String),

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server exited before becoming ready ({0})")]
    ExitedEarly(String),

    #[error("server not ready within {0} seconds")]
    NotReady(u64),

    #[error("failed to reserve a port: {0}")]
    Bind(#[source] std::io::Error),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("invalid base url {0}")]
    BaseUrl(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that stop a grading run.
#[derive(Debug, thiserror::Error)]
pub enum GraderError {
    #[error("cannot read candidate root {}: {source}", .path.display())]
    Root {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read config {}: {source}", .path.display())]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", .path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for grading runs.
pub type Result<T> = std::result::Result<T, GraderError>;

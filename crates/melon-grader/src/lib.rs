//! Melon Grader - black-box grading of UberMelon submissions.
//!
//! Provides a grading pipeline that:
//! - Discovers candidate submission directories
//! - Launches a fresh, isolated server per candidate
//! - Drives the fixed UberMelon scenario over HTTP
//! - Collects every soft-check finding instead of stopping at the first

pub mod candidate;
pub mod check;
pub mod client;
pub mod config;
pub mod error;
pub mod html;
pub mod launcher;
pub mod manifest;
pub mod obs;
pub mod report;
pub mod runner;
pub mod scenario;

// Re-export key types
pub use candidate::{discover, CandidateDescriptor};
pub use check::{CaseError, CaseOutcome, CaseStatus, CheckContext, CheckResult};
pub use client::{CandidateClient, Page};
pub use config::GraderConfig;
pub use error::{GraderError, LoadError};
pub use launcher::{load_candidate, LoadedCandidate};
pub use manifest::{CandidateManifest, LaunchSpec};
pub use report::{CandidateReport, CandidateStatus, GradeReport, GradeSummary};
pub use runner::Grader;
pub use scenario::{ScenarioCase, MELON_LOOKUP};
pub use ubermelon::init_tracing;

//! Grade report artifact: JSON for tooling, text for people.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::check::CaseOutcome;
use crate::error::Result;

/// Version of the JSON report layout.
pub const REPORT_SCHEMA_VERSION: &str = "1.0";

/// Whether a candidate got graded at all.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CandidateStatus {
    Graded,
    Skipped { reason: String },
}

/// Results for one candidate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateReport {
    pub candidate: String,
    pub path: String,
    pub status: CandidateStatus,
    pub cases: Vec<CaseOutcome>,
    pub duration_ms: u64,
}

impl CandidateReport {
    pub fn skipped(
        candidate: &str,
        path: &Path,
        reason: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            candidate: candidate.to_string(),
            path: path.display().to_string(),
            status: CandidateStatus::Skipped {
                reason: reason.into(),
            },
            cases: Vec::new(),
            duration_ms,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.status, CandidateStatus::Skipped { .. })
    }

    pub fn passed_count(&self) -> usize {
        self.cases.iter().filter(|c| c.passed()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.cases.iter().filter(|c| !c.passed()).count()
    }

    /// Look up a case by name.
    pub fn case(&self, name: &str) -> Option<&CaseOutcome> {
        self.cases.iter().find(|c| c.case == name)
    }
}

/// Totals across all candidates.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GradeSummary {
    pub total_candidates: usize,
    pub graded_candidates: usize,
    pub skipped_candidates: usize,
    pub passed_cases: usize,
    pub failed_cases: usize,
}

impl GradeSummary {
    pub fn from_candidates(candidates: &[CandidateReport]) -> Self {
        let mut summary = GradeSummary {
            total_candidates: candidates.len(),
            ..GradeSummary::default()
        };
        for report in candidates {
            if report.is_skipped() {
                summary.skipped_candidates += 1;
            } else {
                summary.graded_candidates += 1;
            }
            summary.passed_cases += report.passed_count();
            summary.failed_cases += report.failed_count();
        }
        summary
    }
}

/// The full grading run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GradeReport {
    pub schema_version: String,
    pub generated_at: DateTime<Utc>,

    /// Digest of the ordered case list the run used.
    pub scenario_digest: String,

    pub test_user: String,
    pub candidates: Vec<CandidateReport>,
    pub summary: GradeSummary,
}

impl GradeReport {
    pub fn new(
        scenario_digest: String,
        test_user: String,
        candidates: Vec<CandidateReport>,
    ) -> Self {
        let summary = GradeSummary::from_candidates(&candidates);
        Self {
            schema_version: REPORT_SCHEMA_VERSION.to_string(),
            generated_at: Utc::now(),
            scenario_digest,
            test_user,
            candidates,
            summary,
        }
    }

    /// True when any candidate was skipped or any case failed.
    pub fn has_failures(&self) -> bool {
        self.summary.skipped_candidates > 0 || self.summary.failed_cases > 0
    }

    pub fn candidate(&self, name: &str) -> Option<&CandidateReport> {
        self.candidates.iter().find(|c| c.candidate == name)
    }

    /// Human-readable summary, one block per candidate.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for report in &self.candidates {
            match &report.status {
                CandidateStatus::Skipped { reason } => {
                    out.push_str(&format!("{}: skipped ({})\n", report.candidate, reason));
                }
                CandidateStatus::Graded => {
                    out.push_str(&format!(
                        "{}: {}/{} cases passed\n",
                        report.candidate,
                        report.passed_count(),
                        report.cases.len()
                    ));
                    for case in &report.cases {
                        let mark = if case.passed() { "✓" } else { "✗" };
                        out.push_str(&format!("  {} {}\n", mark, case.case));
                        for check in &case.checks {
                            let mark = if check.passed { "✓" } else { "✗" };
                            let kind = if check.hard { " [hard]" } else { "" };
                            out.push_str(&format!(
                                "      {} {}{}: {}\n",
                                mark, check.label, kind, check.message
                            ));
                        }
                        if let Some(reason) = &case.aborted {
                            out.push_str(&format!("      aborted: {}\n", reason));
                        }
                    }
                }
            }
        }
        out.push_str(&format!(
            "\n{} candidate(s), {} skipped, {} case(s) passed, {} failed\n",
            self.summary.total_candidates,
            self.summary.skipped_candidates,
            self.summary.passed_cases,
            self.summary.failed_cases
        ));
        out
    }

    /// Write the report as pretty JSON.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

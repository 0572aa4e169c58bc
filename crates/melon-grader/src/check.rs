//! Soft and hard checks.
//!
//! A [`CheckContext`] belongs to one scenario case. Soft checks record a
//! [`CheckResult`] and let the case carry on; hard checks record a result and
//! return a [`CaseError`] that the case propagates with `?`. [`CheckContext::finish`]
//! is the single place that turns the collected results into a verdict.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Outcome of one check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckResult {
    /// What was expected, e.g. "form action is /get-name".
    pub label: String,

    pub passed: bool,

    /// What was observed.
    pub message: String,

    /// Hard checks end the case when they fail.
    pub hard: bool,
}

/// Why a case stopped early.
#[derive(Debug, thiserror::Error)]
pub enum CaseError {
    #[error("hard check failed: {label}: {message}")]
    HardCheck { label: String, message: String },

    #[error("missing element: {0}")]
    MissingElement(String),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid url {0}")]
    Url(String),

    #[error("invalid selector {0}")]
    Selector(String),

    #[error("cannot extract {0}")]
    Extract(String),

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Final status of a case.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Passed,
    Failed,
}

/// Everything a case produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CaseOutcome {
    pub case: String,
    pub status: CaseStatus,
    pub checks: Vec<CheckResult>,

    /// Set when the case stopped before its last step.
    pub aborted: Option<String>,
}

impl CaseOutcome {
    pub fn passed(&self) -> bool {
        self.status == CaseStatus::Passed
    }

    /// Failed checks, hard ones included.
    pub fn failures(&self) -> impl Iterator<Item = &CheckResult> {
        self.checks.iter().filter(|c| !c.passed)
    }
}

/// Collector for one case's checks.
#[derive(Debug)]
pub struct CheckContext {
    case: String,
    results: Vec<CheckResult>,
}

impl CheckContext {
    pub fn new(case: impl Into<String>) -> Self {
        Self {
            case: case.into(),
            results: Vec::new(),
        }
    }

    pub fn case(&self) -> &str {
        &self.case
    }

    pub fn results(&self) -> &[CheckResult] {
        &self.results
    }

    fn record(&mut self, label: String, passed: bool, message: String, hard: bool) {
        if passed {
            info!(
                event = "check.recorded",
                case = %self.case,
                check = %label,
                passed,
                "check passed"
            );
        } else {
            warn!(
                event = "check.recorded",
                case = %self.case,
                check = %label,
                passed,
                detail = %message,
                hard,
                "check failed"
            );
        }
        self.results.push(CheckResult {
            label,
            passed,
            message,
            hard,
        });
    }

    /// Record a soft check. Returns `passed` so callers can branch on it.
    pub fn soft(
        &mut self,
        label: impl Into<String>,
        passed: bool,
        message: impl Into<String>,
    ) -> bool {
        self.record(label.into(), passed, message.into(), false);
        passed
    }

    /// Soft check that `actual == expected`.
    pub fn soft_eq<T: PartialEq + Debug>(
        &mut self,
        label: impl Into<String>,
        actual: T,
        expected: T,
    ) -> bool {
        let passed = actual == expected;
        let message = if passed {
            format!("{:?}", actual)
        } else {
            format!("expected {:?}, got {:?}", expected, actual)
        };
        self.soft(label, passed, message)
    }

    /// Soft check that a value is present. Hands the value back when it is.
    pub fn soft_some<T>(&mut self, label: impl Into<String>, value: Option<T>) -> Option<T> {
        let message = if value.is_some() { "present" } else { "missing" };
        self.soft(label, value.is_some(), message);
        value
    }

    /// Record a hard check. A failure becomes the case's error.
    pub fn hard(
        &mut self,
        label: impl Into<String>,
        passed: bool,
        message: impl Into<String>,
    ) -> Result<(), CaseError> {
        let label = label.into();
        let message = message.into();
        self.record(label.clone(), passed, message.clone(), true);
        if passed {
            Ok(())
        } else {
            Err(CaseError::HardCheck { label, message })
        }
    }

    /// Decide the case. It passes only if it ran to the end and every check passed.
    pub fn finish(self, result: Result<(), CaseError>) -> CaseOutcome {
        let aborted = match result {
            Ok(()) => None,
            Err(CaseError::HardCheck { label, .. }) => {
                Some(format!("hard check failed: {}", label))
            }
            Err(e) => {
                warn!(case = %self.case, error = %e, "case aborted");
                Some(e.to_string())
            }
        };
        let all_passed = self.results.iter().all(|c| c.passed);
        let status = if aborted.is_none() && all_passed {
            CaseStatus::Passed
        } else {
            CaseStatus::Failed
        };

        CaseOutcome {
            case: self.case,
            status,
            checks: self.results,
            aborted,
        }
    }
}

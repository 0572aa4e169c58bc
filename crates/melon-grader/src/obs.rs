//! Structured lifecycle events for grading runs.
//!
//! This module provides:
//! - A candidate-scoped tracing span (`candidate_span`)
//! - Emission functions for discovery, load, skip, case completion and run completion
//!
//! Events are emitted at `info!` level except skips, which warn.

use tracing::{info, warn, Span};

/// Span covering one candidate's whole test group.
///
/// Attach it with `tracing::Instrument` so it follows the future across awaits:
///
/// ```ignore
/// grade(candidate).instrument(candidate_span("alice")).await
/// ```
pub fn candidate_span(candidate: &str) -> Span {
    tracing::info_span!("melon_grader.candidate", candidate = %candidate)
}

pub fn emit_candidates_discovered(root: &str, count: usize) {
    info!(event = "candidate.discovered", root = %root, count = count);
}

pub fn emit_candidate_loaded(candidate: &str, kind: &str, base_url: &str) {
    info!(event = "candidate.loaded", candidate = %candidate, kind = %kind, base_url = %base_url);
}

pub fn emit_candidate_skipped(candidate: &str, reason: &dyn std::fmt::Display) {
    warn!(event = "candidate.skipped", candidate = %candidate, reason = %reason);
}

pub fn emit_case_finished(candidate: &str, case: &str, passed: bool, failed_checks: usize) {
    info!(
        event = "case.finished",
        candidate = %candidate,
        case = %case,
        passed = passed,
        failed_checks = failed_checks,
    );
}

pub fn emit_grade_finished(
    candidates: usize,
    skipped: usize,
    failed_cases: usize,
    duration_ms: u64,
) {
    info!(
        event = "grade.finished",
        candidates = candidates,
        skipped = skipped,
        failed_cases = failed_cases,
        duration_ms = duration_ms,
    );
}

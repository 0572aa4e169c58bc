//! Grading orchestration.

use std::path::Path;
use std::time::Instant;

use reqwest::Url;
use tracing::{info, Instrument};

use crate::candidate::{discover, CandidateDescriptor};
use crate::check::CaseOutcome;
use crate::config::GraderConfig;
use crate::error::{LoadError, Result};
use crate::launcher::{load_candidate, LoadedCandidate};
use crate::obs;
use crate::report::{CandidateReport, CandidateStatus, GradeReport};
use crate::scenario::{scenario_digest, ScenarioCase};

/// Runs the scenario against candidates, one at a time.
#[derive(Debug, Clone, Default)]
pub struct Grader {
    config: GraderConfig,
}

impl Grader {
    pub fn new(config: GraderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GraderConfig {
        &self.config
    }

    /// Grade every candidate directory under `root`.
    pub async fn grade_root(&self, root: &Path) -> Result<GradeReport> {
        let candidates = discover(root, &self.config)?;
        obs::emit_candidates_discovered(&root.display().to_string(), candidates.len());
        Ok(self.grade_candidates(&candidates).await)
    }

    /// Grade the given candidates in order.
    ///
    /// A candidate that fails to load is reported as skipped and the run moves on.
    pub async fn grade_candidates(&self, candidates: &[CandidateDescriptor]) -> GradeReport {
        let start = Instant::now();
        let mut reports = Vec::with_capacity(candidates.len());
        for descriptor in candidates {
            reports.push(self.grade_candidate(descriptor).await);
        }

        let report = GradeReport::new(
            scenario_digest(&ScenarioCase::ALL),
            self.config.test_user.clone(),
            reports,
        );
        obs::emit_grade_finished(
            report.summary.total_candidates,
            report.summary.skipped_candidates,
            report.summary.failed_cases,
            start.elapsed().as_millis() as u64,
        );
        report
    }

    /// Load one candidate, run the scenario, shut it down.
    pub async fn grade_candidate(&self, descriptor: &CandidateDescriptor) -> CandidateReport {
        let span = obs::candidate_span(&descriptor.name);
        async {
            let start = Instant::now();
            let loaded = match load_candidate(descriptor, &self.config).await {
                Ok(loaded) => loaded,
                Err(e) => {
                    obs::emit_candidate_skipped(&descriptor.name, &e);
                    return CandidateReport::skipped(
                        &descriptor.name,
                        &descriptor.path,
                        e.to_string(),
                        start.elapsed().as_millis() as u64,
                    );
                }
            };

            let cases = self.run_scenario(&loaded).await;
            loaded.shutdown().await;

            CandidateReport {
                candidate: descriptor.name.clone(),
                path: descriptor.path.display().to_string(),
                status: CandidateStatus::Graded,
                cases,
                duration_ms: start.elapsed().as_millis() as u64,
            }
        }
        .instrument(span)
        .await
    }

    /// Grade a server that is already running at `base_url`.
    ///
    /// The server is left running afterwards.
    pub async fn grade_attached(
        &self,
        descriptor: CandidateDescriptor,
        base_url: &str,
    ) -> std::result::Result<GradeReport, LoadError> {
        let base = Url::parse(base_url)
            .map_err(|e| LoadError::BaseUrl(format!("{}: {}", base_url, e)))?;
        let span = obs::candidate_span(&descriptor.name);
        let start = Instant::now();

        let loaded = LoadedCandidate::attach(descriptor, base)?;
        obs::emit_candidate_loaded(
            &loaded.descriptor().name,
            loaded.kind(),
            loaded.base_url().as_str(),
        );
        let cases = self.run_scenario(&loaded).instrument(span).await;

        let descriptor = loaded.descriptor();
        let report = CandidateReport {
            candidate: descriptor.name.clone(),
            path: descriptor.path.display().to_string(),
            status: CandidateStatus::Graded,
            cases,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        loaded.shutdown().await;

        Ok(GradeReport::new(
            scenario_digest(&ScenarioCase::ALL),
            self.config.test_user.clone(),
            vec![report],
        ))
    }

    /// Run every case in order against an already loaded candidate.
    ///
    /// Cases share the candidate's cookie jar, so a failure early on (say in
    /// `get_name`) can cascade into later cases.
    pub async fn run_scenario(&self, candidate: &LoadedCandidate) -> Vec<CaseOutcome> {
        let name = &candidate.descriptor().name;
        let mut outcomes = Vec::with_capacity(ScenarioCase::ALL.len());
        for case in ScenarioCase::ALL {
            info!(case = case.name(), "running case");
            let outcome = case.run(candidate, &self.config).await;
            obs::emit_case_finished(
                name,
                &outcome.case,
                outcome.passed(),
                outcome.failures().count(),
            );
            outcomes.push(outcome);
        }
        outcomes
    }
}

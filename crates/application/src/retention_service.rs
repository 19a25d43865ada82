use std::collections::HashSet;
use std::sync::Arc;

use reaper_core::{AppError, AppResult};
use reaper_domain::{
    Artifact, CommitSha, DeletionOutcome, RepositorySlug, RetentionDecision, RetentionPolicy,
    TagExclusionSet, WorkflowRun,
};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::platform_ports::{ArtifactPlatform, PageRequest, RawWorkflowRun, collect_pages};

mod enumerator;
mod evaluator;
mod exclusion;
mod orchestrator;
mod report;

pub use enumerator::RunEnumerator;
pub use evaluator::{ArtifactEvaluation, ArtifactRetentionEvaluator};
pub use exclusion::build_exclusion_set;
pub use orchestrator::{DeletionOrchestrator, DeletionRequest};
pub use report::{ArtifactDeletion, RetentionReport, RunFailure, RunReport};

/// Default bound on simultaneously in-flight deletions.
pub const DEFAULT_MAX_CONCURRENT_DELETIONS: usize = 10;

/// Default bound on runs whose artifacts are listed at the same time.
pub const DEFAULT_MAX_CONCURRENT_RUNS: usize = 10;

/// Retention pass over every workflow run of a repository.
#[derive(Clone)]
pub struct RetentionService {
    platform: Arc<dyn ArtifactPlatform>,
    policy: RetentionPolicy,
    max_concurrent_deletions: usize,
    max_concurrent_runs: usize,
}

impl RetentionService {
    /// Creates a retention service.
    #[must_use]
    pub fn new(platform: Arc<dyn ArtifactPlatform>, policy: RetentionPolicy) -> Self {
        Self {
            platform,
            policy,
            max_concurrent_deletions: DEFAULT_MAX_CONCURRENT_DELETIONS,
            max_concurrent_runs: DEFAULT_MAX_CONCURRENT_RUNS,
        }
    }

    /// Overrides the deletion concurrency bound.
    #[must_use]
    pub fn with_max_concurrent_deletions(mut self, max_concurrent_deletions: usize) -> Self {
        self.max_concurrent_deletions = max_concurrent_deletions.max(1);
        self
    }

    /// Overrides how many runs may list their artifacts at once.
    #[must_use]
    pub fn with_max_concurrent_runs(mut self, max_concurrent_runs: usize) -> Self {
        self.max_concurrent_runs = max_concurrent_runs.max(1);
        self
    }

    /// Runs one retention pass.
    ///
    /// Tag and run listing failures are fatal. Artifact listing and deletion
    /// failures are isolated and reported. The returned report is produced only
    /// after every spawned run task, and every deletion it issued, has resolved.
    pub async fn run(&self, repository: &RepositorySlug) -> AppResult<RetentionReport> {
        info!(
            repository = %repository,
            cutoff = %self.policy.cutoff().to_rfc3339(),
            skip_tagged_commits = self.policy.skip_tagged_commits(),
            simulate_only = self.policy.simulate_only(),
            "computed retention cutoff"
        );

        let exclusions = Arc::new(
            build_exclusion_set(self.platform.as_ref(), repository, &self.policy).await?,
        );
        let evaluator = ArtifactRetentionEvaluator::new(
            self.platform.clone(),
            repository.clone(),
            self.policy,
            exclusions.clone(),
        );
        let orchestrator = DeletionOrchestrator::new(
            self.platform.clone(),
            repository.clone(),
            self.policy.simulate_only(),
            self.max_concurrent_deletions,
        );

        let mut enumerator = RunEnumerator::new(
            self.platform.as_ref(),
            repository,
            &self.policy,
            exclusions.as_ref(),
        );
        let listing_permits = Arc::new(Semaphore::new(self.max_concurrent_runs));
        let mut run_tasks = JoinSet::new();
        let mut pending_runs = HashSet::new();
        let mut report = RetentionReport::default();

        let enumeration = loop {
            match enumerator.next_page().await {
                Ok(Some(runs)) => {
                    for run in runs {
                        pending_runs.insert(run.id());
                        report.runs_admitted = report.runs_admitted.saturating_add(1);
                        run_tasks.spawn(process_run(
                            evaluator.clone(),
                            orchestrator.clone(),
                            listing_permits.clone(),
                            run,
                        ));
                    }
                }
                Ok(None) => break Ok(()),
                Err(error) => break Err(error),
            }
        };

        while let Some(joined) = run_tasks.join_next().await {
            match joined {
                Ok(run_report) => {
                    pending_runs.remove(&run_report.run_id);
                    report.absorb(run_report);
                }
                Err(join_error) => {
                    error!(error = %join_error, "workflow run task aborted");
                }
            }
        }

        for run_id in pending_runs {
            report.run_failures.push(RunFailure {
                run_id,
                reason: "workflow run task aborted before reporting".to_owned(),
            });
        }

        report.runs_skipped_tagged = enumerator.skipped_tagged();
        report.runs_skipped_invalid = enumerator.skipped_invalid();

        if let Err(error) = enumeration {
            error!(
                repository = %repository,
                error = %error,
                admitted_runs = report.runs_admitted,
                "workflow run listing failed; retention pass incomplete"
            );
            return Err(error);
        }

        info!(
            repository = %repository,
            runs_admitted = report.runs_admitted,
            runs_skipped_tagged = report.runs_skipped_tagged,
            runs_skipped_invalid = report.runs_skipped_invalid,
            runs_failed = report.run_failures.len(),
            artifacts_scanned = report.artifacts_scanned,
            artifacts_kept = report.artifacts_kept,
            deleted = report.deleted_count(),
            simulated = report.simulated_count(),
            failed = report.failed_count(),
            "retention pass finished"
        );

        Ok(report)
    }
}

async fn process_run(
    evaluator: ArtifactRetentionEvaluator,
    orchestrator: DeletionOrchestrator,
    listing_permits: Arc<Semaphore>,
    run: WorkflowRun,
) -> RunReport {
    let mut run_report = RunReport::new(run.id());

    // the permit covers artifact listing only; deletions have their own bound
    let listed = match listing_permits.acquire().await {
        Ok(_permit) => evaluator.evaluate(&run).await,
        Err(error) => Err(AppError::Internal(format!(
            "artifact listing permit unavailable: {error}"
        ))),
    };

    let evaluations = match listed {
        Ok(evaluations) => evaluations,
        Err(error) => {
            warn!(
                run_id = run.id(),
                error = %error,
                "failed to list run artifacts; run skipped"
            );
            run_report.failure = Some(RunFailure {
                run_id: run.id(),
                reason: error.to_string(),
            });
            return run_report;
        }
    };

    run_report.artifacts_scanned = evaluations.len();
    let requests: Vec<DeletionRequest> = evaluations
        .into_iter()
        .filter_map(|evaluation| match evaluation.decision {
            RetentionDecision::Delete => Some(DeletionRequest {
                run_id: run.id(),
                artifact: evaluation.artifact,
            }),
            RetentionDecision::Keep => None,
        })
        .collect();
    run_report.artifacts_kept = run_report.artifacts_scanned - requests.len();
    run_report.deletions = orchestrator.delete_all(requests).await;

    run_report
}

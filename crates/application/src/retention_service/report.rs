use super::*;

/// Terminal outcome for one artifact selected for deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDeletion {
    /// Run that uploaded the artifact.
    pub run_id: u64,
    /// Deleted artifact identifier.
    pub artifact_id: u64,
    /// Deletion result.
    pub outcome: DeletionOutcome,
}

/// Run whose artifacts could not be evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFailure {
    /// Affected run.
    pub run_id: u64,
    /// Failure description.
    pub reason: String,
}

/// Result of processing one admitted run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Processed run.
    pub run_id: u64,
    /// Number of artifacts listed for the run.
    pub artifacts_scanned: usize,
    /// Number of artifacts retained by the policy.
    pub artifacts_kept: usize,
    /// Deletion outcomes for the run.
    pub deletions: Vec<ArtifactDeletion>,
    /// Listing failure that prevented evaluation.
    pub failure: Option<RunFailure>,
}

impl RunReport {
    /// Creates an empty report for one run.
    #[must_use]
    pub fn new(run_id: u64) -> Self {
        Self {
            run_id,
            artifacts_scanned: 0,
            artifacts_kept: 0,
            deletions: Vec::new(),
            failure: None,
        }
    }
}

/// Aggregate result of one retention pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionReport {
    /// Runs handed to artifact evaluation.
    pub runs_admitted: usize,
    /// Runs skipped because their head commit is tagged.
    pub runs_skipped_tagged: usize,
    /// Runs skipped because they had no id.
    pub runs_skipped_invalid: usize,
    /// Artifacts listed across all evaluated runs.
    pub artifacts_scanned: usize,
    /// Artifacts retained by the policy.
    pub artifacts_kept: usize,
    /// Outcome of every issued deletion.
    pub deletions: Vec<ArtifactDeletion>,
    /// Runs whose artifacts could not be listed.
    pub run_failures: Vec<RunFailure>,
}

impl RetentionReport {
    /// Folds one run report into the aggregate.
    pub fn absorb(&mut self, run_report: RunReport) {
        self.artifacts_scanned = self
            .artifacts_scanned
            .saturating_add(run_report.artifacts_scanned);
        self.artifacts_kept = self
            .artifacts_kept
            .saturating_add(run_report.artifacts_kept);
        self.deletions.extend(run_report.deletions);
        self.run_failures.extend(run_report.failure);
    }

    /// Returns the number of artifacts removed.
    #[must_use]
    pub fn deleted_count(&self) -> usize {
        self.count_outcomes(|outcome| matches!(outcome, DeletionOutcome::Deleted))
    }

    /// Returns the number of deletions replaced by log output.
    #[must_use]
    pub fn simulated_count(&self) -> usize {
        self.count_outcomes(|outcome| matches!(outcome, DeletionOutcome::Simulated))
    }

    /// Returns the number of failed deletions.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.count_outcomes(DeletionOutcome::is_failed)
    }

    /// Returns the number of artifacts that were eligible for deletion.
    #[must_use]
    pub fn eligible_count(&self) -> usize {
        self.deletions.len()
    }

    fn count_outcomes(&self, predicate: impl Fn(&DeletionOutcome) -> bool) -> usize {
        self.deletions
            .iter()
            .filter(|deletion| predicate(&deletion.outcome))
            .count()
    }
}

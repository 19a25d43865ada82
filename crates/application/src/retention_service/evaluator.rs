use super::*;

/// Artifact paired with its retention decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactEvaluation {
    /// Listed artifact.
    pub artifact: Artifact,
    /// Policy decision for the artifact.
    pub decision: RetentionDecision,
}

/// Lists a run's artifacts and applies the retention policy to each.
#[derive(Clone)]
pub struct ArtifactRetentionEvaluator {
    platform: Arc<dyn ArtifactPlatform>,
    repository: RepositorySlug,
    policy: RetentionPolicy,
    exclusions: Arc<TagExclusionSet>,
}

impl ArtifactRetentionEvaluator {
    /// Creates an evaluator bound to one repository and exclusion snapshot.
    #[must_use]
    pub fn new(
        platform: Arc<dyn ArtifactPlatform>,
        repository: RepositorySlug,
        policy: RetentionPolicy,
        exclusions: Arc<TagExclusionSet>,
    ) -> Self {
        Self {
            platform,
            repository,
            policy,
            exclusions,
        }
    }

    /// Returns every artifact of `run` in listing order with its decision.
    pub async fn evaluate(&self, run: &WorkflowRun) -> AppResult<Vec<ArtifactEvaluation>> {
        let artifacts = collect_pages(|page| {
            self.platform
                .list_run_artifacts(&self.repository, run.id(), page)
        })
        .await
        .map_err(|error| {
            AppError::Fetch(format!(
                "failed to list artifacts for run {}: {error}",
                run.id()
            ))
        })?;

        Ok(artifacts
            .into_iter()
            .map(|artifact| {
                let decision = self.policy.decide(run, &artifact, &self.exclusions);
                debug!(
                    run_id = run.id(),
                    artifact_id = artifact.id(),
                    created_at = %artifact.created_at().to_rfc3339(),
                    decision = decision.as_str(),
                    "evaluated artifact"
                );
                ArtifactEvaluation { artifact, decision }
            })
            .collect())
    }
}

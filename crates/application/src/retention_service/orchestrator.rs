use super::*;

/// One artifact selected for deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionRequest {
    /// Run that uploaded the artifact.
    pub run_id: u64,
    /// Artifact to delete.
    pub artifact: Artifact,
}

/// Issues deletions concurrently and waits for every one of them.
///
/// All clones share one semaphore, so the in-flight bound holds across runs.
/// Simulate-only mode is decided here and nowhere else.
#[derive(Clone)]
pub struct DeletionOrchestrator {
    platform: Arc<dyn ArtifactPlatform>,
    repository: RepositorySlug,
    simulate_only: bool,
    permits: Arc<Semaphore>,
}

impl DeletionOrchestrator {
    /// Creates an orchestrator allowing `max_in_flight` simultaneous deletions.
    #[must_use]
    pub fn new(
        platform: Arc<dyn ArtifactPlatform>,
        repository: RepositorySlug,
        simulate_only: bool,
        max_in_flight: usize,
    ) -> Self {
        Self {
            platform,
            repository,
            simulate_only,
            permits: Arc::new(Semaphore::new(max_in_flight.max(1))),
        }
    }

    /// Deletes every requested artifact and returns one outcome per request.
    ///
    /// Failures never short-circuit sibling deletions. Outcomes are returned in
    /// request order once all deletions have resolved.
    pub async fn delete_all(&self, requests: Vec<DeletionRequest>) -> Vec<ArtifactDeletion> {
        let mut tasks = JoinSet::new();
        for (index, request) in requests.iter().cloned().enumerate() {
            let orchestrator = self.clone();
            tasks.spawn(async move { (index, orchestrator.delete_one(request).await) });
        }

        let mut outcomes: Vec<Option<DeletionOutcome>> = vec![None; requests.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => outcomes[index] = Some(outcome),
                Err(join_error) => {
                    error!(error = %join_error, "artifact deletion task aborted");
                }
            }
        }

        requests
            .into_iter()
            .zip(outcomes)
            .map(|(request, outcome)| {
                let outcome = outcome.unwrap_or_else(|| {
                    warn!(
                        run_id = request.run_id,
                        artifact_id = request.artifact.id(),
                        "artifact deletion task aborted before reporting"
                    );
                    DeletionOutcome::Failed("deletion task aborted".to_owned())
                });
                ArtifactDeletion {
                    run_id: request.run_id,
                    artifact_id: request.artifact.id(),
                    outcome,
                }
            })
            .collect()
    }

    async fn delete_one(&self, request: DeletionRequest) -> DeletionOutcome {
        let artifact_id = request.artifact.id();

        if self.simulate_only {
            info!(
                run_id = request.run_id,
                artifact_id,
                artifact_name = request.artifact.name(),
                created_at = %request.artifact.created_at().to_rfc3339(),
                "simulate-only mode, would remove artifact"
            );
            return DeletionOutcome::Simulated;
        }

        let _permit = match self.permits.acquire().await {
            Ok(permit) => permit,
            Err(error) => {
                warn!(
                    run_id = request.run_id,
                    artifact_id,
                    error = %error,
                    "deletion permit unavailable"
                );
                return DeletionOutcome::Failed(error.to_string());
            }
        };

        match self
            .platform
            .delete_artifact(&self.repository, artifact_id)
            .await
        {
            Ok(()) => {
                info!(
                    run_id = request.run_id,
                    artifact_id,
                    artifact_name = request.artifact.name(),
                    "removed artifact"
                );
                DeletionOutcome::Deleted
            }
            Err(error) => {
                warn!(
                    run_id = request.run_id,
                    artifact_id,
                    error = %error,
                    "failed to remove artifact"
                );
                DeletionOutcome::Failed(error.to_string())
            }
        }
    }
}

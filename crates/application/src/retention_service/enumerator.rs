use super::*;

/// Lazy, non-restartable sequence of admitted workflow runs.
///
/// Each call to [`RunEnumerator::next_page`] fetches one page of runs and
/// drops entries without an id, repeated ids, and runs protected by the tag
/// exclusion snapshot. After exhaustion or a fetch error no further pages are
/// produced.
pub struct RunEnumerator<'a> {
    platform: &'a dyn ArtifactPlatform,
    repository: &'a RepositorySlug,
    policy: &'a RetentionPolicy,
    exclusions: &'a TagExclusionSet,
    next_request: Option<PageRequest>,
    seen_run_ids: HashSet<u64>,
    skipped_tagged: usize,
    skipped_invalid: usize,
}

impl<'a> RunEnumerator<'a> {
    /// Creates an enumerator positioned before the first page.
    #[must_use]
    pub fn new(
        platform: &'a dyn ArtifactPlatform,
        repository: &'a RepositorySlug,
        policy: &'a RetentionPolicy,
        exclusions: &'a TagExclusionSet,
    ) -> Self {
        Self {
            platform,
            repository,
            policy,
            exclusions,
            next_request: Some(PageRequest::first()),
            seen_run_ids: HashSet::new(),
            skipped_tagged: 0,
            skipped_invalid: 0,
        }
    }

    /// Returns admitted runs from the next page, or `None` when exhausted.
    pub async fn next_page(&mut self) -> AppResult<Option<Vec<WorkflowRun>>> {
        let Some(request) = self.next_request.take() else {
            return Ok(None);
        };

        let page = self
            .platform
            .list_workflow_runs(self.repository, request)
            .await
            .map_err(|error| {
                AppError::Fetch(format!(
                    "failed to list workflow runs for repository '{}' (page {}): {error}",
                    self.repository, request.page
                ))
            })?;

        if let Some(next_page) = page.next_page {
            self.next_request = Some(request.advance(next_page)?);
        }

        Ok(Some(
            page.items
                .into_iter()
                .filter_map(|raw_run| self.admit(raw_run))
                .collect(),
        ))
    }

    /// Returns the number of runs skipped because their commit is tagged.
    #[must_use]
    pub fn skipped_tagged(&self) -> usize {
        self.skipped_tagged
    }

    /// Returns the number of structurally invalid runs skipped.
    #[must_use]
    pub fn skipped_invalid(&self) -> usize {
        self.skipped_invalid
    }

    fn admit(&mut self, raw_run: RawWorkflowRun) -> Option<WorkflowRun> {
        let Some(run_id) = raw_run.id.filter(|id| *id != 0) else {
            self.skipped_invalid = self.skipped_invalid.saturating_add(1);
            return None;
        };

        // listings shift while new runs are created, so a run can show up twice
        if !self.seen_run_ids.insert(run_id) {
            return None;
        }

        let run = WorkflowRun::new(
            run_id,
            CommitSha::new(raw_run.head_sha.unwrap_or_default()),
        );

        if self.policy.protects_run(&run, self.exclusions) {
            self.skipped_tagged = self.skipped_tagged.saturating_add(1);
            info!(
                run_id = run.id(),
                head_sha = %run.head_sha(),
                "skipping tagged run"
            );
            return None;
        }

        Some(run)
    }
}

use async_trait::async_trait;
use reaper_core::{AppError, AppResult};
use reaper_domain::{Artifact, RepositorySlug, Tag};

/// Largest page size accepted by the platform listing endpoints.
pub const MAX_PAGE_SIZE: u8 = 100;

/// One page position in a paginated listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageRequest {
    /// One-based page number.
    pub page: u32,
    /// Requested page size.
    pub per_page: u8,
}

impl PageRequest {
    /// Returns the first page with the largest page size.
    #[must_use]
    pub fn first() -> Self {
        Self {
            page: 1,
            per_page: MAX_PAGE_SIZE,
        }
    }

    /// Returns the request for `next_page`, rejecting pagination that does not advance.
    pub fn advance(self, next_page: u32) -> AppResult<Self> {
        if next_page <= self.page {
            return Err(AppError::Fetch(format!(
                "pagination did not advance past page {} (next page {next_page})",
                self.page
            )));
        }

        Ok(Self {
            page: next_page,
            per_page: self.per_page,
        })
    }
}

/// One page of listing results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Items in platform order.
    pub items: Vec<T>,
    /// Next page number, when more pages exist.
    pub next_page: Option<u32>,
}

/// Workflow run as listed by the platform, before structural validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawWorkflowRun {
    /// Run identifier, absent for malformed entries.
    pub id: Option<u64>,
    /// Head commit identifier.
    pub head_sha: Option<String>,
}

/// Port for the CI platform holding runs, artifacts and tags.
#[async_trait]
pub trait ArtifactPlatform: Send + Sync {
    /// Lists one page of repository tags.
    async fn list_tags(&self, repository: &RepositorySlug, page: PageRequest)
    -> AppResult<Page<Tag>>;

    /// Lists one page of repository workflow runs.
    async fn list_workflow_runs(
        &self,
        repository: &RepositorySlug,
        page: PageRequest,
    ) -> AppResult<Page<RawWorkflowRun>>;

    /// Lists one page of artifacts uploaded by a run.
    async fn list_run_artifacts(
        &self,
        repository: &RepositorySlug,
        run_id: u64,
        page: PageRequest,
    ) -> AppResult<Page<Artifact>>;

    /// Deletes one artifact.
    async fn delete_artifact(&self, repository: &RepositorySlug, artifact_id: u64)
    -> AppResult<()>;
}

/// Drains a paginated listing into one vector, preserving page order.
pub async fn collect_pages<T, F, Fut>(mut fetch_page: F) -> AppResult<Vec<T>>
where
    F: FnMut(PageRequest) -> Fut,
    Fut: Future<Output = AppResult<Page<T>>>,
{
    let mut request = PageRequest::first();
    let mut items = Vec::new();

    loop {
        let page = fetch_page(request).await?;
        items.extend(page.items);

        match page.next_page {
            Some(next_page) => request = request.advance(next_page)?,
            None => return Ok(items),
        }
    }
}

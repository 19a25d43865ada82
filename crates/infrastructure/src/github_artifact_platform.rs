use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reaper_application::{ArtifactPlatform, Page, PageRequest, RawWorkflowRun};
use reaper_core::{AppError, AppResult};
use reaper_domain::{Artifact, CommitSha, RepositorySlug, Tag};
use reqwest::{StatusCode, header};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

/// Public GitHub REST API base URL.
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

const GITHUB_API_VERSION: &str = "2022-11-28";
const GITHUB_MEDIA_TYPE: &str = "application/vnd.github+json";
const USER_AGENT: &str = concat!("artifact-reaper/", env!("CARGO_PKG_VERSION"));

/// GitHub Actions implementation of the artifact platform port.
pub struct GitHubArtifactPlatform {
    http_client: reqwest::Client,
    api_base_url: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TagResponse {
    name: String,
    commit: TagCommitResponse,
}

#[derive(Debug, Deserialize)]
struct TagCommitResponse {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct WorkflowRunsResponse {
    workflow_runs: Vec<WorkflowRunResponse>,
}

#[derive(Debug, Deserialize)]
struct WorkflowRunResponse {
    id: Option<u64>,
    head_sha: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ArtifactsResponse {
    artifacts: Vec<ArtifactResponse>,
}

#[derive(Debug, Deserialize)]
struct ArtifactResponse {
    id: u64,
    name: String,
    created_at: Option<DateTime<Utc>>,
}

impl GitHubArtifactPlatform {
    /// Creates a platform client for the API rooted at `api_base_url`.
    ///
    /// Requests are sent anonymously when `token` is `None`.
    pub fn new(
        http_client: reqwest::Client,
        api_base_url: &str,
        token: Option<String>,
    ) -> AppResult<Self> {
        let parsed = Url::parse(api_base_url).map_err(|error| {
            AppError::Config(format!("invalid GitHub API URL '{api_base_url}': {error}"))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AppError::Config(format!(
                "GitHub API URL '{api_base_url}' must use http or https"
            )));
        }

        Ok(Self {
            http_client,
            api_base_url: api_base_url.trim_end_matches('/').to_owned(),
            token: token.filter(|value| !value.trim().is_empty()),
        })
    }

    fn repository_endpoint(&self, repository: &RepositorySlug, suffix: &str) -> String {
        format!(
            "{}/repos/{}/{}/{suffix}",
            self.api_base_url,
            repository.owner(),
            repository.name()
        )
    }

    fn request(&self, method: reqwest::Method, endpoint: &str) -> reqwest::RequestBuilder {
        let builder = self
            .http_client
            .request(method, endpoint)
            .header(header::ACCEPT, GITHUB_MEDIA_TYPE)
            .header(header::USER_AGENT, USER_AGENT)
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION);

        match &self.token {
            Some(token) => builder.header(header::AUTHORIZATION, format!("Bearer {token}")),
            None => builder,
        }
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        page: PageRequest,
        context: &str,
    ) -> AppResult<(T, Option<u32>)> {
        let url = format!(
            "{endpoint}?per_page={}&page={}",
            page.per_page, page.page
        );
        debug!(url = %url, "listing {context}");

        let response = self
            .request(reqwest::Method::GET, url.as_str())
            .send()
            .await
            .map_err(|error| AppError::Fetch(format!("failed to list {context}: {error}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_owned());
            return Err(status_error(status, &format!("listing {context}"), &body));
        }

        let next_page = match response.headers().get(header::LINK) {
            Some(value) => {
                let value = value.to_str().map_err(|error| {
                    AppError::Fetch(format!("unreadable Link header listing {context}: {error}"))
                })?;
                next_page_from_link_header(value)?
            }
            None => None,
        };

        let body = response.json::<T>().await.map_err(|error| {
            AppError::Fetch(format!(
                "failed to parse {context} response body: {error}"
            ))
        })?;

        Ok((body, next_page))
    }
}

#[async_trait]
impl ArtifactPlatform for GitHubArtifactPlatform {
    async fn list_tags(
        &self,
        repository: &RepositorySlug,
        page: PageRequest,
    ) -> AppResult<Page<Tag>> {
        let endpoint = self.repository_endpoint(repository, "tags");
        let (tags, next_page) = self
            .get_page::<Vec<TagResponse>>(endpoint.as_str(), page, "repository tags")
            .await?;

        Ok(Page {
            items: tags
                .into_iter()
                .map(|tag| Tag::new(tag.name, CommitSha::new(tag.commit.sha)))
                .collect(),
            next_page,
        })
    }

    async fn list_workflow_runs(
        &self,
        repository: &RepositorySlug,
        page: PageRequest,
    ) -> AppResult<Page<RawWorkflowRun>> {
        let endpoint = self.repository_endpoint(repository, "actions/runs");
        let (response, next_page) = self
            .get_page::<WorkflowRunsResponse>(endpoint.as_str(), page, "workflow runs")
            .await?;

        Ok(Page {
            items: response
                .workflow_runs
                .into_iter()
                .map(|run| RawWorkflowRun {
                    id: run.id,
                    head_sha: run.head_sha,
                })
                .collect(),
            next_page,
        })
    }

    async fn list_run_artifacts(
        &self,
        repository: &RepositorySlug,
        run_id: u64,
        page: PageRequest,
    ) -> AppResult<Page<Artifact>> {
        let endpoint =
            self.repository_endpoint(repository, &format!("actions/runs/{run_id}/artifacts"));
        let (response, next_page) = self
            .get_page::<ArtifactsResponse>(endpoint.as_str(), page, "run artifacts")
            .await?;

        let items = response
            .artifacts
            .into_iter()
            .filter_map(|artifact| match artifact.created_at {
                Some(created_at) => Some(Artifact::new(artifact.id, artifact.name, created_at)),
                None => {
                    // without a creation time the artifact can never be stale
                    debug!(
                        run_id,
                        artifact_id = artifact.id,
                        "ignoring artifact without creation time"
                    );
                    None
                }
            })
            .collect();

        Ok(Page { items, next_page })
    }

    async fn delete_artifact(
        &self,
        repository: &RepositorySlug,
        artifact_id: u64,
    ) -> AppResult<()> {
        let endpoint =
            self.repository_endpoint(repository, &format!("actions/artifacts/{artifact_id}"));
        let response = self
            .request(reqwest::Method::DELETE, endpoint.as_str())
            .send()
            .await
            .map_err(|error| {
                AppError::Fetch(format!(
                    "failed to call artifact delete endpoint for {artifact_id}: {error}"
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_owned());
            return Err(status_error(
                status,
                &format!("deleting artifact {artifact_id}"),
                &body,
            ));
        }

        Ok(())
    }
}

fn status_error(status: StatusCode, action: &str, body: &str) -> AppError {
    let message = format!("{action} returned status {}: {body}", status.as_u16());

    match status {
        StatusCode::NOT_FOUND => AppError::NotFound(message),
        StatusCode::UNAUTHORIZED => AppError::Unauthorized(message),
        StatusCode::FORBIDDEN => AppError::Forbidden(message),
        StatusCode::TOO_MANY_REQUESTS => AppError::RateLimited(message),
        _ => AppError::Fetch(message),
    }
}

/// Extracts the `page` query parameter of the `rel="next"` target in a `Link` header.
///
/// Returns `None` only when no `rel="next"` link is present. A next link that
/// does not carry a page number is an error, since treating it as the last page
/// would silently truncate the listing.
pub(crate) fn next_page_from_link_header(value: &str) -> AppResult<Option<u32>> {
    let next_target = value.split(',').find_map(|link| {
        let mut segments = link.split(';');
        let target = segments.next()?.trim();
        let is_next = segments.any(|parameter| {
            parameter
                .trim()
                .strip_prefix("rel=")
                .is_some_and(|rel| {
                    rel.trim_matches('"')
                        .split_whitespace()
                        .any(|kind| kind == "next")
                })
        });
        is_next.then_some(target)
    });
    let Some(target) = next_target else {
        return Ok(None);
    };

    target
        .strip_prefix('<')
        .and_then(|target| target.strip_suffix('>'))
        .and_then(|target| Url::parse(target).ok())
        .and_then(|url| {
            url.query_pairs()
                .find(|(key, _)| key == "page")
                .and_then(|(_, page)| page.parse::<u32>().ok())
        })
        .map(Some)
        .ok_or_else(|| {
            AppError::Fetch(format!(
                "next page link '{target}' does not carry a page number"
            ))
        })
}

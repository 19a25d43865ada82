use super::*;

/// Builds the tag exclusion snapshot for one invocation.
///
/// Returns the empty set without contacting the platform when the policy does
/// not protect tagged commits.
pub async fn build_exclusion_set(
    platform: &dyn ArtifactPlatform,
    repository: &RepositorySlug,
    policy: &RetentionPolicy,
) -> AppResult<TagExclusionSet> {
    if !policy.skip_tagged_commits() {
        return Ok(TagExclusionSet::empty());
    }

    let tags = collect_pages(|page| platform.list_tags(repository, page))
        .await
        .map_err(|error| {
            AppError::Fetch(format!(
                "failed to list tags for repository '{repository}': {error}"
            ))
        })?;
    let tag_count = tags.len();
    for tag in &tags {
        debug!(tag = tag.name(), commit_sha = %tag.commit_sha(), "protecting tagged commit");
    }
    let exclusions = TagExclusionSet::from_tags(tags);

    info!(
        repository = %repository,
        tags = tag_count,
        protected_commits = exclusions.len(),
        "built tag exclusion set"
    );

    Ok(exclusions)
}

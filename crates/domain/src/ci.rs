use std::collections::HashSet;
use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};

/// Commit identifier, normalized to lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommitSha(String);

impl CommitSha {
    /// Creates a commit identifier.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().trim().to_ascii_lowercase())
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for CommitSha {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// One execution of a CI workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowRun {
    id: u64,
    head_sha: CommitSha,
}

impl WorkflowRun {
    /// Creates a workflow run.
    #[must_use]
    pub fn new(id: u64, head_sha: CommitSha) -> Self {
        Self { id, head_sha }
    }

    /// Returns the platform run identifier.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns the commit the run was built from.
    #[must_use]
    pub fn head_sha(&self) -> &CommitSha {
        &self.head_sha
    }
}

/// File bundle uploaded by a workflow run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    id: u64,
    name: String,
    created_at: DateTime<Utc>,
}

impl Artifact {
    /// Creates an artifact.
    #[must_use]
    pub fn new(id: u64, name: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: name.into(),
            created_at,
        }
    }

    /// Returns the platform artifact identifier.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns the artifact name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns when the artifact was uploaded.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Repository tag and the commit it points to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    name: String,
    commit_sha: CommitSha,
}

impl Tag {
    /// Creates a tag.
    #[must_use]
    pub fn new(name: impl Into<String>, commit_sha: CommitSha) -> Self {
        Self {
            name: name.into(),
            commit_sha,
        }
    }

    /// Returns the tag name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the tagged commit.
    #[must_use]
    pub fn commit_sha(&self) -> &CommitSha {
        &self.commit_sha
    }
}

/// Read-only snapshot of tagged commits taken once per invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagExclusionSet {
    commits: HashSet<CommitSha>,
}

impl TagExclusionSet {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Collects the commits pointed to by `tags`, collapsing duplicates.
    #[must_use]
    pub fn from_tags(tags: impl IntoIterator<Item = Tag>) -> Self {
        tags.into_iter().map(|tag| tag.commit_sha).collect()
    }

    /// Returns whether `sha` is tagged.
    #[must_use]
    pub fn contains(&self, sha: &CommitSha) -> bool {
        self.commits.contains(sha)
    }

    /// Returns the number of distinct tagged commits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commits.len()
    }

    /// Returns whether no commit is tagged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }
}

impl FromIterator<CommitSha> for TagExclusionSet {
    fn from_iter<I: IntoIterator<Item = CommitSha>>(iter: I) -> Self {
        Self {
            commits: iter.into_iter().collect(),
        }
    }
}

/// Terminal result of one deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletionOutcome {
    /// Artifact was removed from the platform.
    Deleted,
    /// Deletion was only logged.
    Simulated,
    /// Platform rejected or failed the deletion.
    Failed(String),
}

impl DeletionOutcome {
    /// Returns whether the deletion failed.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_sha_is_normalized() {
        assert_eq!(CommitSha::new(" ABCdef ").as_str(), "abcdef");
    }

    #[test]
    fn exclusion_set_collapses_duplicate_commits() {
        let exclusions = TagExclusionSet::from_tags([
            Tag::new("v1.0.0", CommitSha::new("aaa")),
            Tag::new("latest", CommitSha::new("AAA")),
            Tag::new("v0.9.0", CommitSha::new("bbb")),
        ]);

        assert_eq!(exclusions.len(), 2);
        assert!(exclusions.contains(&CommitSha::new("aaa")));
        assert!(!exclusions.contains(&CommitSha::new("ccc")));
    }

    #[test]
    fn only_failed_outcome_reports_failure() {
        assert!(DeletionOutcome::Failed("gone".to_owned()).is_failed());
        assert!(!DeletionOutcome::Deleted.is_failed());
        assert!(!DeletionOutcome::Simulated.is_failed());
    }
}

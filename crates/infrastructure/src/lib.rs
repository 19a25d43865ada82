//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod github_artifact_platform;

pub use github_artifact_platform::{DEFAULT_GITHUB_API_URL, GitHubArtifactPlatform};

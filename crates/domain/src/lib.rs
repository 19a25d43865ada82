//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod ci;
mod repository;
mod retention;

pub use ci::{Artifact, CommitSha, DeletionOutcome, Tag, TagExclusionSet, WorkflowRun};
pub use repository::RepositorySlug;
pub use retention::{AgeUnit, RetentionAge, RetentionDecision, RetentionPolicy, parse_bool_flag};

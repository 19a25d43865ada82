//! Application services and ports.

#![forbid(unsafe_code)]

mod platform_ports;
mod retention_service;

pub use platform_ports::{
    ArtifactPlatform, MAX_PAGE_SIZE, Page, PageRequest, RawWorkflowRun, collect_pages,
};
pub use retention_service::{
    ArtifactDeletion, ArtifactEvaluation, ArtifactRetentionEvaluator,
    DEFAULT_MAX_CONCURRENT_DELETIONS, DEFAULT_MAX_CONCURRENT_RUNS, DeletionOrchestrator, DeletionRequest, RetentionReport,
    RetentionService, RunEnumerator, RunFailure, RunReport, build_exclusion_set,
};

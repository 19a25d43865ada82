//! artifact-reaper: removes stale GitHub Actions artifacts.

#![forbid(unsafe_code)]

mod config;

use std::sync::Arc;
use std::time::Duration;

use reaper_application::RetentionService;
use reaper_core::{AppError, AppResult};
use reaper_infrastructure::GitHubArtifactPlatform;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::ReaperConfig;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    if let Err(error) = run().await {
        error!(error = %error, "artifact retention aborted");
        return Err(error);
    }

    Ok(())
}

async fn run() -> AppResult<()> {
    let config = ReaperConfig::load()?;
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_seconds))
        .build()
        .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;
    let platform = GitHubArtifactPlatform::new(
        http_client,
        config.api_base_url.as_str(),
        config.token.clone(),
    )?;

    info!(
        repository = %config.repository,
        age = %config.age,
        api_base_url = %config.api_base_url,
        max_concurrent_deletions = config.max_concurrent_deletions,
        max_concurrent_runs = config.max_concurrent_runs,
        simulate_only = config.policy.simulate_only(),
        "artifact-reaper started"
    );
    if config.policy.simulate_only() {
        info!("development environment recognized, artifacts will not be removed");
    }

    let service = RetentionService::new(Arc::new(platform), config.policy)
        .with_max_concurrent_deletions(config.max_concurrent_deletions)
        .with_max_concurrent_runs(config.max_concurrent_runs);
    let report = service.run(&config.repository).await?;

    if report.failed_count() > 0 || !report.run_failures.is_empty() {
        warn!(
            failed_deletions = report.failed_count(),
            failed_runs = report.run_failures.len(),
            "retention pass finished with isolated failures"
        );
    }

    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

//! Startup configuration read once from the process environment.

use chrono::{DateTime, Utc};
use reaper_application::{DEFAULT_MAX_CONCURRENT_DELETIONS, DEFAULT_MAX_CONCURRENT_RUNS};
use reaper_core::{AppError, AppResult};
use reaper_domain::{RepositorySlug, RetentionAge, RetentionPolicy, parse_bool_flag};
use reaper_infrastructure::DEFAULT_GITHUB_API_URL;

const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 30;

/// Explicit configuration passed to every component.
#[derive(Debug, Clone)]
pub struct ReaperConfig {
    pub repository: RepositorySlug,
    pub age: RetentionAge,
    pub policy: RetentionPolicy,
    pub token: Option<String>,
    pub api_base_url: String,
    pub max_concurrent_deletions: usize,
    pub max_concurrent_runs: usize,
    pub http_timeout_seconds: u64,
}

impl ReaperConfig {
    /// Loads configuration from environment variables.
    pub fn load() -> AppResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok(), Utc::now())
    }

    /// Builds configuration from a variable lookup, computing the cutoff from `now`.
    pub fn from_lookup<F>(lookup: F, now: DateTime<Utc>) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let repository = non_empty("GITHUB_REPOSITORY")
            .ok_or_else(|| AppError::Config("GITHUB_REPOSITORY is required".to_owned()))
            .and_then(|value| RepositorySlug::parse(value.as_str()))?;

        let development = non_empty("REAPER_ENV")
            .is_some_and(|value| matches!(value.to_ascii_lowercase().as_str(), "dev" | "development"));
        let simulate_only = development
            || parse_bool_flag(
                "INPUT_SIMULATE",
                non_empty("INPUT_SIMULATE").unwrap_or_default().as_str(),
            )?;

        let age = non_empty("INPUT_AGE")
            .or_else(|| non_empty("AGE"))
            .ok_or_else(|| AppError::Config("INPUT_AGE is required".to_owned()))
            .and_then(|value| RetentionAge::parse(value.as_str()))?;
        let skip_tagged_commits = parse_bool_flag(
            "INPUT_SKIP_TAGS",
            non_empty("INPUT_SKIP_TAGS").unwrap_or_default().as_str(),
        )?;
        let policy = RetentionPolicy::new(age, now, skip_tagged_commits, simulate_only)?;

        let token = non_empty("INPUT_GITHUB_TOKEN")
            .or_else(|| non_empty("GITHUB_TOKEN"))
            .or_else(|| non_empty("PERSONAL_ACCESS_TOKEN"));
        if token.is_none() && !simulate_only {
            return Err(AppError::Config(
                "INPUT_GITHUB_TOKEN is required outside simulate-only mode".to_owned(),
            ));
        }

        let api_base_url =
            non_empty("GITHUB_API_URL").unwrap_or_else(|| DEFAULT_GITHUB_API_URL.to_owned());
        let max_concurrent_deletions = parse_positive(
            "INPUT_MAX_CONCURRENT_DELETIONS",
            non_empty("INPUT_MAX_CONCURRENT_DELETIONS"),
            DEFAULT_MAX_CONCURRENT_DELETIONS,
        )?;
        let max_concurrent_runs = parse_positive(
            "INPUT_MAX_CONCURRENT_RUNS",
            non_empty("INPUT_MAX_CONCURRENT_RUNS"),
            DEFAULT_MAX_CONCURRENT_RUNS,
        )?;
        let http_timeout_seconds = parse_positive(
            "REAPER_HTTP_TIMEOUT_SECONDS",
            non_empty("REAPER_HTTP_TIMEOUT_SECONDS"),
            DEFAULT_HTTP_TIMEOUT_SECONDS,
        )?;

        Ok(Self {
            repository,
            age,
            policy,
            token,
            api_base_url,
            max_concurrent_deletions,
            max_concurrent_runs,
            http_timeout_seconds,
        })
    }
}

fn parse_positive<T>(name: &str, value: Option<String>, default: T) -> AppResult<T>
where
    T: std::str::FromStr + PartialEq + From<u8>,
    T::Err: std::fmt::Display,
{
    let Some(value) = value else {
        return Ok(default);
    };

    let parsed = value.parse::<T>().map_err(|error| {
        AppError::Config(format!("invalid {name} value '{value}': {error}"))
    })?;
    if parsed == T::from(0) {
        return Err(AppError::Config(format!(
            "{name} must be greater than zero"
        )));
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::{Duration, TimeZone, Utc};
    use reaper_core::AppError;

    use super::ReaperConfig;

    fn load(variables: &[(&str, &str)]) -> Result<ReaperConfig, AppError> {
        let variables: HashMap<String, String> = variables
            .iter()
            .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
            .collect();
        let now = Utc
            .with_ymd_and_hms(2026, 1, 31, 0, 0, 0)
            .single()
            .unwrap_or_else(|| unreachable!());

        ReaperConfig::from_lookup(|name| variables.get(name).cloned(), now)
    }

    #[test]
    fn production_config_requires_token() {
        let result = load(&[("GITHUB_REPOSITORY", "octo-org/widgets"), ("INPUT_AGE", "30 days")]);
        assert!(matches!(result, Err(AppError::Config(message)) if message.contains("TOKEN")));
    }

    #[test]
    fn production_config_builds_policy() {
        let config = load(&[
            ("GITHUB_REPOSITORY", "octo-org/widgets"),
            ("INPUT_AGE", "30 days"),
            ("INPUT_GITHUB_TOKEN", "ghs_secret"),
            ("INPUT_SKIP_TAGS", "true"),
        ])
        .unwrap_or_else(|error| panic!("config should load: {error}"));

        let expected_cutoff = Utc
            .with_ymd_and_hms(2026, 1, 31, 0, 0, 0)
            .single()
            .unwrap_or_else(|| unreachable!())
            - Duration::days(30);
        assert_eq!(config.policy.cutoff(), expected_cutoff);
        assert!(config.policy.skip_tagged_commits());
        assert!(!config.policy.simulate_only());
        assert_eq!(config.repository.to_string(), "octo-org/widgets");
        assert_eq!(config.api_base_url, "https://api.github.com");
        assert_eq!(config.max_concurrent_deletions, 10);
        assert_eq!(config.max_concurrent_runs, 10);
        assert_eq!(config.http_timeout_seconds, 30);
    }

    #[test]
    fn development_mode_simulates_without_token() {
        let config = load(&[
            ("GITHUB_REPOSITORY", "octo-org/widgets"),
            ("AGE", "2 weeks"),
            ("REAPER_ENV", "dev"),
        ])
        .unwrap_or_else(|error| panic!("config should load: {error}"));

        assert!(config.policy.simulate_only());
        assert!(config.token.is_none());
        assert!(!config.policy.skip_tagged_commits());
    }

    #[test]
    fn missing_or_malformed_inputs_are_config_errors() {
        let cases: [&[(&str, &str)]; 6] = [
            &[("INPUT_AGE", "30 days"), ("INPUT_GITHUB_TOKEN", "t")],
            &[("GITHUB_REPOSITORY", "octo-org/widgets"), ("INPUT_GITHUB_TOKEN", "t")],
            &[
                ("GITHUB_REPOSITORY", "octo-org/widgets"),
                ("INPUT_AGE", "thirty days"),
                ("INPUT_GITHUB_TOKEN", "t"),
            ],
            &[
                ("GITHUB_REPOSITORY", "octo-org/widgets"),
                ("INPUT_AGE", "30 days"),
                ("INPUT_GITHUB_TOKEN", "t"),
                ("INPUT_SKIP_TAGS", "sometimes"),
            ],
            &[
                ("GITHUB_REPOSITORY", "octo-org/widgets"),
                ("INPUT_AGE", "30 days"),
                ("INPUT_GITHUB_TOKEN", "t"),
                ("INPUT_MAX_CONCURRENT_DELETIONS", "0"),
            ],
            &[
                ("GITHUB_REPOSITORY", "octo-org/widgets"),
                ("INPUT_AGE", "30 days"),
                ("INPUT_GITHUB_TOKEN", "t"),
                ("INPUT_MAX_CONCURRENT_RUNS", "many"),
            ],
        ];

        for variables in cases {
            assert!(
                matches!(load(variables), Err(AppError::Config(_))),
                "expected config error for {variables:?}"
            );
        }
    }
}

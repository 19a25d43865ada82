//! Retention age, policy and per-artifact decisions.

use std::fmt::{Display, Formatter};

use chrono::{DateTime, Months, TimeDelta, Utc};
use reaper_core::{AppError, AppResult};

use crate::ci::{Artifact, TagExclusionSet, WorkflowRun};

/// Calendar or clock unit used by a retention age.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgeUnit {
    /// Milliseconds.
    Milliseconds,
    /// Seconds.
    Seconds,
    /// Minutes.
    Minutes,
    /// Hours.
    Hours,
    /// Days of 24 hours.
    Days,
    /// Weeks of seven days.
    Weeks,
    /// Calendar months.
    Months,
    /// Calendar quarters of three months.
    Quarters,
    /// Calendar years.
    Years,
}

impl AgeUnit {
    /// Returns stable plural unit name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Milliseconds => "milliseconds",
            Self::Seconds => "seconds",
            Self::Minutes => "minutes",
            Self::Hours => "hours",
            Self::Days => "days",
            Self::Weeks => "weeks",
            Self::Months => "months",
            Self::Quarters => "quarters",
            Self::Years => "years",
        }
    }

    /// Parses a unit name.
    ///
    /// Shorthand forms are case-sensitive (`m` is minutes, `M` is months).
    /// Long forms accept any case and both singular and plural spellings.
    pub fn parse(value: &str) -> AppResult<Self> {
        let shorthand = match value {
            "ms" => Some(Self::Milliseconds),
            "s" => Some(Self::Seconds),
            "m" => Some(Self::Minutes),
            "h" => Some(Self::Hours),
            "d" => Some(Self::Days),
            "w" => Some(Self::Weeks),
            "M" => Some(Self::Months),
            "Q" => Some(Self::Quarters),
            "y" => Some(Self::Years),
            _ => None,
        };
        if let Some(unit) = shorthand {
            return Ok(unit);
        }

        let normalized = value.to_ascii_lowercase();
        let singular = normalized.strip_suffix('s').unwrap_or(normalized.as_str());
        match singular {
            "millisecond" => Ok(Self::Milliseconds),
            "second" => Ok(Self::Seconds),
            "minute" => Ok(Self::Minutes),
            "hour" => Ok(Self::Hours),
            "day" => Ok(Self::Days),
            "week" => Ok(Self::Weeks),
            "month" => Ok(Self::Months),
            "quarter" => Ok(Self::Quarters),
            "year" => Ok(Self::Years),
            _ => Err(AppError::Config(format!("unknown age unit '{value}'"))),
        }
    }
}

impl Display for AgeUnit {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Non-negative age such as `30 days`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionAge {
    amount: u32,
    unit: AgeUnit,
}

impl RetentionAge {
    /// Creates an age from an amount and unit.
    #[must_use]
    pub fn new(amount: u32, unit: AgeUnit) -> Self {
        Self { amount, unit }
    }

    /// Parses an `"<amount> <unit>"` expression.
    pub fn parse(expression: &str) -> AppResult<Self> {
        let mut parts = expression.split_whitespace();
        let (Some(amount), Some(unit), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(AppError::Config(format!(
                "age '{expression}' must have the form '<amount> <unit>'"
            )));
        };

        let amount = amount.parse::<u32>().map_err(|error| {
            AppError::Config(format!(
                "age amount '{amount}' must be a non-negative integer: {error}"
            ))
        })?;

        Ok(Self::new(amount, AgeUnit::parse(unit)?))
    }

    /// Returns the instant that lies this age before `now`.
    pub fn subtract_from(&self, now: DateTime<Utc>) -> AppResult<DateTime<Utc>> {
        let amount = i64::from(self.amount);
        let cutoff = match self.unit {
            AgeUnit::Milliseconds => TimeDelta::try_milliseconds(amount)
                .and_then(|delta| now.checked_sub_signed(delta)),
            AgeUnit::Seconds => {
                TimeDelta::try_seconds(amount).and_then(|delta| now.checked_sub_signed(delta))
            }
            AgeUnit::Minutes => {
                TimeDelta::try_minutes(amount).and_then(|delta| now.checked_sub_signed(delta))
            }
            AgeUnit::Hours => {
                TimeDelta::try_hours(amount).and_then(|delta| now.checked_sub_signed(delta))
            }
            AgeUnit::Days => {
                TimeDelta::try_days(amount).and_then(|delta| now.checked_sub_signed(delta))
            }
            AgeUnit::Weeks => {
                TimeDelta::try_weeks(amount).and_then(|delta| now.checked_sub_signed(delta))
            }
            AgeUnit::Months => now.checked_sub_months(Months::new(self.amount)),
            AgeUnit::Quarters => self
                .amount
                .checked_mul(3)
                .and_then(|months| now.checked_sub_months(Months::new(months))),
            AgeUnit::Years => self
                .amount
                .checked_mul(12)
                .and_then(|months| now.checked_sub_months(Months::new(months))),
        };

        cutoff.ok_or_else(|| {
            AppError::Config(format!("age '{self}' reaches outside the supported time range"))
        })
    }
}

impl Display for RetentionAge {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{} {}", self.amount, self.unit)
    }
}

/// Parses a boolean-like configuration value.
///
/// The empty string is treated as `false` so unset action inputs keep the default.
pub fn parse_bool_flag(name: &str, value: &str) -> AppResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "on" | "1" => Ok(true),
        "false" | "no" | "n" | "off" | "0" | "" => Ok(false),
        other => Err(AppError::Config(format!(
            "{name} must be a boolean value, got '{other}'"
        ))),
    }
}

/// Keep/delete verdict for one artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionDecision {
    /// Artifact is stale and not protected.
    Delete,
    /// Artifact stays.
    Keep,
}

impl RetentionDecision {
    /// Returns stable decision value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delete => "delete",
            Self::Keep => "keep",
        }
    }
}

/// Immutable retention rules for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    cutoff: DateTime<Utc>,
    skip_tagged_commits: bool,
    simulate_only: bool,
}

impl RetentionPolicy {
    /// Creates a policy whose cutoff lies `age` before `now`.
    pub fn new(
        age: RetentionAge,
        now: DateTime<Utc>,
        skip_tagged_commits: bool,
        simulate_only: bool,
    ) -> AppResult<Self> {
        Ok(Self {
            cutoff: age.subtract_from(now)?,
            skip_tagged_commits,
            simulate_only,
        })
    }

    /// Creates a policy from raw age expression and tag-skipping flag inputs.
    pub fn from_inputs(
        age_expression: &str,
        skip_tagged_commits: &str,
        simulate_only: bool,
        now: DateTime<Utc>,
    ) -> AppResult<Self> {
        let age = RetentionAge::parse(age_expression)?;
        let skip_tagged_commits = parse_bool_flag("skip tagged commits", skip_tagged_commits)?;

        Self::new(age, now, skip_tagged_commits, simulate_only)
    }

    /// Returns the instant before which artifacts are stale.
    #[must_use]
    pub fn cutoff(&self) -> DateTime<Utc> {
        self.cutoff
    }

    /// Returns whether runs on tagged commits are protected.
    #[must_use]
    pub fn skip_tagged_commits(&self) -> bool {
        self.skip_tagged_commits
    }

    /// Returns whether destructive calls are replaced by log output.
    #[must_use]
    pub fn simulate_only(&self) -> bool {
        self.simulate_only
    }

    /// Returns whether a creation instant lies strictly before the cutoff.
    #[must_use]
    pub fn is_stale(&self, created_at: DateTime<Utc>) -> bool {
        created_at < self.cutoff
    }

    /// Returns whether a run is protected by the tag exclusion snapshot.
    #[must_use]
    pub fn protects_run(&self, run: &WorkflowRun, exclusions: &TagExclusionSet) -> bool {
        self.skip_tagged_commits && exclusions.contains(run.head_sha())
    }

    /// Decides whether one artifact of `run` is removed.
    #[must_use]
    pub fn decide(
        &self,
        run: &WorkflowRun,
        artifact: &Artifact,
        exclusions: &TagExclusionSet,
    ) -> RetentionDecision {
        if self.is_stale(artifact.created_at()) && !self.protects_run(run, exclusions) {
            RetentionDecision::Delete
        } else {
            RetentionDecision::Keep
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    use super::*;
    use crate::ci::{CommitSha, Tag};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 31, 12, 0, 0)
            .single()
            .unwrap_or_else(|| unreachable!())
    }

    fn policy(age: &str, skip_tags: &str) -> RetentionPolicy {
        RetentionPolicy::from_inputs(age, skip_tags, false, now())
            .unwrap_or_else(|error| panic!("policy should build: {error}"))
    }

    fn artifact_aged(days: i64) -> Artifact {
        Artifact::new(7, "dist", now() - Duration::days(days))
    }

    #[test]
    fn age_units_accept_long_and_short_forms() {
        assert_eq!(AgeUnit::parse("days").ok(), Some(AgeUnit::Days));
        assert_eq!(AgeUnit::parse("Day").ok(), Some(AgeUnit::Days));
        assert_eq!(AgeUnit::parse("HOURS").ok(), Some(AgeUnit::Hours));
        assert_eq!(AgeUnit::parse("m").ok(), Some(AgeUnit::Minutes));
        assert_eq!(AgeUnit::parse("M").ok(), Some(AgeUnit::Months));
        assert_eq!(AgeUnit::parse("ms").ok(), Some(AgeUnit::Milliseconds));
        assert!(AgeUnit::parse("fortnights").is_err());
        assert!(AgeUnit::parse("D").is_err());
    }

    #[test]
    fn age_expression_rejects_malformed_input() {
        for expression in ["", "30", "days", "-1 days", "1.5 days", "30 days ago", "x days"] {
            assert!(
                matches!(RetentionAge::parse(expression), Err(AppError::Config(_))),
                "expected '{expression}' to be rejected"
            );
        }
    }

    #[test]
    fn age_expression_tolerates_extra_whitespace() {
        let age = RetentionAge::parse("  30   days ");
        assert_eq!(age.ok(), Some(RetentionAge::new(30, AgeUnit::Days)));
    }

    #[test]
    fn month_subtraction_clamps_to_month_end() {
        let age = RetentionAge::new(1, AgeUnit::Months);
        let cutoff = age.subtract_from(now()).unwrap_or_else(|_| unreachable!());
        let expected = Utc
            .with_ymd_and_hms(2026, 2, 28, 12, 0, 0)
            .single()
            .unwrap_or_else(|| unreachable!());
        assert_eq!(cutoff, expected);
    }

    #[test]
    fn quarters_and_years_are_calendar_months() {
        let quarter = RetentionAge::new(1, AgeUnit::Quarters)
            .subtract_from(now())
            .unwrap_or_else(|_| unreachable!());
        let year = RetentionAge::new(2, AgeUnit::Years)
            .subtract_from(now())
            .unwrap_or_else(|_| unreachable!());

        assert_eq!(quarter.format("%Y-%m-%d").to_string(), "2025-12-31");
        assert_eq!(year.format("%Y-%m-%d").to_string(), "2024-03-31");
    }

    #[test]
    fn huge_ages_are_configuration_errors() {
        let age = RetentionAge::new(u32::MAX, AgeUnit::Years);
        assert!(matches!(age.subtract_from(now()), Err(AppError::Config(_))));
    }

    #[test]
    fn bool_flags_accept_common_forms() {
        for value in ["true", "TRUE", " yes ", "on", "1", "y"] {
            assert_eq!(parse_bool_flag("flag", value).ok(), Some(true));
        }
        for value in ["false", "No", "off", "0", "", "n"] {
            assert_eq!(parse_bool_flag("flag", value).ok(), Some(false));
        }
        assert!(parse_bool_flag("flag", "maybe").is_err());
    }

    #[test]
    fn artifact_older_than_age_is_deleted() {
        let policy = policy("30 days", "false");
        let run = WorkflowRun::new(1, CommitSha::new("abc"));

        let decision = policy.decide(&run, &artifact_aged(31), &TagExclusionSet::empty());

        assert_eq!(decision, RetentionDecision::Delete);
    }

    #[test]
    fn artifact_younger_than_age_is_kept() {
        let policy = policy("30 days", "false");
        let run = WorkflowRun::new(1, CommitSha::new("abc"));

        let decision = policy.decide(&run, &artifact_aged(29), &TagExclusionSet::empty());

        assert_eq!(decision, RetentionDecision::Keep);
    }

    #[test]
    fn artifact_created_exactly_at_cutoff_is_kept() {
        let policy = policy("30 days", "false");
        let run = WorkflowRun::new(1, CommitSha::new("abc"));
        let artifact = Artifact::new(1, "dist", policy.cutoff());

        assert_eq!(
            policy.decide(&run, &artifact, &TagExclusionSet::empty()),
            RetentionDecision::Keep
        );
    }

    #[test]
    fn tagged_run_is_protected_only_when_skipping_tags() {
        let run = WorkflowRun::new(1, CommitSha::new("release-sha"));
        let exclusions = TagExclusionSet::from_tags([Tag::new("v1.0.0", CommitSha::new("release-sha"))]);

        let protecting = policy("30 days", "true");
        let ignoring = policy("30 days", "false");

        assert_eq!(
            protecting.decide(&run, &artifact_aged(60), &exclusions),
            RetentionDecision::Keep
        );
        assert_eq!(
            ignoring.decide(&run, &artifact_aged(60), &exclusions),
            RetentionDecision::Delete
        );
    }

    proptest! {
        #[test]
        fn fresh_artifacts_are_never_deleted(
            age_days in 0u32..5_000,
            offset_seconds in 0i64..1_000_000,
            skip_tags in any::<bool>(),
            tagged in any::<bool>(),
        ) {
            let policy = RetentionPolicy::new(
                RetentionAge::new(age_days, AgeUnit::Days),
                now(),
                skip_tags,
                false,
            );
            prop_assert!(policy.is_ok());
            let policy = policy.unwrap_or_else(|_| unreachable!());
            let run = WorkflowRun::new(1, CommitSha::new("sha"));
            let exclusions = if tagged {
                TagExclusionSet::from_tags([Tag::new("v1", CommitSha::new("sha"))])
            } else {
                TagExclusionSet::empty()
            };
            let artifact = Artifact::new(2, "dist", policy.cutoff() + Duration::seconds(offset_seconds));

            prop_assert_eq!(policy.decide(&run, &artifact, &exclusions), RetentionDecision::Keep);
        }

        #[test]
        fn tagged_runs_are_never_deleted_when_protected(age_days in 0u32..5_000, artifact_days in 0i64..20_000) {
            let policy = RetentionPolicy::new(
                RetentionAge::new(age_days, AgeUnit::Days),
                now(),
                true,
                false,
            ).unwrap_or_else(|_| unreachable!());
            let run = WorkflowRun::new(1, CommitSha::new("sha"));
            let exclusions = TagExclusionSet::from_tags([Tag::new("v1", CommitSha::new("sha"))]);

            prop_assert_eq!(
                policy.decide(&run, &artifact_aged(artifact_days), &exclusions),
                RetentionDecision::Keep
            );
        }

        #[test]
        fn cutoff_never_lies_after_now(amount in 0u32..10_000, unit_index in 0usize..9) {
            let units = [
                AgeUnit::Milliseconds,
                AgeUnit::Seconds,
                AgeUnit::Minutes,
                AgeUnit::Hours,
                AgeUnit::Days,
                AgeUnit::Weeks,
                AgeUnit::Months,
                AgeUnit::Quarters,
                AgeUnit::Years,
            ];
            let cutoff = RetentionAge::new(amount, units[unit_index]).subtract_from(now());

            prop_assert!(cutoff.is_ok());
            prop_assert!(cutoff.unwrap_or_else(|_| unreachable!()) <= now());
        }
    }
}

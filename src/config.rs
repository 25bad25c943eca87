//! Configuration resolution for the extraction pipelines.
//!
//! Both pipelines are configured entirely through environment variables
//! (optionally seeded from a `.env` file). Resolution is pure over an
//! [`EnvSource`] and an explicit "today" so that runs can be pinned in tests.

use std::collections::HashMap;
use std::env::VarError;
use std::fmt::Display;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::error::{ExtractError, Result};
use crate::window::DateWindow;

/// Billing/identity project for the query engine (required).
pub const ENV_PROJECT_ID: &str = "GCP_PROJECT_ID";
/// Cohort lookback length in days.
pub const ENV_COHORT_DAYS: &str = "COHORT_DAYS";
/// Maximum cohort sample size.
pub const ENV_N_REPOS: &str = "N_REPOS";
/// Minimum event count for a repository to enter the cohort.
pub const ENV_MIN_EVENTS: &str = "MIN_EVENTS";
/// Repository to extract, in `owner/name` form.
pub const ENV_SEED_REPO: &str = "SEED_REPO";
/// Extract lookback length in days.
pub const ENV_LOOKBACK_DAYS: &str = "LOOKBACK_DAYS";
/// Inclusive window end, ISO date.
pub const ENV_END_DATE: &str = "END_DATE_UTC";

const DEFAULT_COHORT_DAYS: u32 = 30;
const DEFAULT_N_REPOS: u32 = 200;
const DEFAULT_MIN_EVENTS: u64 = 50;
const DEFAULT_SEED_REPO: &str = "pallets/flask";
const DEFAULT_LOOKBACK_DAYS: u32 = 7;

/// A source of named configuration values.
pub trait EnvSource {
    /// Returns the value of `key`, or `None` when unset.
    ///
    /// A value that is set but cannot be read is an error, never `None`.
    fn get(&self, key: &str) -> Result<Option<String>>;
}

/// The process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match std::env::var(key) {
            Ok(value) => Ok(Some(value)),
            Err(VarError::NotPresent) => Ok(None),
            Err(VarError::NotUnicode(raw)) => Err(ExtractError::config(format!(
                "{key} is not valid UTF-8: {raw:?}"
            ))),
        }
    }
}

impl EnvSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(HashMap::get(self, key).cloned())
    }
}

impl EnvSource for HashMap<&str, &str> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(HashMap::get(self, key).map(|v| v.to_string()))
    }
}

/// Configuration for sampling a cohort of active repositories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoListConfig {
    /// Project the query is billed to.
    pub gcp_project_id: String,
    /// Lookback window length in days.
    pub days: u32,
    /// Maximum number of repositories to sample.
    pub n_repos: u32,
    /// Inclusive activity threshold; 0 disables the filter.
    pub min_events: u64,
    /// Inclusive window end.
    pub end_date: NaiveDate,
}

impl RepoListConfig {
    /// Resolves the cohort config from `env`, defaulting the end date to `today`.
    pub fn resolve(env: &impl EnvSource, today: NaiveDate) -> Result<Self> {
        let config = Self {
            gcp_project_id: required(env, ENV_PROJECT_ID)?,
            days: parse_or(env, ENV_COHORT_DAYS, DEFAULT_COHORT_DAYS)?,
            n_repos: parse_or(env, ENV_N_REPOS, DEFAULT_N_REPOS)?,
            min_events: parse_or(env, ENV_MIN_EVENTS, DEFAULT_MIN_EVENTS)?,
            end_date: date_or(env, ENV_END_DATE, today)?,
        };

        if config.n_repos == 0 {
            return Err(ExtractError::config(format!(
                "{ENV_N_REPOS} must be at least 1"
            )));
        }
        config.window()?;

        Ok(config)
    }

    /// The inclusive date window this config scans.
    pub fn window(&self) -> Result<DateWindow> {
        DateWindow::ending_at(self.end_date, self.days)
            .map_err(|e| with_variable(e, ENV_COHORT_DAYS, ENV_END_DATE))
    }
}

/// Configuration for extracting one repository's daily event counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractConfig {
    /// Project the query is billed to.
    pub gcp_project_id: String,
    /// Repository in `owner/name` form.
    pub repo_full_name: String,
    /// Lookback window length in days.
    pub days: u32,
    /// Inclusive window end.
    pub end_date: NaiveDate,
}

impl ExtractConfig {
    /// Resolves the extract config from `env`, defaulting the end date to `today`.
    pub fn resolve(env: &impl EnvSource, today: NaiveDate) -> Result<Self> {
        let config = Self {
            gcp_project_id: required(env, ENV_PROJECT_ID)?,
            repo_full_name: env
                .get(ENV_SEED_REPO)?
                .unwrap_or_else(|| DEFAULT_SEED_REPO.to_string()),
            days: parse_or(env, ENV_LOOKBACK_DAYS, DEFAULT_LOOKBACK_DAYS)?,
            end_date: date_or(env, ENV_END_DATE, today)?,
        };

        config.window()?;

        Ok(config)
    }

    /// The inclusive date window this config scans.
    pub fn window(&self) -> Result<DateWindow> {
        DateWindow::ending_at(self.end_date, self.days)
            .map_err(|e| with_variable(e, ENV_LOOKBACK_DAYS, ENV_END_DATE))
    }
}

fn required(env: &impl EnvSource, key: &str) -> Result<String> {
    env.get(key)?
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ExtractError::config(format!("{key} is not set")))
}

fn parse_or<T>(env: &impl EnvSource, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match env.get(key)? {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e| {
            ExtractError::config(format!(
                "{key} must be a non-negative integer, got '{raw}': {e}"
            ))
        }),
    }
}

fn date_or(env: &impl EnvSource, key: &str, today: NaiveDate) -> Result<NaiveDate> {
    match env.get(key)? {
        None => Ok(today),
        Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|e| {
            ExtractError::config(format!(
                "{key} must be an ISO date (YYYY-MM-DD), got '{raw}': {e}"
            ))
        }),
    }
}

fn with_variable(err: ExtractError, days_key: &str, end_key: &str) -> ExtractError {
    match err {
        ExtractError::Config(msg) => {
            ExtractError::config(format!("invalid {days_key}/{end_key}: {msg}"))
        }
        other => other,
    }
}

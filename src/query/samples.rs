//! Daily event-type counts for a single repository.

use std::fmt::Write;

use super::{shard_scan, BuiltQuery, QueryParameter};
use crate::config::ExtractConfig;
use crate::error::Result;
use crate::window::{DateWindow, SHARD_CENTURY_PREFIX};

/// Name of the bound repository parameter.
pub const REPO_NAME_PARAM: &str = "repo_name";

/// Day column of the extract.
pub const EVENT_DATE_COLUMN: &str = "event_date";

/// Unconditional per-day event count.
pub const EVENTS_TOTAL_COLUMN: &str = "events_total";

/// GH Archive event types counted individually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventCategory {
    Push,
    PullRequest,
    Issues,
    IssueComment,
    PullRequestReviewComment,
    Watch,
    Fork,
}

impl EventCategory {
    /// Every category, in output column order.
    pub const ALL: [EventCategory; 7] = [
        Self::Push,
        Self::PullRequest,
        Self::Issues,
        Self::IssueComment,
        Self::PullRequestReviewComment,
        Self::Watch,
        Self::Fork,
    ];

    /// The archive's `type` value for this category.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Push => "PushEvent",
            Self::PullRequest => "PullRequestEvent",
            Self::Issues => "IssuesEvent",
            Self::IssueComment => "IssueCommentEvent",
            Self::PullRequestReviewComment => "PullRequestReviewCommentEvent",
            Self::Watch => "WatchEvent",
            Self::Fork => "ForkEvent",
        }
    }

    /// Output column holding this category's daily count.
    pub fn column_name(&self) -> &'static str {
        match self {
            Self::Push => "push_events",
            Self::PullRequest => "pr_events",
            Self::Issues => "issues_events",
            Self::IssueComment => "issue_comment_events",
            Self::PullRequestReviewComment => "pr_review_comment_events",
            Self::Watch => "watch_events",
            Self::Fork => "fork_events",
        }
    }
}

/// Output columns of the extract query, in order.
pub fn sample_columns() -> Vec<&'static str> {
    let mut columns = vec![EVENT_DATE_COLUMN, EVENTS_TOTAL_COLUMN];
    columns.extend(EventCategory::ALL.iter().map(EventCategory::column_name));
    columns
}

/// Builds the extract query for a resolved config.
pub fn build_samples_query(config: &ExtractConfig) -> Result<BuiltQuery> {
    let window = config.window()?;
    Ok(samples_query(&window, &config.repo_full_name))
}

/// One row per day in `window` on which `repo_full_name` saw any event.
///
/// Days without events produce no row.
pub fn samples_query(window: &DateWindow, repo_full_name: &str) -> BuiltQuery {
    let mut counts = format!("  COUNT(1) AS {EVENTS_TOTAL_COLUMN}");
    for category in EventCategory::ALL {
        let _ = write!(
            counts,
            ",\n  COUNTIF(type = '{}') AS {}",
            category.event_type(),
            category.column_name()
        );
    }

    let sql = format!(
        "--standardSQL
WITH base AS (
  SELECT
    PARSE_DATE('%Y%m%d', CONCAT('{SHARD_CENTURY_PREFIX}', _TABLE_SUFFIX)) AS {EVENT_DATE_COLUMN},
    type
{scan}
    AND repo.name = @{REPO_NAME_PARAM}
)
SELECT
  {EVENT_DATE_COLUMN},
{counts}
FROM base
GROUP BY {EVENT_DATE_COLUMN}
ORDER BY {EVENT_DATE_COLUMN}
",
        scan = shard_scan(window, "  "),
    );

    BuiltQuery::new(sql).with_parameter(QueryParameter::string(REPO_NAME_PARAM, repo_full_name))
}

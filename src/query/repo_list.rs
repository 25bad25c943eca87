//! Cohort sampling query.

use super::{shard_scan, BuiltQuery};
use crate::config::RepoListConfig;
use crate::error::Result;
use crate::window::DateWindow;

/// Output columns of the cohort query, in order.
pub const REPO_LIST_COLUMNS: [&str; 2] = ["repo_name", "events_30d"];

/// Builds the cohort query for a resolved config.
pub fn build_repo_list_query(config: &RepoListConfig) -> Result<BuiltQuery> {
    let window = config.window()?;
    Ok(repo_list_query(&window, config.min_events, config.n_repos))
}

/// Uniform random sample of at most `n_repos` repositories with at least
/// `min_events` events inside `window`.
pub fn repo_list_query(window: &DateWindow, min_events: u64, n_repos: u32) -> BuiltQuery {
    let [repo_name, events] = REPO_LIST_COLUMNS;
    let sql = format!(
        "--standardSQL
WITH recent AS (
  SELECT
    repo.name AS {repo_name}
{scan}
    AND repo.name IS NOT NULL
),
eligible AS (
  SELECT
    {repo_name},
    COUNT(1) AS {events}
  FROM recent
  GROUP BY {repo_name}
  HAVING {events} >= {min_events}
)
SELECT {repo_name}, {events}
FROM eligible
ORDER BY RAND()
LIMIT {n_repos}
",
        scan = shard_scan(window, "  "),
    );

    BuiltQuery::new(sql)
}

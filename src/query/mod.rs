//! Query construction for the GH Archive pipelines.
//!
//! Builders are pure: the same config always yields byte-identical SQL and
//! the same bound parameters. External strings never enter the SQL text; they
//! travel as named parameters instead.

mod repo_list;
mod samples;

pub use repo_list::{build_repo_list_query, repo_list_query, REPO_LIST_COLUMNS};
pub use samples::{
    build_samples_query, sample_columns, samples_query, EventCategory, EVENT_DATE_COLUMN,
    EVENTS_TOTAL_COLUMN, REPO_NAME_PARAM,
};

use std::fmt;

use crate::window::{DateWindow, SHARD_CENTURY_PREFIX, SHARD_SUFFIX_PATTERN};

/// Dataset holding one GH Archive table per day.
pub const ARCHIVE_DATASET: &str = "githubarchive.day";

/// A named query parameter bound at execution time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParameter {
    /// Name referenced as `@name` in the SQL.
    pub name: String,
    /// Warehouse type name, e.g. `STRING`.
    pub type_name: &'static str,
    /// Value rendered as text.
    pub value: String,
}

impl QueryParameter {
    /// Creates a STRING parameter.
    pub fn string(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: "STRING",
            value: value.into(),
        }
    }
}

/// A fully constructed query: SQL text plus its bound parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltQuery {
    sql: String,
    parameters: Vec<QueryParameter>,
}

impl BuiltQuery {
    /// Creates a query with no parameters.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            parameters: Vec::new(),
        }
    }

    /// Adds a bound parameter.
    pub fn with_parameter(mut self, parameter: QueryParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// The SQL text.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// All bound parameters, in insertion order.
    pub fn parameters(&self) -> &[QueryParameter] {
        &self.parameters
    }

    /// Looks up a bound parameter by name.
    pub fn parameter(&self, name: &str) -> Option<&QueryParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

impl fmt::Display for BuiltQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// The wildcard table covering every daily shard in the century.
pub fn wildcard_table() -> String {
    format!("`{ARCHIVE_DATASET}.{SHARD_CENTURY_PREFIX}*`")
}

/// `FROM` clause plus the shard predicates shared by every query.
///
/// The regex guard keeps the wildcard off non-daily tables; the `BETWEEN`
/// is lexicographic, which matches date order for fixed-width suffixes.
fn shard_scan(window: &DateWindow, indent: &str) -> String {
    format!(
        "{indent}FROM {table}\n\
         {indent}WHERE REGEXP_CONTAINS(_TABLE_SUFFIX, r'{pattern}')\n\
         {indent}  AND _TABLE_SUFFIX BETWEEN '{start}' AND '{end}'",
        table = wildcard_table(),
        pattern = SHARD_SUFFIX_PATTERN,
        start = window.start_suffix(),
        end = window.end_suffix(),
    )
}

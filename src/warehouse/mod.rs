//! Warehouse abstraction layer.
//!
//! Provides a trait-based interface over the remote query engine so the
//! pipelines can run against BigQuery or an in-memory stand-in.

mod bigquery;
mod mock;
mod types;

pub use bigquery::{BigQueryClient, BigQueryConfig};
pub use mock::{FailingWarehouse, MockWarehouse, SubmissionMode};
pub use types::{ColumnInfo, ColumnType, QueryResult, Row, Value};

use crate::error::Result;
use crate::query::BuiltQuery;
use async_trait::async_trait;

/// Trait defining the interface for the remote query engine.
///
/// Every call is a single round of work: no retries, no partial results.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Validates the query without scanning data and returns the projected
    /// number of bytes it would process.
    async fn dry_run(&self, query: &BuiltQuery) -> Result<u64>;

    /// Executes the query and blocks until the complete result table is available.
    async fn execute(&self, query: &BuiltQuery) -> Result<QueryResult>;
}

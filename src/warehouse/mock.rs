//! In-memory warehouses for testing.
//!
//! `MockWarehouse` returns a canned estimate and table and records every
//! query it receives. `FailingWarehouse` fails at a chosen phase.

use std::sync::Mutex;

use super::{QueryResult, Warehouse};
use crate::error::{ExtractError, Result};
use crate::query::BuiltQuery;
use async_trait::async_trait;

/// Which call a query was submitted through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionMode {
    DryRun,
    Execute,
}

/// A mock warehouse that returns predefined results.
#[derive(Debug, Default)]
pub struct MockWarehouse {
    estimate: u64,
    result: QueryResult,
    submissions: Mutex<Vec<(SubmissionMode, BuiltQuery)>>,
}

impl MockWarehouse {
    /// Creates a mock that estimates `estimate` bytes and returns `result`.
    pub fn new(estimate: u64, result: QueryResult) -> Self {
        Self {
            estimate,
            result,
            submissions: Mutex::new(Vec::new()),
        }
    }

    /// Every query received so far, oldest first.
    pub fn submissions(&self) -> Vec<(SubmissionMode, BuiltQuery)> {
        self.submissions
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    fn record(&self, mode: SubmissionMode, query: &BuiltQuery) -> Result<()> {
        self.submissions
            .lock()
            .map_err(|_| ExtractError::internal("mock submission log poisoned"))?
            .push((mode, query.clone()));
        Ok(())
    }
}

#[async_trait]
impl Warehouse for MockWarehouse {
    async fn dry_run(&self, query: &BuiltQuery) -> Result<u64> {
        self.record(SubmissionMode::DryRun, query)?;
        Ok(self.estimate)
    }

    async fn execute(&self, query: &BuiltQuery) -> Result<QueryResult> {
        self.record(SubmissionMode::Execute, query)?;
        Ok(self.result.clone())
    }
}

/// A warehouse that fails at the configured phase.
#[derive(Debug, Clone)]
pub struct FailingWarehouse {
    fail_on: SubmissionMode,
    message: String,
}

impl FailingWarehouse {
    /// Creates a warehouse whose `fail_on` call returns `message` as an error.
    ///
    /// A warehouse failing on execute still answers dry runs with zero bytes.
    pub fn new(fail_on: SubmissionMode, message: impl Into<String>) -> Self {
        Self {
            fail_on,
            message: message.into(),
        }
    }
}

#[async_trait]
impl Warehouse for FailingWarehouse {
    async fn dry_run(&self, _query: &BuiltQuery) -> Result<u64> {
        match self.fail_on {
            SubmissionMode::DryRun => Err(ExtractError::warehouse(self.message.clone())),
            SubmissionMode::Execute => Ok(0),
        }
    }

    async fn execute(&self, _query: &BuiltQuery) -> Result<QueryResult> {
        Err(ExtractError::warehouse(self.message.clone()))
    }
}

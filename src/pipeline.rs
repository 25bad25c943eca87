//! The two extraction pipelines.
//!
//! Each run is strictly sequential: build the query, ask the warehouse for a
//! cost estimate, execute, materialize the table, write it, and print a short
//! summary. Any failure aborts the run; nothing is written unless the full
//! table was retrieved.

use std::io::Write;
use std::path::PathBuf;

use tracing::info;

use crate::config::{ExtractConfig, RepoListConfig};
use crate::error::{ExtractError, Result};
use crate::output::{preview, to_record_batch, TableFormat, PREVIEW_ROWS};
use crate::query::{build_repo_list_query, build_samples_query, BuiltQuery};
use crate::warehouse::Warehouse;

/// Default output directory, relative to the working directory.
pub const DEFAULT_OUT_DIR: &str = "data/processed";

/// File name of the cohort list.
pub const REPO_LIST_FILE: &str = "repo_list.csv";

/// File name of the daily feature extract.
pub const SAMPLES_FILE: &str = "sample_features.parquet";

/// Options shared by both pipelines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Directory the output file is written into.
    pub out_dir: PathBuf,
    /// Stop after the dry-run estimate.
    pub estimate_only: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
            estimate_only: false,
        }
    }
}

/// What a run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Bytes the warehouse projected the query would scan.
    pub estimated_bytes: u64,
    /// Rows retrieved, if the query was executed.
    pub row_count: Option<usize>,
    /// File written, if any.
    pub output_path: Option<PathBuf>,
}

/// Samples a cohort of active repositories and writes it as CSV.
pub async fn run_repo_list<W: Write + Send>(
    warehouse: &dyn Warehouse,
    config: &RepoListConfig,
    options: &RunOptions,
    out: &mut W,
) -> Result<RunSummary> {
    info!(
        "Sampling up to {} repos with >= {} events over {} days ending {}",
        config.n_repos, config.min_events, config.days, config.end_date
    );
    let query = build_repo_list_query(config)?;
    let target = Target {
        label: "repos",
        format: TableFormat::Csv,
        path: options.out_dir.join(REPO_LIST_FILE),
    };
    run(warehouse, &query, target, options, out).await
}

/// Extracts daily event counts for one repository and writes them as Parquet.
pub async fn run_samples<W: Write + Send>(
    warehouse: &dyn Warehouse,
    config: &ExtractConfig,
    options: &RunOptions,
    out: &mut W,
) -> Result<RunSummary> {
    info!(
        "Extracting {} over {} days ending {}",
        config.repo_full_name, config.days, config.end_date
    );
    let query = build_samples_query(config)?;
    let target = Target {
        label: "rows",
        format: TableFormat::Parquet,
        path: options.out_dir.join(SAMPLES_FILE),
    };
    run(warehouse, &query, target, options, out).await
}

struct Target {
    label: &'static str,
    format: TableFormat,
    path: PathBuf,
}

async fn run<W: Write + Send>(
    warehouse: &dyn Warehouse,
    query: &BuiltQuery,
    target: Target,
    options: &RunOptions,
    out: &mut W,
) -> Result<RunSummary> {
    let estimated_bytes = warehouse.dry_run(query).await?;
    emit(
        out,
        format!(
            "[dry-run] bytes to be processed: {}",
            group_thousands(estimated_bytes)
        ),
    )?;

    if options.estimate_only {
        info!("Estimate only, skipping execution");
        return Ok(RunSummary {
            estimated_bytes,
            row_count: None,
            output_path: None,
        });
    }

    let result = warehouse.execute(query).await?;
    info!(
        "Query returned {} rows in {:?}",
        result.row_count(),
        result.execution_time
    );

    let batch = to_record_batch(&result)?;
    target.format.write(&batch, &target.path)?;

    emit(out, format!("[ok] {}: {}", target.label, batch.num_rows()))?;
    emit(out, format!("[ok] wrote: {}", target.path.display()))?;
    emit(out, preview(&batch, PREVIEW_ROWS)?)?;

    Ok(RunSummary {
        estimated_bytes,
        row_count: Some(batch.num_rows()),
        output_path: Some(target.path),
    })
}

fn emit<W: Write>(out: &mut W, line: String) -> Result<()> {
    writeln!(out, "{line}")
        .map_err(|e| ExtractError::output(format!("Failed to write summary: {e}")))
}

/// Formats `n` with comma thousands separators.
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

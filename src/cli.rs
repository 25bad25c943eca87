//! Command-line argument parsing for gharchive-extract.
//!
//! Pipeline parameters come from the environment; the command line only picks
//! the pipeline and controls where and whether results are written.

use clap::{Parser, Subcommand};
use gharchive_extract::pipeline::{RunOptions, DEFAULT_OUT_DIR};
use std::path::PathBuf;

/// Pipelines available on the command line.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pipeline {
    /// Sample a random cohort of active repositories into repo_list.csv
    RepoList,
    /// Extract daily event counts for SEED_REPO into sample_features.parquet
    Samples,
}

/// Query GH Archive on BigQuery and write the results locally.
#[derive(Parser, Debug)]
#[command(name = "gharchive-extract")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub pipeline: Pipeline,

    /// Directory output files are written to
    #[arg(long, value_name = "PATH", default_value = DEFAULT_OUT_DIR, global = true)]
    pub out_dir: PathBuf,

    /// Print the dry-run byte estimate and stop before executing the query
    #[arg(long, global = true)]
    pub estimate_only: bool,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Options passed to the selected pipeline.
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            out_dir: self.out_dir.clone(),
            estimate_only: self.estimate_only,
        }
    }
}

//! gharchive-extract - GH Archive cohort sampling and daily activity extraction.

mod cli;

use chrono::Utc;
use cli::{Cli, Pipeline};
use gharchive_extract::config::{ExtractConfig, ProcessEnv, RepoListConfig};
use gharchive_extract::error::{ExtractError, Result};
use gharchive_extract::logging;
use gharchive_extract::pipeline::{run_repo_list, run_samples};
use gharchive_extract::warehouse::{BigQueryClient, BigQueryConfig};
use tracing::{debug, error, info};

#[tokio::main]
async fn main() {
    logging::init_stderr_logging();

    if let Err(e) = run().await {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse_args();
    load_dotenv()?;

    let today = Utc::now().date_naive();
    let options = cli.run_options();
    let mut stdout = std::io::stdout();

    let summary = match cli.pipeline {
        Pipeline::RepoList => {
            let config = RepoListConfig::resolve(&ProcessEnv, today)?;
            let warehouse = connect(&config.gcp_project_id)?;
            run_repo_list(&warehouse, &config, &options, &mut stdout).await?
        }
        Pipeline::Samples => {
            let config = ExtractConfig::resolve(&ProcessEnv, today)?;
            let warehouse = connect(&config.gcp_project_id)?;
            run_samples(&warehouse, &config, &options, &mut stdout).await?
        }
    };

    debug!("Run summary: {:?}", summary);
    Ok(())
}

/// Loads `.env` from the working directory, if present.
///
/// Variables already set in the process environment take precedence.
fn load_dotenv() -> Result<()> {
    match dotenvy::dotenv() {
        Ok(path) => {
            debug!("Loaded environment from {}", path.display());
            Ok(())
        }
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(ExtractError::config(format!("Failed to load .env: {e}"))),
    }
}

fn connect(project_id: &str) -> Result<BigQueryClient> {
    info!("Using BigQuery project {}", project_id);
    BigQueryClient::new(BigQueryConfig::from_env(project_id, &ProcessEnv)?)
}

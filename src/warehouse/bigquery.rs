//! BigQuery warehouse client.
//!
//! Talks to the BigQuery v2 REST API (`jobs.query` / `jobs.getQueryResults`)
//! with a bearer token obtained from the environment or the gcloud CLI.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::process::Command;
use std::str::FromStr;
use std::time::Instant;
use tracing::debug;

use crate::config::EnvSource;
use crate::error::{ExtractError, Result};
use crate::query::BuiltQuery;
use crate::warehouse::{ColumnInfo, ColumnType, QueryResult, Row, Value, Warehouse};

/// BigQuery REST API base URL.
pub const DEFAULT_API_URL: &str = "https://bigquery.googleapis.com/bigquery/v2";

/// Pre-minted OAuth access token.
pub const ENV_ACCESS_TOKEN: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

/// Override for the API base URL.
pub const ENV_API_URL: &str = "BIGQUERY_API_URL";

/// How long the server may hold each `jobs.query`/`getQueryResults` call
/// waiting for the job to finish.
const SERVER_WAIT_MS: u64 = 10_000;

/// BigQuery client configuration.
#[derive(Debug, Clone)]
pub struct BigQueryConfig {
    /// Project the jobs run (and are billed) in.
    pub project_id: String,
    /// OAuth bearer token.
    pub access_token: String,
    /// API base URL, without trailing slash.
    pub api_url: String,
}

impl BigQueryConfig {
    /// Creates a new config for the given project and token.
    pub fn new(project_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            access_token: access_token.into(),
            api_url: DEFAULT_API_URL.to_string(),
        }
    }

    /// Sets the API base URL.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Creates a config from environment variables.
    ///
    /// Reads `GOOGLE_OAUTH_ACCESS_TOKEN` for the token, falling back to
    /// `gcloud auth print-access-token`. Optionally reads `BIGQUERY_API_URL`.
    pub fn from_env(project_id: impl Into<String>, env: &impl EnvSource) -> Result<Self> {
        let token = match env.get(ENV_ACCESS_TOKEN)?.filter(|t| !t.trim().is_empty()) {
            Some(token) => token.trim().to_string(),
            None => gcloud_access_token()?,
        };

        let config = Self::new(project_id, token);
        Ok(match env.get(ENV_API_URL)? {
            Some(url) => config.with_api_url(url),
            None => config,
        })
    }
}

fn gcloud_access_token() -> Result<String> {
    debug!(
        "{} not set, asking gcloud for an access token",
        ENV_ACCESS_TOKEN
    );

    let output = Command::new("gcloud")
        .args(["auth", "print-access-token"])
        .output()
        .map_err(|e| {
            ExtractError::config(format!(
                "{ENV_ACCESS_TOKEN} is not set and gcloud could not be run: {e}"
            ))
        })?;

    if !output.status.success() {
        return Err(ExtractError::config(format!(
            "gcloud auth print-access-token failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if token.is_empty() {
        return Err(ExtractError::config("gcloud auth print-access-token returned an empty token"));
    }
    Ok(token)
}

/// BigQuery warehouse client.
#[derive(Debug, Clone)]
pub struct BigQueryClient {
    config: BigQueryConfig,
    client: Client,
}

impl BigQueryClient {
    /// Creates a new client with the given configuration.
    pub fn new(config: BigQueryConfig) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| ExtractError::warehouse(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    /// The project jobs run in.
    pub fn project_id(&self) -> &str {
        &self.config.project_id
    }

    fn queries_url(&self) -> String {
        format!(
            "{}/projects/{}/queries",
            self.config.api_url, self.config.project_id
        )
    }

    async fn post_query(&self, request: &QueryRequest<'_>) -> Result<QueryResponse> {
        let url = self.queries_url();
        debug!("POST {} (dry_run={})", url, request.dry_run);
        self.send(self.client.post(url).json(request)).await
    }

    async fn get_results(
        &self,
        job: &JobReference,
        page_token: Option<&str>,
    ) -> Result<QueryResponse> {
        let job_id = job
            .job_id
            .as_deref()
            .ok_or_else(|| ExtractError::warehouse("Query response has no job id to poll"))?;
        let url = format!("{}/{}", self.queries_url(), job_id);

        let mut params = vec![("timeoutMs", SERVER_WAIT_MS.to_string())];
        if let Some(location) = &job.location {
            params.push(("location", location.clone()));
        }
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }

        debug!("GET {} (page_token={:?})", url, page_token);
        self.send(self.client.get(url).query(&params)).await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request
            .bearer_auth(&self.config.access_token)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    ExtractError::warehouse(
                        "Failed to connect to BigQuery API. Check your network.",
                    )
                } else {
                    ExtractError::warehouse(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ExtractError::warehouse(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(Self::parse_error(status, &body));
        }

        serde_json::from_str(&body)
            .map_err(|e| ExtractError::warehouse(format!("Failed to parse response: {e}")))
    }

    /// Maps an API error response to an error.
    fn parse_error(status: reqwest::StatusCode, body: &str) -> ExtractError {
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return ExtractError::warehouse(format!(
                "Authentication failed. Check {ENV_ACCESS_TOKEN} or run `gcloud auth login`."
            ));
        }

        if let Ok(error_response) = serde_json::from_str::<ApiErrorResponse>(body) {
            return ExtractError::warehouse(format!(
                "BigQuery API error ({}): {}",
                status.as_u16(),
                error_response.error.message
            ));
        }

        ExtractError::warehouse(format!("BigQuery API error ({status}): {body}"))
    }
}

#[async_trait]
impl Warehouse for BigQueryClient {
    async fn dry_run(&self, query: &BuiltQuery) -> Result<u64> {
        let response = self.post_query(&QueryRequest::new(query, true)).await?;

        let bytes = response.total_bytes_processed.ok_or_else(|| {
            ExtractError::warehouse("Dry run response is missing totalBytesProcessed")
        })?;
        bytes.parse().map_err(|e| {
            ExtractError::warehouse(format!("Invalid totalBytesProcessed '{bytes}': {e}"))
        })
    }

    async fn execute(&self, query: &BuiltQuery) -> Result<QueryResult> {
        let start = Instant::now();
        let mut response = self.post_query(&QueryRequest::new(query, false)).await?;
        let job = response.job_reference.take().unwrap_or_default();

        while !response.job_complete {
            debug!("Job {:?} still running", job.job_id);
            response = self.get_results(&job, None).await?;
        }

        let columns: Vec<ColumnInfo> = response
            .schema
            .map(|schema| {
                schema
                    .fields
                    .into_iter()
                    .map(|f| ColumnInfo::new(f.name, ColumnType::from_bigquery(&f.field_type)))
                    .collect()
            })
            .unwrap_or_default();

        let mut rows = decode_rows(&columns, response.rows)?;
        let mut page_token = response.page_token;
        while let Some(token) = page_token {
            let page = self.get_results(&job, Some(&token)).await?;
            rows.extend(decode_rows(&columns, page.rows)?);
            page_token = page.page_token;
        }

        debug!("Fetched {} rows in {:?}", rows.len(), start.elapsed());
        Ok(QueryResult::with_data(columns, rows).with_execution_time(start.elapsed()))
    }
}

fn decode_rows(columns: &[ColumnInfo], rows: Vec<TableRow>) -> Result<Vec<Row>> {
    rows.into_iter()
        .map(|row| {
            if row.f.len() != columns.len() {
                return Err(ExtractError::warehouse(format!(
                    "Row has {} cells but schema has {} columns",
                    row.f.len(),
                    columns.len()
                )));
            }
            row.f
                .into_iter()
                .zip(columns)
                .map(|(cell, column)| decode_cell(cell.v, column))
                .collect()
        })
        .collect()
}

/// Decodes one cell. BigQuery sends scalars as JSON strings.
fn decode_cell(raw: serde_json::Value, column: &ColumnInfo) -> Result<Value> {
    let text = match raw {
        serde_json::Value::Null => return Ok(Value::Null),
        serde_json::Value::String(s) => s,
        other => return Ok(Value::String(other.to_string())),
    };

    let value = match column.data_type {
        ColumnType::String => Value::String(text),
        ColumnType::Int64 => Value::Int(parse_cell::<i64>(&text, column)?),
        ColumnType::Float64 => Value::Float(parse_cell::<f64>(&text, column)?),
        ColumnType::Bool => Value::Bool(parse_cell::<bool>(&text, column)?),
        ColumnType::Date => Value::Date(parse_cell::<NaiveDate>(&text, column)?),
    };
    Ok(value)
}

fn parse_cell<T>(text: &str, column: &ColumnInfo) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    text.parse::<T>().map_err(|e| {
        ExtractError::warehouse(format!(
            "Cannot decode '{text}' in column {} as {:?}: {e}",
            column.name, column.data_type
        ))
    })
}

// BigQuery API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    query: &'a str,
    use_legacy_sql: bool,
    dry_run: bool,
    use_query_cache: bool,
    timeout_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameter_mode: Option<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    query_parameters: Vec<ApiParameter<'a>>,
}

impl<'a> QueryRequest<'a> {
    fn new(query: &'a BuiltQuery, dry_run: bool) -> Self {
        let query_parameters: Vec<_> = query
            .parameters()
            .iter()
            .map(|p| ApiParameter {
                name: &p.name,
                parameter_type: ApiParameterType { kind: p.type_name },
                parameter_value: ApiParameterValue { value: &p.value },
            })
            .collect();

        Self {
            query: query.sql(),
            use_legacy_sql: false,
            dry_run,
            // Cached results would report zero bytes and hide the real cost.
            use_query_cache: !dry_run,
            timeout_ms: SERVER_WAIT_MS,
            parameter_mode: (!query_parameters.is_empty()).then_some("NAMED"),
            query_parameters,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiParameter<'a> {
    name: &'a str,
    parameter_type: ApiParameterType<'a>,
    parameter_value: ApiParameterValue<'a>,
}

#[derive(Debug, Serialize)]
struct ApiParameterType<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
}

#[derive(Debug, Serialize)]
struct ApiParameterValue<'a> {
    value: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    #[serde(default)]
    job_complete: bool,
    schema: Option<TableSchema>,
    job_reference: Option<JobReference>,
    page_token: Option<String>,
    #[serde(default)]
    rows: Vec<TableRow>,
    total_bytes_processed: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TableSchema {
    #[serde(default)]
    fields: Vec<TableField>,
}

#[derive(Debug, Deserialize)]
struct TableField {
    name: String,
    #[serde(rename = "type")]
    field_type: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    job_id: Option<String>,
    location: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TableRow {
    #[serde(default)]
    f: Vec<TableCell>,
}

#[derive(Debug, Deserialize)]
struct TableCell {
    #[serde(default)]
    v: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

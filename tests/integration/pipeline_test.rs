//! Pipeline integration tests.
//!
//! Runs both pipelines end to end against in-memory warehouses and checks
//! what lands on disk and on stdout.

use std::collections::HashMap;
use std::fs::{self, File};
use std::path::Path;

use chrono::{Datelike, NaiveDate};
use gharchive_extract::config::{ExtractConfig, RepoListConfig};
use gharchive_extract::pipeline::{
    run_repo_list, run_samples, RunOptions, REPO_LIST_FILE, SAMPLES_FILE,
};
use gharchive_extract::query::{sample_columns, EventCategory, REPO_NAME_PARAM};
use gharchive_extract::warehouse::{
    ColumnInfo, ColumnType, FailingWarehouse, MockWarehouse, QueryResult, SubmissionMode, Value,
};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use pretty_assertions::assert_eq;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
}

fn options(dir: &Path) -> RunOptions {
    RunOptions {
        out_dir: dir.join("data").join("processed"),
        estimate_only: false,
    }
}

fn repo_list_config() -> RepoListConfig {
    RepoListConfig {
        gcp_project_id: "test-project".to_string(),
        days: 30,
        n_repos: 200,
        min_events: 50,
        end_date: today(),
    }
}

fn extract_config(repo: &str) -> ExtractConfig {
    ExtractConfig {
        gcp_project_id: "test-project".to_string(),
        repo_full_name: repo.to_string(),
        days: 7,
        end_date: today(),
    }
}

fn cohort_table(repos: &[(&str, i64)]) -> QueryResult {
    QueryResult::with_data(
        vec![
            ColumnInfo::new("repo_name", ColumnType::String),
            ColumnInfo::new("events_30d", ColumnType::Int64),
        ],
        repos
            .iter()
            .map(|(name, events)| vec![Value::from(*name), Value::Int(*events)])
            .collect(),
    )
}

fn daily_table(days: &[u32]) -> QueryResult {
    let mut columns = vec![
        ColumnInfo::new("event_date", ColumnType::Date),
        ColumnInfo::new("events_total", ColumnType::Int64),
    ];
    columns.extend(
        EventCategory::ALL
            .iter()
            .map(|c| ColumnInfo::new(c.column_name(), ColumnType::Int64)),
    );

    let rows = days
        .iter()
        .map(|d| {
            let mut row = vec![
                Value::Date(NaiveDate::from_ymd_opt(2024, 3, *d).unwrap()),
                Value::Int(i64::from(*d) * 10),
            ];
            row.extend(EventCategory::ALL.iter().map(|_| Value::Int(1)));
            row
        })
        .collect();

    QueryResult::with_data(columns, rows)
}

#[tokio::test]
async fn test_repo_list_writes_csv() {
    let dir = tempfile::tempdir().unwrap();
    let warehouse = MockWarehouse::new(
        1_234_567_890,
        cohort_table(&[("pallets/flask", 812), ("rust-lang/rust", 50)]),
    );
    let mut stdout = Vec::new();

    let summary = run_repo_list(
        &warehouse,
        &repo_list_config(),
        &options(dir.path()),
        &mut stdout,
    )
    .await
    .unwrap();

    let path = dir.path().join("data/processed").join(REPO_LIST_FILE);
    assert_eq!(summary.estimated_bytes, 1_234_567_890);
    assert_eq!(summary.row_count, Some(2));
    assert_eq!(summary.output_path.as_deref(), Some(path.as_path()));

    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "repo_name,events_30d\npallets/flask,812\nrust-lang/rust,50\n"
    );

    let printed = String::from_utf8(stdout).unwrap();
    assert!(printed.starts_with("[dry-run] bytes to be processed: 1,234,567,890\n"));
    assert!(printed.contains("[ok] repos: 2\n"));
    assert!(printed.contains(&format!("[ok] wrote: {}\n", path.display())));
    assert!(printed.contains("pallets/flask"));
}

#[tokio::test]
async fn test_estimate_then_execute_same_query() {
    let dir = tempfile::tempdir().unwrap();
    let warehouse = MockWarehouse::new(10, cohort_table(&[]));

    run_repo_list(
        &warehouse,
        &repo_list_config(),
        &options(dir.path()),
        &mut std::io::sink(),
    )
    .await
    .unwrap();

    let submissions = warehouse.submissions();
    assert_eq!(submissions.len(), 2);
    assert_eq!(submissions[0].0, SubmissionMode::DryRun);
    assert_eq!(submissions[1].0, SubmissionMode::Execute);
    assert_eq!(submissions[0].1, submissions[1].1);
    assert!(submissions[0]
        .1
        .sql()
        .contains("_TABLE_SUFFIX BETWEEN '240210' AND '240310'"));
}

#[tokio::test]
async fn test_empty_cohort_still_writes_header() {
    let dir = tempfile::tempdir().unwrap();
    let warehouse = MockWarehouse::new(0, cohort_table(&[]));

    let summary = run_repo_list(
        &warehouse,
        &repo_list_config(),
        &options(dir.path()),
        &mut std::io::sink(),
    )
    .await
    .unwrap();

    assert_eq!(summary.row_count, Some(0));
    let path = summary.output_path.unwrap();
    assert_eq!(fs::read_to_string(path).unwrap(), "repo_name,events_30d\n");
}

#[tokio::test]
async fn test_rerun_overwrites_previous_output() {
    let dir = tempfile::tempdir().unwrap();
    let first = MockWarehouse::new(
        1,
        cohort_table(&[("a/one", 60), ("b/two", 70), ("c/three", 80)]),
    );
    let second = MockWarehouse::new(1, cohort_table(&[("d/four", 90)]));

    run_repo_list(
        &first,
        &repo_list_config(),
        &options(dir.path()),
        &mut std::io::sink(),
    )
    .await
    .unwrap();
    let summary = run_repo_list(
        &second,
        &repo_list_config(),
        &options(dir.path()),
        &mut std::io::sink(),
    )
    .await
    .unwrap();

    assert_eq!(
        fs::read_to_string(summary.output_path.unwrap()).unwrap(),
        "repo_name,events_30d\nd/four,90\n"
    );
}

#[tokio::test]
async fn test_samples_writes_parquet() {
    let dir = tempfile::tempdir().unwrap();
    let config = extract_config("pallets/flask");
    let window = config.window().unwrap();
    let days: Vec<u32> = window.dates().map(|d| d.day()).collect();
    assert_eq!(days, (4..=10).collect::<Vec<u32>>());
    let warehouse = MockWarehouse::new(2_048, daily_table(&days));
    let mut stdout = Vec::new();

    let summary = run_samples(&warehouse, &config, &options(dir.path()), &mut stdout)
        .await
        .unwrap();

    // One row per day of the window.
    assert_eq!(summary.row_count, Some(window.len_days() as usize));
    let path = dir.path().join("data/processed").join(SAMPLES_FILE);
    assert_eq!(summary.output_path.as_deref(), Some(path.as_path()));

    let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(&path).unwrap())
        .unwrap()
        .build()
        .unwrap();
    let batches: Vec<_> = reader.map(|b| b.unwrap()).collect();
    let schema = batches[0].schema();
    let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
    assert_eq!(names, sample_columns());
    assert_eq!(batches.iter().map(|b| b.num_rows()).sum::<usize>(), 7);

    let printed = String::from_utf8(stdout).unwrap();
    assert!(printed.contains("[dry-run] bytes to be processed: 2,048\n"));
    assert!(printed.contains("[ok] rows: 7\n"));
    assert!(printed.contains("2024-03-04"));
}

#[tokio::test]
async fn test_samples_binds_repo_name() {
    let dir = tempfile::tempdir().unwrap();
    let hostile = "o'reilly/x'); DROP TABLE t; --";
    let warehouse = MockWarehouse::new(0, daily_table(&[]));

    run_samples(
        &warehouse,
        &extract_config(hostile),
        &options(dir.path()),
        &mut std::io::sink(),
    )
    .await
    .unwrap();

    for (_, query) in warehouse.submissions() {
        assert!(!query.sql().contains(hostile));
        assert!(query.sql().contains("repo.name = @repo_name"));
        assert_eq!(query.parameter(REPO_NAME_PARAM).unwrap().value, hostile);
    }
}

#[tokio::test]
async fn test_estimate_only_skips_execute_and_write() {
    let dir = tempfile::tempdir().unwrap();
    let warehouse = MockWarehouse::new(4_096, daily_table(&[4]));
    let opts = RunOptions {
        estimate_only: true,
        ..options(dir.path())
    };
    let mut stdout = Vec::new();

    let summary = run_samples(&warehouse, &extract_config("a/b"), &opts, &mut stdout)
        .await
        .unwrap();

    assert_eq!(summary.estimated_bytes, 4_096);
    assert_eq!(summary.row_count, None);
    assert_eq!(summary.output_path, None);
    assert!(!opts.out_dir.exists());

    let submissions = warehouse.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].0, SubmissionMode::DryRun);
    assert_eq!(
        String::from_utf8(stdout).unwrap(),
        "[dry-run] bytes to be processed: 4,096\n"
    );
}

#[tokio::test]
async fn test_dry_run_failure_aborts_before_execute() {
    let dir = tempfile::tempdir().unwrap();
    let warehouse = FailingWarehouse::new(SubmissionMode::DryRun, "Syntax error at [3:5]");
    let mut stdout = Vec::new();

    let err = run_repo_list(
        &warehouse,
        &repo_list_config(),
        &options(dir.path()),
        &mut stdout,
    )
    .await
    .unwrap_err();

    assert_eq!(err.category(), "Warehouse Error");
    assert!(err.to_string().contains("Syntax error at [3:5]"));
    assert!(stdout.is_empty());
    assert!(!dir.path().join("data").exists());
}

#[tokio::test]
async fn test_execute_failure_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let warehouse = FailingWarehouse::new(SubmissionMode::Execute, "Quota exceeded");

    let err = run_samples(
        &warehouse,
        &extract_config("a/b"),
        &options(dir.path()),
        &mut std::io::sink(),
    )
    .await
    .unwrap_err();

    assert!(err.to_string().contains("Quota exceeded"));
    assert!(!dir
        .path()
        .join("data/processed")
        .join(SAMPLES_FILE)
        .exists());
}

#[tokio::test]
async fn test_missing_project_id_fails_before_any_query() {
    let env: HashMap<&str, &str> = [("SEED_REPO", "pallets/flask")].into_iter().collect();
    let warehouse = MockWarehouse::default();

    let err = ExtractConfig::resolve(&env, today()).unwrap_err();
    assert!(err.is_config());
    assert_eq!(err.category(), "Configuration Error");

    let err = RepoListConfig::resolve(&env, today()).unwrap_err();
    assert!(err.is_config());

    // Resolution failed, so nothing was ever handed to the warehouse.
    assert!(warehouse.submissions().is_empty());
}

#[tokio::test]
async fn test_invalid_config_never_reaches_warehouse() {
    let dir = tempfile::tempdir().unwrap();
    let warehouse = MockWarehouse::default();
    let config = RepoListConfig {
        days: 0,
        ..repo_list_config()
    };

    let err = run_repo_list(
        &warehouse,
        &config,
        &options(dir.path()),
        &mut std::io::sink(),
    )
    .await
    .unwrap_err();

    assert!(err.is_config());
    assert!(warehouse.submissions().is_empty());
}

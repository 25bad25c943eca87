//! CSV and Parquet writers.
//!
//! Both formats replace the target file and create its parent directory on
//! demand. Output is written to a sibling temporary file and renamed into
//! place, so the previous file survives a failed write.

use std::ffi::OsString;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use arrow::csv::WriterBuilder;
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use tracing::debug;

use crate::error::{ExtractError, Result};

/// On-disk table formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    /// Row-oriented text with a header line.
    Csv,
    /// Columnar, snappy-compressed.
    Parquet,
}

impl TableFormat {
    /// Writes `batch` to `path` in this format.
    pub fn write(self, batch: &RecordBatch, path: &Path) -> Result<()> {
        match self {
            Self::Csv => write_csv(batch, path),
            Self::Parquet => write_parquet(batch, path),
        }
    }
}

/// Writes `batch` as CSV with a header row.
pub fn write_csv(batch: &RecordBatch, path: &Path) -> Result<()> {
    write_atomically(path, |file| {
        let mut writer = WriterBuilder::new().with_header(true).build(file);
        writer
            .write(batch)
            .map_err(|e| ExtractError::output(format!("Failed to write {}: {e}", path.display())))
    })?;

    debug!(
        "Wrote {} rows as CSV to {}",
        batch.num_rows(),
        path.display()
    );
    Ok(())
}

/// Writes `batch` as a Parquet file.
pub fn write_parquet(batch: &RecordBatch, path: &Path) -> Result<()> {
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    write_atomically(path, |file| {
        let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
            .map_err(|e| ExtractError::output(format!("Failed to create Parquet writer: {e}")))?;
        writer
            .write(batch)
            .map_err(|e| ExtractError::output(format!("Failed to write {}: {e}", path.display())))?;
        writer
            .close()
            .map_err(|e| ExtractError::output(format!("Failed to close {}: {e}", path.display())))?;
        Ok(())
    })?;

    debug!(
        "Wrote {} rows as Parquet to {}",
        batch.num_rows(),
        path.display()
    );
    Ok(())
}

/// Runs `write` against a temporary file next to `path`, then renames it over
/// `path`. On failure the temporary file is removed and `path` is untouched.
fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(File) -> Result<()>,
{
    create_parent_dir(path)?;

    let tmp_path = temp_path(path);
    let file = File::create(&tmp_path).map_err(|e| {
        ExtractError::output(format!("Could not create {}: {e}", tmp_path.display()))
    })?;

    let written = write(file).and_then(|()| {
        fs::rename(&tmp_path, path).map_err(|e| {
            ExtractError::output(format!("Could not replace {}: {e}", path.display()))
        })
    });
    if written.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    written
}

fn create_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            ExtractError::output(format!(
                "Could not create directory {}: {e}",
                parent.display()
            ))
        })?;
    }
    Ok(())
}

/// `out.csv` becomes `out.csv.tmp` in the same directory.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

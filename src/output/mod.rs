//! Table materialization and persistence.
//!
//! Results are converted to an Arrow [`RecordBatch`] once, then written as CSV
//! or Parquet and previewed for the operator.

mod table;
mod writer;

pub use table::{arrow_type, date32, to_record_batch};
pub use writer::{write_csv, write_parquet, TableFormat};

use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;

use crate::error::{ExtractError, Result};

/// Number of rows shown in the post-run preview.
pub const PREVIEW_ROWS: usize = 10;

/// Renders the first `rows` rows of `batch` as a text table.
pub fn preview(batch: &RecordBatch, rows: usize) -> Result<String> {
    let head = batch.slice(0, rows.min(batch.num_rows()));
    pretty_format_batches(&[head])
        .map(|table| table.to_string())
        .map_err(|e| ExtractError::internal(format!("Failed to format preview: {e}")))
}

//! Conversion of warehouse results into Arrow record batches.

use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanArray, Date32Array, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use chrono::{Datelike, NaiveDate};

use crate::error::{ExtractError, Result};
use crate::warehouse::{ColumnInfo, ColumnType, QueryResult, Value};

/// `num_days_from_ce` of 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Arrow type used to store a column type.
pub fn arrow_type(column_type: ColumnType) -> DataType {
    match column_type {
        ColumnType::String => DataType::Utf8,
        ColumnType::Int64 => DataType::Int64,
        ColumnType::Float64 => DataType::Float64,
        ColumnType::Bool => DataType::Boolean,
        ColumnType::Date => DataType::Date32,
    }
}

/// Materializes a result as a single record batch. Every field is nullable.
pub fn to_record_batch(result: &QueryResult) -> Result<RecordBatch> {
    let fields: Vec<Field> = result
        .columns
        .iter()
        .map(|c| Field::new(c.name.as_str(), arrow_type(c.data_type), true))
        .collect();
    let schema = Arc::new(Schema::new(fields));

    let arrays = result
        .columns
        .iter()
        .enumerate()
        .map(|(index, column)| column_array(result, index, column))
        .collect::<Result<Vec<ArrayRef>>>()?;

    let options = RecordBatchOptions::new().with_row_count(Some(result.rows.len()));
    RecordBatch::try_new_with_options(schema, arrays, &options)
        .map_err(|e| ExtractError::internal(format!("Failed to build record batch: {e}")))
}

fn column_array(result: &QueryResult, index: usize, column: &ColumnInfo) -> Result<ArrayRef> {
    let mut cells: Vec<&Value> = Vec::with_capacity(result.rows.len());
    for (row, values) in result.rows.iter().enumerate() {
        let value = values.get(index).ok_or_else(|| {
            ExtractError::internal(format!(
                "Row {row} has no value for column {}",
                column.name
            ))
        })?;
        cells.push(value);
    }

    let mismatch = |value: &Value| {
        ExtractError::internal(format!(
            "Column {} is {:?} but holds {value:?}",
            column.name, column.data_type
        ))
    };

    let array: ArrayRef = match column.data_type {
        ColumnType::String => Arc::new(
            cells
                .iter()
                .copied()
                .map(|v| match v {
                    Value::Null => Ok(None),
                    Value::String(s) => Ok(Some(s.clone())),
                    other => Ok(Some(other.to_display_string())),
                })
                .collect::<Result<StringArray>>()?,
        ),
        ColumnType::Int64 => Arc::new(
            cells
                .iter()
                .copied()
                .map(|v| match v {
                    Value::Null => Ok(None),
                    Value::Int(i) => Ok(Some(*i)),
                    other => Err(mismatch(other)),
                })
                .collect::<Result<Int64Array>>()?,
        ),
        ColumnType::Float64 => Arc::new(
            cells
                .iter()
                .copied()
                .map(|v| match v {
                    Value::Null => Ok(None),
                    Value::Float(f) => Ok(Some(*f)),
                    Value::Int(i) => Ok(Some(*i as f64)),
                    other => Err(mismatch(other)),
                })
                .collect::<Result<Float64Array>>()?,
        ),
        ColumnType::Bool => Arc::new(
            cells
                .iter()
                .copied()
                .map(|v| match v {
                    Value::Null => Ok(None),
                    Value::Bool(b) => Ok(Some(*b)),
                    other => Err(mismatch(other)),
                })
                .collect::<Result<BooleanArray>>()?,
        ),
        ColumnType::Date => Arc::new(
            cells
                .iter()
                .copied()
                .map(|v| match v {
                    Value::Null => Ok(None),
                    Value::Date(d) => Ok(Some(date32(*d))),
                    other => Err(mismatch(other)),
                })
                .collect::<Result<Date32Array>>()?,
        ),
    };

    Ok(array)
}

/// Days since the Unix epoch, as stored in Arrow `Date32`.
pub fn date32(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

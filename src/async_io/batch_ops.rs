//! Streaming one Parquet file into record batches, and batches into rows

use std::path::Path;
use std::time::Instant;

use anyhow::Context;
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use parquet::arrow::async_reader::ParquetRecordBatchStreamBuilder;
use serde::de::DeserializeOwned;

use super::file_ops::open_parquet_file_async;
use crate::error::Result;
use crate::utils::{DEFAULT_BATCH_SIZE, get_batch_size};

/// Read a whole Parquet file as Arrow record batches
///
/// `batch_size` wins over `EPI_PARQUET_BATCH_SIZE`, which wins over
/// [`DEFAULT_BATCH_SIZE`].
///
/// # Errors
/// Returns an error if the file is missing or is not valid Parquet
pub async fn read_parquet_async(path: &Path, batch_size: Option<usize>) -> Result<Vec<RecordBatch>> {
    let started = Instant::now();
    let file = open_parquet_file_async(path).await?;

    let rows_per_batch = batch_size
        .or_else(get_batch_size)
        .unwrap_or(DEFAULT_BATCH_SIZE);
    let batches: Vec<RecordBatch> = ParquetRecordBatchStreamBuilder::new(file)
        .await
        .with_context(|| format!("reading Parquet footer of {}", path.display()))?
        .with_batch_size(rows_per_batch)
        .build()
        .with_context(|| format!("preparing batch stream for {}", path.display()))?
        .try_collect()
        .await
        .with_context(|| format!("decoding batches of {}", path.display()))?;

    log::debug!(
        "{}: {} rows in {} batches ({:?})",
        path.display(),
        batches.iter().map(RecordBatch::num_rows).sum::<usize>(),
        batches.len(),
        started.elapsed()
    );
    Ok(batches)
}

/// Deserialize every row of `batches` into `T` with `serde_arrow`
///
/// Columns that `T` does not name are ignored; `Option` fields whose column
/// is absent are `None`.
///
/// # Errors
/// Returns an error if a column cannot be converted to its field type
pub fn rows_from_batches<T: DeserializeOwned>(batches: &[RecordBatch]) -> Result<Vec<T>> {
    let mut rows = Vec::with_capacity(batches.iter().map(RecordBatch::num_rows).sum());
    for batch in batches {
        rows.extend(serde_arrow::from_record_batch::<Vec<T>>(batch)?);
    }
    Ok(rows)
}

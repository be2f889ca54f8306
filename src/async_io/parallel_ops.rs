//! Concurrent reading of several Parquet files

use std::path::PathBuf;

use arrow::record_batch::RecordBatch;
use futures::stream::{self, StreamExt};
use itertools::Itertools;

use super::batch_ops::read_parquet_async;
use crate::error::Result;
use crate::utils::logging::{create_main_progress_bar, finish_progress_bar};

/// Read `files` concurrently, at most one file per CPU at a time
///
/// Batches of all files are concatenated in completion order. A progress
/// bar labelled `label` tracks finished files.
///
/// # Errors
/// Returns the first error of any file
pub async fn load_parquet_files_parallel_async(
    files: &[PathBuf],
    label: &str,
) -> Result<Vec<RecordBatch>> {
    if files.is_empty() {
        return Ok(Vec::new());
    }

    let pb = create_main_progress_bar(files.len() as u64, Some(label));
    let parallelism = num_cpus::get().min(files.len());

    let results = stream::iter(files.iter().cloned())
        .map(|path| {
            let pb = pb.clone();
            async move {
                let result = read_parquet_async(&path, None).await;
                pb.inc(1);
                if let Err(e) = &result {
                    log::error!("Error loading parquet file {}: {e}", path.display());
                }
                result
            }
        })
        .buffer_unordered(parallelism)
        .collect::<Vec<_>>()
        .await;

    finish_progress_bar(&pb, Some(label));

    let combined = results
        .into_iter()
        .collect::<Result<Vec<Vec<RecordBatch>>>>()?
        .into_iter()
        .flatten()
        .collect_vec();

    log::info!(
        "Loaded {} batches from {} Parquet files ({label})",
        combined.len(),
        files.len()
    );

    Ok(combined)
}

//! Loading a snapshot of regions, case records and predictions
//!
//! A snapshot directory holds three inputs, each either a single
//! `<name>.parquet` file or a `<name>/` directory of Parquet files:
//!
//! - `regions`: `region_id`, `region_name`, `parent_id` rows
//! - `cases`: one row per case record (see [`super::rows`])
//! - `predictions`: one row per computed prediction, optional

use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{debug, info};
use rayon::prelude::*;

use super::batch_ops::rows_from_batches;
use super::file_ops::resolve_parquet_inputs;
use super::parallel_ops::load_parquet_files_parallel_async;
use super::rows::entries_from_batch;
use crate::error::{Error, Result};
use crate::hierarchy::{RegionHierarchy, RegionRow};
use crate::models::{CaseEntry, Prediction, PredictionSet, Upsert};
use crate::store::MemoryStore;
use crate::utils::{log_operation_complete, log_operation_start, log_warning, validate_directory};

pub const REGIONS_INPUT: &str = "regions";
pub const CASES_INPUT: &str = "cases";
pub const PREDICTIONS_INPUT: &str = "predictions";

/// Load case entries from a Parquet file or directory
///
/// # Errors
/// Returns an error if a file cannot be read or has the wrong layout
pub async fn load_case_entries(path: &Path) -> Result<Vec<CaseEntry>> {
    let start = Instant::now();
    let files = resolve_parquet_inputs(path).await?;
    let batches = load_parquet_files_parallel_async(&files, "case records").await?;

    let entries: Vec<CaseEntry> = batches
        .par_iter()
        .map(entries_from_batch)
        .collect::<Result<Vec<Vec<CaseEntry>>>>()?
        .into_iter()
        .flatten()
        .collect();

    log_operation_complete("loaded", path.display(), entries.len(), Some(start.elapsed()));
    Ok(entries)
}

/// Load the region hierarchy from a parent table
///
/// # Errors
/// Returns an error if a file cannot be read or the table is inconsistent
pub async fn load_regions(path: &Path) -> Result<RegionHierarchy> {
    let files = resolve_parquet_inputs(path).await?;
    let batches = load_parquet_files_parallel_async(&files, "regions").await?;
    let rows: Vec<RegionRow> = rows_from_batches(&batches)?;
    RegionHierarchy::from_parent_table(rows)
}

/// Load predictions, keeping the latest computation per region and week
///
/// Rows without a parent get the region's immediate parent from `hierarchy`.
///
/// # Errors
/// Returns an error if a file cannot be read or has the wrong layout
pub async fn load_predictions(path: &Path, hierarchy: &RegionHierarchy) -> Result<PredictionSet> {
    let files = resolve_parquet_inputs(path).await?;
    let batches = load_parquet_files_parallel_async(&files, "predictions").await?;
    let rows: Vec<Prediction> = rows_from_batches(&batches)?;
    let total = rows.len();

    let mut set = PredictionSet::new();
    let mut stale = 0usize;
    for mut prediction in rows {
        if prediction.parent_id.as_deref().is_none_or(|p| p.trim().is_empty()) {
            prediction.parent_id = hierarchy
                .get(&prediction.region_id)
                .and_then(|region| region.parent_id())
                .map(str::to_string);
        }
        if set.upsert(prediction) == Upsert::Stale {
            stale += 1;
        }
    }

    debug!("Kept {} of {total} predictions, {stale} superseded on arrival", set.len());
    Ok(set)
}

/// A loaded snapshot ready for querying
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub hierarchy: RegionHierarchy,
    pub store: MemoryStore,
}

impl Snapshot {
    /// Load every input of a snapshot directory
    ///
    /// Regions and cases are required. Case records and predictions are
    /// read concurrently once the hierarchy is built.
    ///
    /// # Errors
    /// Returns an error if a required input is missing or unreadable
    pub async fn load_dir(dir: &Path) -> Result<Self> {
        let start = Instant::now();
        log_operation_start("Loading snapshot from", dir.display());
        validate_directory(dir)?;

        let regions_path = snapshot_input(dir, REGIONS_INPUT)
            .ok_or_else(|| missing_input(dir, REGIONS_INPUT))?;
        let cases_path =
            snapshot_input(dir, CASES_INPUT).ok_or_else(|| missing_input(dir, CASES_INPUT))?;
        let predictions_path = snapshot_input(dir, PREDICTIONS_INPUT);

        let hierarchy = load_regions(&regions_path).await?;

        let predictions = async {
            match &predictions_path {
                Some(path) => load_predictions(path, &hierarchy).await,
                None => {
                    log_warning("No predictions in snapshot", Some(&dir.display()));
                    Ok(PredictionSet::new())
                }
            }
        };
        let (cases, predictions) = futures::try_join!(load_case_entries(&cases_path), predictions)?;

        info!(
            "Snapshot has {} regions, {} case records and {} predictions",
            hierarchy.len(),
            cases.len(),
            predictions.len()
        );
        log_operation_complete("loaded", dir.display(), cases.len(), Some(start.elapsed()));

        Ok(Self {
            store: MemoryStore::new(cases, predictions),
            hierarchy,
        })
    }
}

/// `<dir>/<name>.parquet` or `<dir>/<name>/`, whichever exists
fn snapshot_input(dir: &Path, name: &str) -> Option<PathBuf> {
    let file = dir.join(format!("{name}.parquet"));
    if file.is_file() {
        return Some(file);
    }
    let sub_dir = dir.join(name);
    sub_dir.is_dir().then_some(sub_dir)
}

fn missing_input(dir: &Path, name: &str) -> Error {
    Error::Configuration(format!(
        "snapshot {} has no '{name}.parquet' file or '{name}/' directory",
        dir.display()
    ))
}

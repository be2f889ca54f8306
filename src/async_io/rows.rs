//! Flat row layouts of the snapshot files and their conversion to models
//!
//! Case files carry one row per record with the administrative path spread
//! over `admin1`..`admin5`. Every integer column that is not one of the
//! fixed columns is read as a stage count, so the stage set is whatever the
//! file provides. Date columns may be Arrow dates or `YYYY-MM-DD` strings.

use arrow::array::{Array, ArrayRef, UInt64Array};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{CaseEntry, RegionPath, normalize_region_id};

/// Non-stage columns of a case file
pub const CASE_COLUMNS: [&str; 11] = [
    "record_id",
    "record_date",
    "source",
    "admin1",
    "admin2",
    "admin3",
    "admin4",
    "admin5",
    "age_range",
    "gender",
    "test_type",
];

/// One row of a case file, without its stage counts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseRow {
    pub record_id: String,
    pub record_date: NaiveDate,
    pub source: String,
    pub admin1: Option<String>,
    pub admin2: Option<String>,
    pub admin3: Option<String>,
    pub admin4: Option<String>,
    pub admin5: Option<String>,
    pub age_range: Option<String>,
    pub gender: Option<String>,
    pub test_type: Option<String>,
}

impl CaseRow {
    /// Convert to a case entry with no counts yet
    #[must_use]
    pub fn into_entry(self) -> CaseEntry {
        let regions: RegionPath = [self.admin1, self.admin2, self.admin3, self.admin4, self.admin5]
            .into_iter()
            .map(|level| level.as_deref().and_then(normalize_region_id))
            .collect();

        CaseEntry {
            record_id: self.record_id,
            record_date: self.record_date,
            source: self.source,
            regions,
            counts: FxHashMap::default(),
            age_range: non_blank(self.age_range),
            gender: non_blank(self.gender),
            test_type: non_blank(self.test_type),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Integer columns of `batch` that hold stage counts, cast to `u64`
///
/// Negative counts become nulls and are skipped.
///
/// # Errors
/// Returns an error if a column cannot be cast
pub fn stage_columns(batch: &RecordBatch) -> Result<Vec<(String, UInt64Array)>> {
    let schema = batch.schema();
    let mut columns = Vec::new();
    for (field, column) in schema.fields().iter().zip(batch.columns()) {
        if CASE_COLUMNS.contains(&field.name().as_str()) || !field.data_type().is_integer() {
            continue;
        }
        let cast_column: ArrayRef = cast(column, &DataType::UInt64)?;
        let counts = cast_column
            .as_any()
            .downcast_ref::<UInt64Array>()
            .cloned()
            .ok_or_else(|| {
                Error::Configuration(format!("column '{}' could not be read as counts", field.name()))
            })?;
        columns.push((field.name().clone(), counts));
    }
    Ok(columns)
}

/// Convert one case batch into entries
///
/// # Errors
/// Returns an error if a fixed column has the wrong type
pub fn entries_from_batch(batch: &RecordBatch) -> Result<Vec<CaseEntry>> {
    let rows: Vec<CaseRow> = serde_arrow::from_record_batch(batch)?;
    let stages = stage_columns(batch)?;

    Ok(rows
        .into_iter()
        .enumerate()
        .map(|(index, row)| {
            let mut entry = row.into_entry();
            for (stage, counts) in &stages {
                if counts.is_valid(index) {
                    entry.counts.insert(stage.clone(), counts.value(index));
                }
            }
            entry
        })
        .collect())
}

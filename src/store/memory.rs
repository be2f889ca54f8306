//! In-memory record store
//!
//! Holds a loaded snapshot of case entries and current predictions. Grouped
//! sums and latest-date scans run on the blocking pool and fan out across
//! cores with rayon.

use std::sync::Arc;

use chrono::NaiveDate;
use log::debug;
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::error::Error;
use crate::filter::RecordFilter;
use crate::models::{CaseEntry, Prediction, PredictionSet, StageTotals};
use crate::store::{
    GroupLabel, GroupRow, GroupedSumQuery, PredictionStore, RecordStore, StoreFuture,
};

/// Running totals of one bucket: per-field sums and record count
type Accumulator = FxHashMap<GroupLabel, (Vec<u64>, u64)>;

/// Snapshot-backed implementation of both store traits
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    cases: Arc<Vec<CaseEntry>>,
    predictions: Arc<PredictionSet>,
}

impl MemoryStore {
    #[must_use]
    pub fn new(cases: Vec<CaseEntry>, predictions: PredictionSet) -> Self {
        Self {
            cases: Arc::new(cases),
            predictions: Arc::new(predictions),
        }
    }

    #[must_use]
    pub fn case_count(&self) -> usize {
        self.cases.len()
    }

    #[must_use]
    pub fn prediction_count(&self) -> usize {
        self.predictions.len()
    }
}

/// Evaluate a grouped-sum query over a slice of entries
///
/// Rows are returned ordered by label so results are deterministic.
#[must_use]
pub fn grouped_sum(cases: &[CaseEntry], query: &GroupedSumQuery) -> Vec<GroupRow> {
    let width = query.sum_fields.len();

    let groups: Accumulator = cases
        .par_iter()
        .filter(|entry| query.filter.matches(entry))
        .fold(Accumulator::default, |mut acc, entry| {
            let slot = acc
                .entry(query.group_by.label_of(entry))
                .or_insert_with(|| (vec![0; width], 0));
            for (total, field) in slot.0.iter_mut().zip(&query.sum_fields) {
                *total += entry.count(field);
            }
            slot.1 += 1;
            acc
        })
        .reduce(Accumulator::default, |mut left, right| {
            for (label, (totals, records)) in right {
                let slot = left.entry(label).or_insert_with(|| (vec![0; width], 0));
                for (sum, value) in slot.0.iter_mut().zip(totals) {
                    *sum += value;
                }
                slot.1 += records;
            }
            left
        });

    let mut rows: Vec<GroupRow> = groups
        .into_iter()
        .map(|(label, (totals, records))| GroupRow {
            label,
            totals: StageTotals::from_parts(&query.sum_fields, &totals),
            records,
        })
        .collect();
    rows.sort_by(|a, b| a.label.cmp(&b.label));
    rows
}

impl RecordStore for MemoryStore {
    fn grouped_sum<'a>(&'a self, query: &'a GroupedSumQuery) -> StoreFuture<'a, Vec<GroupRow>> {
        let cases = Arc::clone(&self.cases);
        let query = query.clone();
        Box::pin(async move {
            let rows = tokio::task::spawn_blocking(move || grouped_sum(&cases, &query))
                .await
                .map_err(|e| Error::StoreUnavailable(format!("grouped sum task failed: {e}")))?;
            debug!("Grouped sum produced {} groups", rows.len());
            Ok(rows)
        })
    }

    fn latest_record_date<'a>(&'a self, region_id: &'a str) -> StoreFuture<'a, Option<NaiveDate>> {
        let cases = Arc::clone(&self.cases);
        let region_id = region_id.to_string();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || {
                cases
                    .par_iter()
                    .filter(|entry| entry.belongs_to(&region_id))
                    .map(|entry| entry.record_date)
                    .max()
            })
            .await
            .map_err(|e| Error::StoreUnavailable(format!("latest date task failed: {e}")))
        })
    }
}

impl PredictionStore for MemoryStore {
    fn current_prediction<'a>(
        &'a self,
        region_id: &'a str,
        date: NaiveDate,
    ) -> StoreFuture<'a, Option<Prediction>> {
        Box::pin(async move { Ok(self.predictions.get(region_id, date).cloned()) })
    }

    fn current_predictions_under<'a>(
        &'a self,
        parent_id: &'a str,
        date: NaiveDate,
    ) -> StoreFuture<'a, Vec<Prediction>> {
        Box::pin(async move { Ok(self.predictions.under(parent_id, date).cloned().collect()) })
    }
}

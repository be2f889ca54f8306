//! Record store interface
//!
//! The aggregation engine never scans records itself. It issues declarative
//! grouped-sum queries against a [`RecordStore`] and point lookups against a
//! [`PredictionStore`]. Groups without any matching row are absent from a
//! grouped-sum result; callers zero-fill.

use std::future::Future;
use std::pin::Pin;

use chrono::NaiveDate;

use crate::calendar::WeekStart;
use crate::error::Result;
use crate::filter::CaseFilter;
use crate::models::{CaseEntry, CaseField, Prediction, StageTotals};

pub mod memory;
pub mod retry;

pub use memory::MemoryStore;
pub use retry::{RetryPolicy, RetryingStore};

/// Boxed future returned by store operations
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// How matching rows are bucketed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKey {
    /// A single bucket for all rows
    Constant,
    /// The region at this index of the record's path
    RegionLevel(usize),
    /// The value of a categorical field
    Category(CaseField),
    /// The record date
    Day,
    /// The start date of the week containing the record date
    Week(WeekStart),
}

impl GroupKey {
    /// Bucket label of `entry` under this key
    #[must_use]
    pub fn label_of(self, entry: &CaseEntry) -> GroupLabel {
        match self {
            Self::Constant => GroupLabel::All,
            Self::RegionLevel(index) => GroupLabel::Region(entry.region_at(index).map(str::to_string)),
            Self::Category(field) => GroupLabel::Category(entry.category(field).map(str::to_string)),
            Self::Day => GroupLabel::Date(entry.record_date),
            Self::Week(convention) => {
                GroupLabel::Date(crate::calendar::week_start(entry.record_date, convention))
            }
        }
    }
}

/// Label of one bucket of a grouped-sum result
///
/// `None` region and category labels stand for "not recorded".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupLabel {
    All,
    Region(Option<String>),
    Category(Option<String>),
    Date(NaiveDate),
}

/// A grouped-sum request
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedSumQuery {
    pub filter: CaseFilter,
    pub group_by: GroupKey,
    /// Stage fields to sum per group
    pub sum_fields: Vec<String>,
}

impl GroupedSumQuery {
    #[must_use]
    pub fn new<S: AsRef<str>>(filter: CaseFilter, group_by: GroupKey, sum_fields: &[S]) -> Self {
        Self {
            filter,
            group_by,
            sum_fields: sum_fields.iter().map(|s| s.as_ref().to_string()).collect(),
        }
    }
}

/// One bucket of a grouped-sum result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRow {
    pub label: GroupLabel,
    /// Sum of every requested field, in request order
    pub totals: StageTotals,
    /// Number of records in the bucket
    pub records: u64,
}

/// Read access to dated case records
pub trait RecordStore: Send + Sync {
    /// Sum `query.sum_fields` over matching records, one row per non-empty group
    fn grouped_sum<'a>(&'a self, query: &'a GroupedSumQuery) -> StoreFuture<'a, Vec<GroupRow>>;

    /// Most recent record date of any record belonging to `region_id`
    fn latest_record_date<'a>(&'a self, region_id: &'a str) -> StoreFuture<'a, Option<NaiveDate>>;
}

/// Read access to current predictions
pub trait PredictionStore: Send + Sync {
    /// The current prediction for a region and week start
    fn current_prediction<'a>(
        &'a self,
        region_id: &'a str,
        date: NaiveDate,
    ) -> StoreFuture<'a, Option<Prediction>>;

    /// Current predictions of every region whose immediate parent is `parent_id`
    fn current_predictions_under<'a>(
        &'a self,
        parent_id: &'a str,
        date: NaiveDate,
    ) -> StoreFuture<'a, Vec<Prediction>>;
}

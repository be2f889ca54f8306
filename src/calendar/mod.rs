//! Week bucketing for trends and prediction slots
//!
//! Weeks are aligned by explicit week-start arithmetic on exact dates, never
//! by week-number functions, so buckets stay correct across year boundaries.
//! Monday-start weeks are canonical; Sunday-start weeks exist for tenants
//! still on the legacy layout. One convention is used for both trends and
//! predictions of a tenant.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::StageTotals;

/// Number of forthcoming weeks covered by the prediction overlay
pub const PREDICTION_SLOTS: usize = 4;

/// First day of a calendar week
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    /// ISO weeks (canonical)
    #[default]
    Monday,
    /// Legacy layout
    Sunday,
}

impl WeekStart {
    /// Days between the start of the week and `date` (0..=6)
    #[must_use]
    pub fn offset(self, date: NaiveDate) -> i64 {
        let days = match self {
            Self::Monday => date.weekday().num_days_from_monday(),
            Self::Sunday => date.weekday().num_days_from_sunday(),
        };
        i64::from(days)
    }
}

/// An inclusive span of whole weeks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekRange {
    /// First day of the first week
    pub start: NaiveDate,
    /// Last day of the last week
    pub end: NaiveDate,
}

impl WeekRange {
    /// Number of weeks in the range
    #[must_use]
    pub fn weeks(&self) -> usize {
        let days = (self.end - self.start).num_days() + 1;
        usize::try_from(days / 7).unwrap_or(0)
    }

    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// First day of the week containing `date`
#[must_use]
pub fn week_start(date: NaiveDate, convention: WeekStart) -> NaiveDate {
    date - Duration::days(convention.offset(date))
}

/// Last day of the week containing `date`
#[must_use]
pub fn week_end(date: NaiveDate, convention: WeekStart) -> NaiveDate {
    week_start(date, convention) + Duration::days(6)
}

/// Widen `[start, end]` outwards to whole weeks
#[must_use]
pub fn expand_to_weeks(start: NaiveDate, end: NaiveDate, convention: WeekStart) -> WeekRange {
    WeekRange {
        start: week_start(start, convention),
        end: week_end(end, convention),
    }
}

/// Start date of every week in `range`, ascending
#[must_use]
pub fn week_labels(range: WeekRange) -> Vec<NaiveDate> {
    let mut labels = Vec::with_capacity(range.weeks());
    let mut label = range.start;
    while label < range.end {
        labels.push(label);
        label += Duration::days(7);
    }
    labels
}

/// Last day of the final trend week that contains `end`
#[must_use]
pub fn last_complete_week_end(end: NaiveDate, convention: WeekStart) -> NaiveDate {
    week_end(end, convention)
}

/// Start dates of the forthcoming prediction weeks after `end`'s week
#[must_use]
pub fn prediction_slots(end: NaiveDate, convention: WeekStart) -> [NaiveDate; PREDICTION_SLOTS] {
    let last = last_complete_week_end(end, convention);
    [1, 8, 15, 22].map(|days| last + Duration::days(days))
}

/// Fold per-day totals into zero-seeded weekly buckets
///
/// Every week of `range` is present in the result, ascending, whether or
/// not any day of it had data. Days outside `range` are ignored.
pub fn fold_into_weeks<I, S>(
    range: WeekRange,
    convention: WeekStart,
    stages: &[S],
    daily: I,
) -> Vec<(NaiveDate, StageTotals)>
where
    I: IntoIterator<Item = (NaiveDate, StageTotals)>,
    S: AsRef<str>,
{
    let mut buckets: BTreeMap<NaiveDate, StageTotals> = week_labels(range)
        .into_iter()
        .map(|label| (label, StageTotals::zeroed(stages)))
        .collect();

    for (date, totals) in daily {
        if !range.contains(date) {
            continue;
        }
        if let Some(bucket) = buckets.get_mut(&week_start(date, convention)) {
            bucket.merge(&totals);
        }
    }

    buckets.into_iter().collect()
}

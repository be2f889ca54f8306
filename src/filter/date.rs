//! Date range filtering
//!
//! Ranges are inclusive on both ends and always ordered.

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{Error, Result};

/// An inclusive, ordered range of calendar days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Create a date range
    ///
    /// # Errors
    /// Returns [`Error::BadInput`] on `end_date` when `end` precedes `start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(Error::bad_input(
                "end_date",
                format!("{end} is before start date {start}"),
            ));
        }
        Ok(Self { start, end })
    }

    #[must_use]
    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> NaiveDate {
        self.end
    }

    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of days covered, both ends included
    #[must_use]
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

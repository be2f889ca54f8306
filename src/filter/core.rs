//! Core filtering functionality for case entries
//!
//! Every store query is scoped by a [`CaseFilter`]: membership of a region
//! anywhere in the record's path, an inclusive date range, and an optional
//! extra predicate expression.

use std::collections::HashSet;

use crate::filter::date::DateRange;
use crate::filter::expr::{Expr, RECORD_DATE_FIELD};
use crate::models::CaseEntry;

/// Name of the region path field
pub const REGIONS_FIELD: &str = "regions";

/// Trait for objects that can decide whether a case entry is selected
pub trait RecordFilter: std::fmt::Debug {
    /// Whether `entry` passes the filter
    fn matches(&self, entry: &CaseEntry) -> bool;

    /// Returns the set of field names inspected by this filter
    fn required_fields(&self) -> HashSet<String>;
}

/// Region + date range + predicate filter used by every aggregate
#[derive(Debug, Clone, PartialEq)]
pub struct CaseFilter {
    /// Region that must appear somewhere in the record's path
    pub region_id: String,
    /// Inclusive date range
    pub range: DateRange,
    /// Extra predicate, `AlwaysTrue` when unused
    pub predicate: Expr,
}

impl CaseFilter {
    /// Filter on region membership and date range only
    #[must_use]
    pub fn new(region_id: &str, range: DateRange) -> Self {
        Self {
            region_id: region_id.to_string(),
            range,
            predicate: Expr::AlwaysTrue,
        }
    }

    /// Add a predicate, AND-ed with any existing one
    #[must_use]
    pub fn with_predicate(mut self, predicate: Expr) -> Self {
        self.predicate = self.predicate.and(predicate);
        self
    }
}

impl RecordFilter for CaseFilter {
    fn matches(&self, entry: &CaseEntry) -> bool {
        self.range.contains(entry.record_date)
            && entry.belongs_to(&self.region_id)
            && self.predicate.evaluate(entry)
    }

    fn required_fields(&self) -> HashSet<String> {
        let mut fields = self.predicate.required_fields();
        fields.insert(REGIONS_FIELD.to_string());
        fields.insert(RECORD_DATE_FIELD.to_string());
        fields
    }
}

//! Filtering capabilities for case records
//!
//! This module provides the filters the aggregation engine hands to the
//! record store: region membership, inclusive date ranges and an
//! expression language for additional field predicates.

pub mod core;
pub mod date;
pub mod expr;

pub use self::core::{CaseFilter, RecordFilter};
pub use date::DateRange;
pub use expr::{Expr, LiteralValue, eq_filter, min_count_filter};

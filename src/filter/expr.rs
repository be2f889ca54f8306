//! Expression-based predicates over case entries
//!
//! Expressions name a field of [`CaseEntry`] and compare it to a literal.
//! Categorical fields (`source`, `age_range`, `gender`, `test_type`) compare
//! as text, `record_date` as a date, and any other name is treated as a stage
//! count. Comparisons between mismatched types never match.

use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::NaiveDate;

use crate::filter::core::RecordFilter;
use crate::models::{CaseEntry, CaseField};

/// Name of the date field
pub const RECORD_DATE_FIELD: &str = "record_date";

/// Represents a filter expression over case entries
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Field equals a literal value
    Eq(String, LiteralValue),

    /// Field not equals a literal value
    NotEq(String, LiteralValue),

    /// Field is greater than a literal value
    Gt(String, LiteralValue),

    /// Field is greater than or equal to a literal value
    GtEq(String, LiteralValue),

    /// Field is less than a literal value
    Lt(String, LiteralValue),

    /// Field is less than or equal to a literal value
    LtEq(String, LiteralValue),

    /// Field is in a set of values
    In(String, Vec<LiteralValue>),

    /// Field has no value
    IsNull(String),

    /// Field has a value
    IsNotNull(String),

    /// Logical AND of expressions
    And(Vec<Expr>),

    /// Logical OR of expressions
    Or(Vec<Expr>),

    /// Logical NOT of an expression
    Not(Box<Expr>),

    /// Always evaluates to true
    AlwaysTrue,
}

/// Represents a literal value that can be used in filter expressions
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    /// Integer value, compared against stage counts
    Int(i64),

    /// String value, compared against categorical fields
    String(String),

    /// Calendar date
    Date(NaiveDate),
}

/// The value of one field of an entry, borrowed for comparison
#[derive(Debug, Clone, Copy, PartialEq)]
enum FieldValue<'a> {
    Text(Option<&'a str>),
    Count(u64),
    Date(NaiveDate),
}

impl<'a> FieldValue<'a> {
    fn of(entry: &'a CaseEntry, field: &str) -> Self {
        if field == RECORD_DATE_FIELD {
            return Self::Date(entry.record_date);
        }
        match CaseField::from_name(field) {
            Some(categorical) => Self::Text(entry.category(categorical)),
            None => Self::Count(entry.count(field)),
        }
    }

    const fn is_null(self) -> bool {
        matches!(self, Self::Text(None))
    }

    fn compare(self, literal: &LiteralValue) -> Option<Ordering> {
        match (self, literal) {
            (Self::Text(Some(value)), LiteralValue::String(other)) => Some(value.cmp(other.as_str())),
            (Self::Count(value), LiteralValue::Int(other)) => {
                Some(i128::from(value).cmp(&i128::from(*other)))
            }
            (Self::Date(value), LiteralValue::Date(other)) => Some(value.cmp(other)),
            _ => None,
        }
    }
}

impl Expr {
    /// Evaluate the expression against one entry
    #[must_use]
    pub fn evaluate(&self, entry: &CaseEntry) -> bool {
        match self {
            Self::AlwaysTrue => true,
            Self::And(exprs) => exprs.iter().all(|expr| expr.evaluate(entry)),
            Self::Or(exprs) => exprs.iter().any(|expr| expr.evaluate(entry)),
            Self::Not(expr) => !expr.evaluate(entry),
            Self::IsNull(field) => FieldValue::of(entry, field).is_null(),
            Self::IsNotNull(field) => !FieldValue::of(entry, field).is_null(),
            Self::Eq(field, literal) => compare(entry, field, literal, Ordering::is_eq),
            Self::NotEq(field, literal) => compare(entry, field, literal, Ordering::is_ne),
            Self::Gt(field, literal) => compare(entry, field, literal, Ordering::is_gt),
            Self::GtEq(field, literal) => compare(entry, field, literal, Ordering::is_ge),
            Self::Lt(field, literal) => compare(entry, field, literal, Ordering::is_lt),
            Self::LtEq(field, literal) => compare(entry, field, literal, Ordering::is_le),
            Self::In(field, literals) => literals
                .iter()
                .any(|literal| compare(entry, field, literal, Ordering::is_eq)),
        }
    }

    /// Combine two expressions, flattening nested ANDs
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        match (self, other) {
            (Self::AlwaysTrue, expr) | (expr, Self::AlwaysTrue) => expr,
            (Self::And(mut left), Self::And(right)) => {
                left.extend(right);
                Self::And(left)
            }
            (Self::And(mut left), expr) => {
                left.push(expr);
                Self::And(left)
            }
            (expr, Self::And(mut right)) => {
                right.insert(0, expr);
                Self::And(right)
            }
            (left, right) => Self::And(vec![left, right]),
        }
    }

    /// Returns a set of all field names required by this expression
    #[must_use]
    pub fn required_fields(&self) -> HashSet<String> {
        let mut fields = HashSet::new();
        self.collect_required_fields(&mut fields);
        fields
    }

    /// Helper method to collect field names
    fn collect_required_fields(&self, fields: &mut HashSet<String>) {
        match self {
            Self::Eq(field, _)
            | Self::NotEq(field, _)
            | Self::Gt(field, _)
            | Self::GtEq(field, _)
            | Self::Lt(field, _)
            | Self::LtEq(field, _)
            | Self::In(field, _)
            | Self::IsNull(field)
            | Self::IsNotNull(field) => {
                fields.insert(field.clone());
            }
            Self::And(exprs) | Self::Or(exprs) => {
                for expr in exprs {
                    expr.collect_required_fields(fields);
                }
            }
            Self::Not(expr) => expr.collect_required_fields(fields),
            Self::AlwaysTrue => {}
        }
    }
}

fn compare(
    entry: &CaseEntry,
    field: &str,
    literal: &LiteralValue,
    accept: fn(Ordering) -> bool,
) -> bool {
    FieldValue::of(entry, field)
        .compare(literal)
        .is_some_and(accept)
}

impl RecordFilter for Expr {
    fn matches(&self, entry: &CaseEntry) -> bool {
        self.evaluate(entry)
    }

    fn required_fields(&self) -> HashSet<String> {
        Self::required_fields(self)
    }
}

/// Create an equality expression on a categorical field
#[must_use]
pub fn eq_filter(field: &str, value: &str) -> Expr {
    Expr::Eq(field.to_string(), LiteralValue::String(value.to_string()))
}

/// Create a `stage >= minimum` expression
#[must_use]
pub fn min_count_filter(stage: &str, minimum: i64) -> Expr {
    Expr::GtEq(stage.to_string(), LiteralValue::Int(minimum))
}

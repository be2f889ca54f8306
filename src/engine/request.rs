//! Query requests and their validation

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{Error, Result};
use crate::filter::DateRange;

/// Earliest year accepted in a request date
pub const MIN_YEAR: i32 = 1;
/// Latest year accepted in a request date
pub const MAX_YEAR: i32 = 9999;

/// A panel of the dashboard that can be requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Aggregate {
    Summary,
    SubregionwiseDistribution,
    FeatureDistributions,
    Trends,
    Predictions,
}

impl Aggregate {
    pub const ALL: [Self; 5] = [
        Self::Summary,
        Self::SubregionwiseDistribution,
        Self::FeatureDistributions,
        Self::Trends,
        Self::Predictions,
    ];

    /// Name used in requests and as the response key
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::SubregionwiseDistribution => "subregionwise_distribution",
            Self::FeatureDistributions => "feature_distributions",
            Self::Trends => "trends",
            Self::Predictions => "predictions",
        }
    }
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Aggregate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "summary" => Ok(Self::Summary),
            "subregionwise_distribution" => Ok(Self::SubregionwiseDistribution),
            "feature_distributions" | "demographic_distributions" => {
                Ok(Self::FeatureDistributions)
            }
            "trends" => Ok(Self::Trends),
            "predictions" => Ok(Self::Predictions),
            other => Err(Error::bad_input(
                "aggregates",
                format!("unknown aggregate '{other}'"),
            )),
        }
    }
}

impl Serialize for Aggregate {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// A query as received from the boundary, before validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub region_id: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub aggregates: Vec<String>,
}

/// A query whose fields have been parsed and checked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedQuery {
    pub region_id: String,
    pub range: DateRange,
    /// Requested aggregates without duplicates, in request order
    pub aggregates: Vec<Aggregate>,
}

impl QueryRequest {
    #[must_use]
    pub fn new(region_id: &str, start_date: &str, end_date: &str, aggregates: &[Aggregate]) -> Self {
        Self {
            region_id: region_id.to_string(),
            start_date: start_date.to_string(),
            end_date: end_date.to_string(),
            aggregates: aggregates.iter().map(|a| a.name().to_string()).collect(),
        }
    }

    /// Parse and check every field
    ///
    /// # Errors
    /// Returns [`Error::BadInput`] naming the first offending field.
    pub fn validate(&self) -> Result<ValidatedQuery> {
        let region_id = self.region_id.trim();
        if region_id.is_empty() {
            return Err(Error::bad_input("region_id", "must not be empty"));
        }

        let start = parse_date("start_date", &self.start_date)?;
        let end = parse_date("end_date", &self.end_date)?;
        let range = DateRange::new(start, end)?;

        if self.aggregates.is_empty() {
            return Err(Error::bad_input(
                "aggregates",
                "at least one aggregate must be requested",
            ));
        }
        let mut aggregates = Vec::with_capacity(self.aggregates.len());
        for name in &self.aggregates {
            let aggregate = name.parse::<Aggregate>()?;
            if !aggregates.contains(&aggregate) {
                aggregates.push(aggregate);
            }
        }

        Ok(ValidatedQuery {
            region_id: region_id.to_string(),
            range,
            aggregates,
        })
    }
}

/// Parse a `YYYY-MM-DD` date, also accepting a trailing `T...` time part
///
/// # Errors
/// Returns [`Error::BadInput`] on `field` for unparseable or out-of-range dates.
pub fn parse_date(field: &str, raw: &str) -> Result<NaiveDate> {
    let trimmed = raw.trim();
    let day = trimmed.split_once('T').map_or(trimmed, |(day, _)| day);
    let date = NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|e| Error::bad_input(field, format!("'{raw}' is not a YYYY-MM-DD date ({e})")))?;
    if !(MIN_YEAR..=MAX_YEAR).contains(&date.year()) {
        return Err(Error::bad_input(
            field,
            format!("year {} is outside {MIN_YEAR}..={MAX_YEAR}", date.year()),
        ));
    }
    Ok(date)
}

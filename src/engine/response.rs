//! Response shapes of the aggregation engine
//!
//! Missing data is carried as `None` throughout the engine. It is encoded
//! for the dashboard only here: an absent category becomes `"unknown"` and
//! an absent prediction becomes zone `-2` with value `0`.

use chrono::NaiveDate;
use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;

use crate::engine::request::Aggregate;
use crate::error::{Error, ErrorKind, Result};
use crate::filter::DateRange;
use crate::hierarchy::Breadcrumb;
use crate::models::{PredictionScore, Region, StageTotals};

/// Label shown for a category that was not recorded
pub const UNKNOWN_CATEGORY: &str = "unknown";

/// Stage totals of one child region
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubregionRow {
    pub region_id: String,
    pub name: String,
    #[serde(flatten)]
    pub totals: StageTotals,
}

/// Count of one category of a feature
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    #[serde(serialize_with = "category_label")]
    pub category: Option<String>,
    pub count: u64,
}

/// Per-category counts of each demographic feature
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeatureDistributions {
    pub age_range: Vec<CategoryCount>,
    pub gender: Vec<CategoryCount>,
    pub test_type: Vec<CategoryCount>,
}

/// Totals of one trend week, labelled by its first day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendBucket {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub totals: StageTotals,
}

/// Prediction of one child region for a slot
#[derive(Debug, Clone, PartialEq)]
pub struct SubregionPrediction {
    pub region_id: String,
    pub name: String,
    pub score: Option<PredictionScore>,
}

/// Predictions for one forthcoming week
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionSlot {
    /// First day of the predicted week
    pub date: NaiveDate,
    #[serde(serialize_with = "score_or_missing")]
    pub prediction: Option<PredictionScore>,
    /// In child-region order
    pub subregions: Vec<SubregionPrediction>,
}

impl Serialize for SubregionPrediction {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let score = self.score.unwrap_or(PredictionScore::MISSING);
        let mut state = serializer.serialize_struct("SubregionPrediction", 4)?;
        state.serialize_field("region_id", &self.region_id)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("zone", &score.zone)?;
        state.serialize_field("value", &score.value)?;
        state.end()
    }
}

fn category_label<S: Serializer>(
    category: &Option<String>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(category.as_deref().unwrap_or(UNKNOWN_CATEGORY))
}

fn score_or_missing<S: Serializer>(
    score: &Option<PredictionScore>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    score.unwrap_or(PredictionScore::MISSING).serialize(serializer)
}

/// Why one aggregate could not be computed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&Error> for AggregateError {
    fn from(error: &Error) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Outcome of one aggregate: its value, or an error placeholder
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AggregateResult<T> {
    Ok(T),
    Failed { error: AggregateError },
}

impl<T> AggregateResult<T> {
    #[must_use]
    pub const fn value(&self) -> Option<&T> {
        match self {
            Self::Ok(value) => Some(value),
            Self::Failed { .. } => None,
        }
    }

    #[must_use]
    pub const fn error(&self) -> Option<&AggregateError> {
        match self {
            Self::Ok(_) => None,
            Self::Failed { error } => Some(error),
        }
    }

    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }
}

/// Computed value of any aggregate
#[derive(Debug, Clone, PartialEq)]
pub enum AggregateValue {
    Summary(StageTotals),
    Subregions(Vec<SubregionRow>),
    Features(FeatureDistributions),
    Trends(Vec<TrendBucket>),
    Predictions(Vec<PredictionSlot>),
}

/// Merged answer to a query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResponse {
    pub region_id: String,
    pub region_name: String,
    pub region_type: String,
    pub breadcrumbs: Vec<Breadcrumb>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub available_stages: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<AggregateResult<StageTotals>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subregionwise_distribution: Option<AggregateResult<Vec<SubregionRow>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_distributions: Option<AggregateResult<FeatureDistributions>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trends: Option<AggregateResult<Vec<TrendBucket>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predictions: Option<AggregateResult<Vec<PredictionSlot>>>,
}

impl QueryResponse {
    /// A response carrying the region header and no aggregates yet
    #[must_use]
    pub fn new(
        region: &Region,
        breadcrumbs: Vec<Breadcrumb>,
        range: DateRange,
        stages: &[String],
    ) -> Self {
        Self {
            region_id: region.region_id.clone(),
            region_name: region.name.clone(),
            region_type: region.region_type.clone(),
            breadcrumbs,
            start_date: range.start(),
            end_date: range.end(),
            available_stages: stages.to_vec(),
            summary: None,
            subregionwise_distribution: None,
            feature_distributions: None,
            trends: None,
            predictions: None,
        }
    }

    /// Store the outcome of `aggregate` under its own key
    pub fn insert(&mut self, aggregate: Aggregate, outcome: Result<AggregateValue>) {
        let value = match outcome {
            Ok(value) => value,
            Err(error) => {
                self.insert_failure(aggregate, AggregateError::from(&error));
                return;
            }
        };
        match value {
            AggregateValue::Summary(totals) => self.summary = Some(AggregateResult::Ok(totals)),
            AggregateValue::Subregions(rows) => {
                self.subregionwise_distribution = Some(AggregateResult::Ok(rows));
            }
            AggregateValue::Features(features) => {
                self.feature_distributions = Some(AggregateResult::Ok(features));
            }
            AggregateValue::Trends(buckets) => self.trends = Some(AggregateResult::Ok(buckets)),
            AggregateValue::Predictions(slots) => {
                self.predictions = Some(AggregateResult::Ok(slots));
            }
        }
    }

    fn insert_failure(&mut self, aggregate: Aggregate, error: AggregateError) {
        match aggregate {
            Aggregate::Summary => self.summary = Some(AggregateResult::Failed { error }),
            Aggregate::SubregionwiseDistribution => {
                self.subregionwise_distribution = Some(AggregateResult::Failed { error });
            }
            Aggregate::FeatureDistributions => {
                self.feature_distributions = Some(AggregateResult::Failed { error });
            }
            Aggregate::Trends => self.trends = Some(AggregateResult::Failed { error }),
            Aggregate::Predictions => self.predictions = Some(AggregateResult::Failed { error }),
        }
    }

    /// Aggregates that failed, with their errors
    #[must_use]
    pub fn failures(&self) -> Vec<(Aggregate, &AggregateError)> {
        [
            (Aggregate::Summary, self.summary.as_ref().and_then(AggregateResult::error)),
            (
                Aggregate::SubregionwiseDistribution,
                self.subregionwise_distribution.as_ref().and_then(AggregateResult::error),
            ),
            (
                Aggregate::FeatureDistributions,
                self.feature_distributions.as_ref().and_then(AggregateResult::error),
            ),
            (Aggregate::Trends, self.trends.as_ref().and_then(AggregateResult::error)),
            (Aggregate::Predictions, self.predictions.as_ref().and_then(AggregateResult::error)),
        ]
        .into_iter()
        .filter_map(|(aggregate, error)| error.map(|e| (aggregate, e)))
        .collect()
    }
}

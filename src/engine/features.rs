//! Demographic and test-type breakdowns of confirmed linelist cases

use crate::engine::AggregationEngine;
use crate::engine::response::{CategoryCount, FeatureDistributions};
use crate::error::Result;
use crate::filter::{CaseFilter, DateRange, eq_filter, min_count_filter};
use crate::models::{CaseField, LINELIST_SOURCE, Region};
use crate::store::{GroupKey, GroupLabel, GroupedSumQuery, RecordStore};

/// Stage counted by feature distributions
pub const CONFIRMED_STAGE: &str = "confirmed";

impl<S: RecordStore> AggregationEngine<S> {
    /// Confirmed cases per age range, gender and test type
    ///
    /// Only linelist records with at least one confirmed case count.
    /// Categories are ordered by label, with unrecorded values first.
    pub async fn feature_distributions(
        &self,
        region: &Region,
        range: DateRange,
    ) -> Result<FeatureDistributions> {
        let filter = CaseFilter::new(&region.region_id, range)
            .with_predicate(eq_filter(CaseField::Source.name(), LINELIST_SOURCE))
            .with_predicate(min_count_filter(CONFIRMED_STAGE, 1));

        let (age_range, gender, test_type) = futures::try_join!(
            self.feature(&filter, CaseField::AgeRange),
            self.feature(&filter, CaseField::Gender),
            self.feature(&filter, CaseField::TestType),
        )?;

        Ok(FeatureDistributions {
            age_range,
            gender,
            test_type,
        })
    }

    async fn feature(&self, filter: &CaseFilter, field: CaseField) -> Result<Vec<CategoryCount>> {
        let query = GroupedSumQuery::new(filter.clone(), GroupKey::Category(field), &[CONFIRMED_STAGE]);
        let rows = self.store.grouped_sum(&query).await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| match row.label {
                GroupLabel::Category(category) => Some(CategoryCount {
                    category,
                    count: row.totals.get(CONFIRMED_STAGE),
                }),
                _ => None,
            })
            .collect())
    }
}

//! Overall stage totals of a region

use crate::config::TenantConfig;
use crate::engine::AggregationEngine;
use crate::error::Result;
use crate::filter::{CaseFilter, DateRange};
use crate::models::{Region, StageTotals};
use crate::store::{GroupKey, GroupedSumQuery, RecordStore};

impl<S: RecordStore> AggregationEngine<S> {
    /// Sum of every tenant stage over the window
    ///
    /// An empty window yields all-zero totals, never an empty result.
    pub async fn summary(
        &self,
        tenant: &TenantConfig,
        region: &Region,
        range: DateRange,
    ) -> Result<StageTotals> {
        let query = GroupedSumQuery::new(
            CaseFilter::new(&region.region_id, range),
            GroupKey::Constant,
            &tenant.stages,
        );
        let rows = self.store.grouped_sum(&query).await?;

        let mut totals = StageTotals::zeroed(&tenant.stages);
        for row in &rows {
            totals.merge(&row.totals);
        }
        Ok(totals)
    }
}

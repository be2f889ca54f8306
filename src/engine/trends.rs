//! Weekly trend of the tenant's trend stages

use crate::calendar::{expand_to_weeks, fold_into_weeks};
use crate::config::TenantConfig;
use crate::engine::AggregationEngine;
use crate::engine::response::TrendBucket;
use crate::error::Result;
use crate::filter::{CaseFilter, DateRange};
use crate::models::Region;
use crate::store::{GroupKey, GroupLabel, GroupedSumQuery, RecordStore};

impl<S: RecordStore> AggregationEngine<S> {
    /// Weekly totals over the window widened to whole weeks
    ///
    /// Every week of the widened window is present, ascending, zero when no
    /// record fell in it. Records are summed per day and folded into weeks
    /// by week-start arithmetic.
    pub async fn weekly_trend(
        &self,
        tenant: &TenantConfig,
        region: &Region,
        range: DateRange,
    ) -> Result<Vec<TrendBucket>> {
        let weeks = expand_to_weeks(range.start(), range.end(), tenant.week_start);
        let widened = DateRange::new(weeks.start, weeks.end)?;

        let query = GroupedSumQuery::new(
            CaseFilter::new(&region.region_id, widened),
            GroupKey::Day,
            &tenant.trend_stages,
        );
        let rows = self.store.grouped_sum(&query).await?;

        let daily = rows.into_iter().filter_map(|row| match row.label {
            GroupLabel::Date(date) => Some((date, row.totals)),
            _ => None,
        });

        Ok(fold_into_weeks(weeks, tenant.week_start, &tenant.trend_stages, daily)
            .into_iter()
            .map(|(date, totals)| TrendBucket { date, totals })
            .collect())
    }
}

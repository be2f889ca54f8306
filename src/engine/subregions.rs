//! Stage totals broken down by child region

use log::debug;
use rustc_hash::FxHashMap;

use crate::config::TenantConfig;
use crate::engine::AggregationEngine;
use crate::engine::response::SubregionRow;
use crate::error::Result;
use crate::filter::{CaseFilter, DateRange};
use crate::models::{Region, StageTotals};
use crate::store::{GroupKey, GroupLabel, GroupedSumQuery, RecordStore};

impl<S: RecordStore> AggregationEngine<S> {
    /// One row per child region of `region`, in child order
    ///
    /// Children without records in the window get zero totals. Regions
    /// whose type has no subregion index in the tenant configuration are
    /// leaves and yield an empty list.
    pub async fn subregion_distribution(
        &self,
        tenant: &TenantConfig,
        region: &Region,
        range: DateRange,
    ) -> Result<Vec<SubregionRow>> {
        let Some(index) = tenant.subregion_index(&region.region_type) else {
            debug!(
                "No subregion index for type '{}', treating {} as a leaf",
                region.region_type, region.region_id
            );
            return Ok(Vec::new());
        };

        let children = self.hierarchy.children_of(&region.region_id);
        if children.is_empty() {
            return Ok(Vec::new());
        }

        let query = GroupedSumQuery::new(
            CaseFilter::new(&region.region_id, range),
            GroupKey::RegionLevel(index),
            &tenant.stages,
        );
        let rows = self.store.grouped_sum(&query).await?;

        let mut by_child: FxHashMap<&str, StageTotals> = children
            .iter()
            .map(|child| (child.region_id.as_str(), StageTotals::zeroed(&tenant.stages)))
            .collect();
        for row in rows {
            let matched = match &row.label {
                GroupLabel::Region(Some(id)) => by_child.get_mut(id.as_str()),
                _ => None,
            };
            match matched {
                Some(totals) => totals.merge(&row.totals),
                None => debug!(
                    "Ignoring {} records of {} under unmatched subregion key {:?}: {:?}",
                    row.records, region.region_id, row.label, row.totals
                ),
            }
        }

        Ok(children
            .into_iter()
            .map(|child| SubregionRow {
                region_id: child.region_id.clone(),
                name: child.name.clone(),
                totals: by_child
                    .remove(child.region_id.as_str())
                    .unwrap_or_else(|| StageTotals::zeroed(&tenant.stages)),
            })
            .collect())
    }
}

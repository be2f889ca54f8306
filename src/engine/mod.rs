//! Regional aggregation engine
//!
//! The engine answers dashboard queries for one region and date window. It
//! resolves and scope-checks the region, then computes every requested
//! aggregate concurrently against the store. Each aggregate succeeds or
//! fails on its own; a failure is reported under that aggregate's key and
//! never aborts the others. The response is assembled only once every
//! aggregate has finished, so dropping the query future cancels all of its
//! store calls and nothing partial is returned.

use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use futures::future::join_all;
use itertools::Itertools;
use log::{debug, warn};

use crate::config::TenantConfig;
use crate::error::{Error, Result};
use crate::filter::DateRange;
use crate::hierarchy::RegionHierarchy;
use crate::models::Region;
use crate::store::{PredictionStore, RecordStore};
use crate::utils::logging::{log_operation_complete, log_operation_start};

pub mod features;
pub mod predictions;
pub mod request;
pub mod response;
pub mod subregions;
pub mod summary;
pub mod trends;

pub use request::{Aggregate, QueryRequest, ValidatedQuery};
pub use response::{
    AggregateError, AggregateResult, AggregateValue, CategoryCount, FeatureDistributions,
    PredictionSlot, QueryResponse, SubregionPrediction, SubregionRow, TrendBucket,
};

/// Computes dashboard aggregates over a region hierarchy and a store
#[derive(Debug)]
pub struct AggregationEngine<S> {
    hierarchy: Arc<RegionHierarchy>,
    store: Arc<S>,
}

impl<S> Clone for AggregationEngine<S> {
    fn clone(&self) -> Self {
        Self {
            hierarchy: Arc::clone(&self.hierarchy),
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> AggregationEngine<S> {
    #[must_use]
    pub const fn new(hierarchy: Arc<RegionHierarchy>, store: Arc<S>) -> Self {
        Self { hierarchy, store }
    }

    #[must_use]
    pub fn hierarchy(&self) -> &RegionHierarchy {
        &self.hierarchy
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Resolve `region_id` and check it lies within `scope`
    ///
    /// # Errors
    /// [`Error::NotFound`] for unknown regions, [`Error::Forbidden`] for
    /// regions outside the scope.
    pub fn resolve(&self, region_id: &str, scope: &str) -> Result<&Region> {
        let region = self.hierarchy.find(region_id)?;
        if !RegionHierarchy::in_scope(region, scope) {
            return Err(Error::Forbidden {
                region_id: region_id.to_string(),
                scope: scope.to_string(),
            });
        }
        Ok(region)
    }
}

impl<S: RecordStore + PredictionStore> AggregationEngine<S> {
    /// Answer a dashboard query on behalf of a caller limited to `scope`
    ///
    /// # Errors
    /// Fails as a whole only for bad input, unknown regions and regions
    /// outside the scope. Failures of individual aggregates are reported
    /// inside the response.
    pub async fn query(
        &self,
        tenant: &TenantConfig,
        scope: &str,
        request: &QueryRequest,
    ) -> Result<QueryResponse> {
        let query = request.validate()?;
        let region = self.resolve(&query.region_id, scope)?;
        let range = query.range;

        let subject = format!("{} ({} to {})", region.region_id, range.start(), range.end());
        log_operation_start(
            &format!("Aggregating {}", query.aggregates.iter().join(", ")),
            &subject,
        );
        let started = Instant::now();

        let outcomes = join_all(query.aggregates.iter().map(|&aggregate| async move {
            let outcome = self.compute(aggregate, tenant, region, range).await;
            (aggregate, outcome)
        }))
        .await;

        let breadcrumbs = RegionHierarchy::breadcrumbs(region, scope);
        let mut response = QueryResponse::new(region, breadcrumbs, range, &tenant.stages);
        for (aggregate, outcome) in outcomes {
            match &outcome {
                Ok(_) => debug!("Computed {aggregate} for {}", region.region_id),
                Err(e) => warn!(
                    "Aggregate {aggregate} failed for {} ({}): {e}",
                    region.region_id,
                    e.kind()
                ),
            }
            response.insert(aggregate, outcome);
        }

        log_operation_complete(
            "aggregated",
            &subject,
            query.aggregates.len(),
            Some(started.elapsed()),
        );
        Ok(response)
    }

    async fn compute(
        &self,
        aggregate: Aggregate,
        tenant: &TenantConfig,
        region: &Region,
        range: DateRange,
    ) -> Result<AggregateValue> {
        match aggregate {
            Aggregate::Summary => self
                .summary(tenant, region, range)
                .await
                .map(AggregateValue::Summary),
            Aggregate::SubregionwiseDistribution => self
                .subregion_distribution(tenant, region, range)
                .await
                .map(AggregateValue::Subregions),
            Aggregate::FeatureDistributions => self
                .feature_distributions(region, range)
                .await
                .map(AggregateValue::Features),
            Aggregate::Trends => self
                .weekly_trend(tenant, region, range)
                .await
                .map(AggregateValue::Trends),
            Aggregate::Predictions => self
                .prediction_overlay(tenant, region, range.end())
                .await
                .map(AggregateValue::Predictions),
        }
    }
}

impl<S: RecordStore> AggregationEngine<S> {
    /// Most recent record date for a region within `scope`
    ///
    /// `None` when the region has no records at all.
    pub async fn latest_record_date(&self, region_id: &str, scope: &str) -> Result<Option<NaiveDate>> {
        let region = self.resolve(region_id, scope)?;
        self.store.latest_record_date(&region.region_id).await
    }
}

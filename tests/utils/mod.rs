use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use arrow::datatypes::FieldRef;
use chrono::NaiveDate;
use epi_aggregator::calendar::WeekStart;
use epi_aggregator::store::{
    GroupKey, GroupRow, GroupedSumQuery, PredictionStore, RecordStore, RetryPolicy, StoreFuture,
};
use epi_aggregator::{
    AggregationEngine, CaseEntry, Error, MemoryStore, Prediction, PredictionSet, Region,
    RegionHierarchy, TenantConfig,
};
use parquet::arrow::ArrowWriter;
use serde::Serialize;
use serde_arrow::schema::{SchemaLike, TracingOptions};

/// Scope region of the test tenant
pub const SCOPE: &str = "state_a";

/// A day of March 2021
#[must_use]
pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2021, 3, d).unwrap()
}

/// state_a -> district_a1 -> subdistrict_a1x, state_a -> district_a2,
/// state_a -> village_a3, and an unrelated state_b
#[must_use]
pub fn regions() -> Vec<Region> {
    let state_a = Region::root("state_a", "state", "State A");
    let district_a1 = Region::child_of(&state_a, "district_a1", "district", "District A1");
    let district_a2 = Region::child_of(&state_a, "district_a2", "district", "District A2");
    let subdistrict = Region::child_of(&district_a1, "subdistrict_a1x", "subdistrict", "Subdistrict A1X");
    let village = Region::child_of(&state_a, "village_a3", "village", "Village A3");
    let state_b = Region::root("state_b", "state", "State B");
    vec![state_a, district_a1, district_a2, subdistrict, village, state_b]
}

#[must_use]
pub fn hierarchy() -> RegionHierarchy {
    RegionHierarchy::from_regions(regions()).unwrap()
}

/// Case records of the first week of March 2021
///
/// district_a1 has 5 confirmed, district_a2 has 0, and one state-level
/// record with 7 confirmed has no district.
#[must_use]
pub fn cases() -> Vec<CaseEntry> {
    vec![
        CaseEntry::new("c1", day(1), "linelists", &["state_a", "district_a1", "admin_0", "admin_0", "admin_0"])
            .with_count("confirmed", 3)
            .with_count("tested", 4)
            .with_demographics("20-29", "F", "rtpcr"),
        CaseEntry::new("c2", day(4), "linelists", &["state_a", "district_a1"])
            .with_count("confirmed", 1),
        CaseEntry::new("c3", day(5), "summaries", &["state_a", "district_a1"])
            .with_count("confirmed", 1)
            .with_count("tested", 10),
        CaseEntry::new("c4", day(2), "linelists", &["state_a", "district_a2"])
            .with_count("confirmed", 0)
            .with_count("tested", 6)
            .with_demographics("60-69", "M", "rat"),
        CaseEntry::new("c5", day(3), "summaries", &["state_a", "admin_0", "admin_0", "admin_0", "admin_0"])
            .with_count("confirmed", 7),
        CaseEntry::new("c6", day(2), "linelists", &["state_b", "district_b1"])
            .with_count("confirmed", 100)
            .with_demographics("20-29", "M", "rtpcr"),
    ]
}

#[must_use]
pub fn prediction(region_id: &str, parent_id: Option<&str>, date: NaiveDate, zone: i32, value: f64) -> Prediction {
    Prediction {
        region_id: region_id.to_string(),
        parent_id: parent_id.map(str::to_string),
        date,
        computation_date: day(1),
        prediction: value,
        prediction_zone: zone,
        threshold_method: None,
    }
}

/// state_a has a real zone-0 prediction for 2021-03-08, district_a1 has
/// zone 2; nothing else is predicted
#[must_use]
pub fn predictions() -> PredictionSet {
    vec![
        prediction("state_a", None, day(8), 0, 0.0),
        prediction("district_a1", Some("state_a"), day(8), 2, 1.4),
    ]
    .into_iter()
    .collect()
}

#[must_use]
pub fn tenant() -> TenantConfig {
    TenantConfig {
        tenant_id: "test".to_string(),
        domains: vec!["dashboard.example.org".to_string()],
        scope_region: Some(SCOPE.to_string()),
        splittable_region_types: vec!["state".to_string(), "district".to_string()],
        ..TenantConfig::default()
    }
}

#[must_use]
pub fn sunday_tenant() -> TenantConfig {
    TenantConfig {
        week_start: WeekStart::Sunday,
        ..tenant()
    }
}

#[must_use]
pub fn engine_with<S>(store: S) -> AggregationEngine<S> {
    AggregationEngine::new(Arc::new(hierarchy()), Arc::new(store))
}

#[must_use]
pub fn engine() -> AggregationEngine<MemoryStore> {
    engine_with(MemoryStore::new(cases(), predictions()))
}

#[must_use]
pub fn fast_retry_policy() -> RetryPolicy {
    RetryPolicy {
        timeout: Duration::from_millis(200),
        max_retries: 2,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
    }
}

/// Store that fails every grouped sum using one group key and delegates
/// everything else
#[derive(Debug)]
pub struct FailingStore {
    pub inner: MemoryStore,
    pub fail_on: GroupKey,
}

impl RecordStore for FailingStore {
    fn grouped_sum<'a>(&'a self, query: &'a GroupedSumQuery) -> StoreFuture<'a, Vec<GroupRow>> {
        if query.group_by == self.fail_on {
            Box::pin(async { Err(Error::StoreUnavailable("connection refused".into())) })
        } else {
            self.inner.grouped_sum(query)
        }
    }

    fn latest_record_date<'a>(&'a self, region_id: &'a str) -> StoreFuture<'a, Option<NaiveDate>> {
        self.inner.latest_record_date(region_id)
    }
}

impl PredictionStore for FailingStore {
    fn current_prediction<'a>(
        &'a self,
        region_id: &'a str,
        date: NaiveDate,
    ) -> StoreFuture<'a, Option<Prediction>> {
        self.inner.current_prediction(region_id, date)
    }

    fn current_predictions_under<'a>(
        &'a self,
        parent_id: &'a str,
        date: NaiveDate,
    ) -> StoreFuture<'a, Vec<Prediction>> {
        self.inner.current_predictions_under(parent_id, date)
    }
}

/// Write `rows` as a single-batch Parquet file
pub fn write_parquet<T: Serialize>(path: &Path, rows: &[T]) {
    let fields = Vec::<FieldRef>::from_samples(rows, TracingOptions::default().allow_null_fields(true))
        .unwrap();
    let batch = serde_arrow::to_record_batch(&fields, &rows).unwrap();
    let file = File::create(path).unwrap();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();
}

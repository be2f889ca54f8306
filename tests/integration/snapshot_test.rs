use std::fs;
use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use epi_aggregator::hierarchy::RegionRow;
use epi_aggregator::models::PredictionScore;
use epi_aggregator::{
    Aggregate, AggregationEngine, ErrorKind, Prediction, QueryRequest, Result, Snapshot,
};
use serde::Serialize;

use crate::utils::{SCOPE, day, prediction, tenant, write_parquet};

/// Case file layout with two stage columns
#[derive(Debug, Serialize)]
struct CaseFileRow {
    record_id: String,
    record_date: NaiveDate,
    source: String,
    admin1: Option<String>,
    admin2: Option<String>,
    admin3: Option<String>,
    admin4: Option<String>,
    admin5: Option<String>,
    age_range: Option<String>,
    gender: Option<String>,
    test_type: Option<String>,
    confirmed: u64,
    tested: u64,
}

fn case_row(id: &str, date: NaiveDate, district: Option<&str>, confirmed: u64, tested: u64) -> CaseFileRow {
    let placeholder = || Some("admin_0".to_string());
    CaseFileRow {
        record_id: id.to_string(),
        record_date: date,
        source: "linelists".to_string(),
        admin1: Some("state_a".to_string()),
        admin2: district.map(str::to_string).or_else(placeholder),
        admin3: placeholder(),
        admin4: placeholder(),
        admin5: placeholder(),
        age_range: Some("30-39".to_string()),
        gender: Some(String::new()),
        test_type: Some("rat".to_string()),
        confirmed,
        tested,
    }
}

fn region_row(id: &str, name: &str, parent: Option<&str>) -> RegionRow {
    RegionRow {
        region_id: id.to_string(),
        region_name: name.to_string(),
        parent_id: parent.map(str::to_string),
    }
}

fn computed(mut row: Prediction, computation_day: u32) -> Prediction {
    row.computation_date = day(computation_day);
    row.threshold_method = Some("ewma".to_string());
    row
}

fn write_snapshot(dir: &Path) {
    write_parquet(
        &dir.join("regions.parquet"),
        &[
            region_row("state_a", "State A", None),
            region_row("district_a1", "District A1", Some("state_a")),
            region_row("district_a2", "District A2", Some("state_a")),
            region_row("subdistrict_a1x", "Subdistrict A1X", Some("district_a1")),
        ],
    );

    let cases_dir = dir.join("cases");
    fs::create_dir(&cases_dir).unwrap();
    write_parquet(
        &cases_dir.join("part-0.parquet"),
        &[
            case_row("r1", day(1), Some("district_a1"), 2, 5),
            case_row("r2", day(2), Some("district_a2"), 1, 1),
        ],
    );
    write_parquet(
        &cases_dir.join("part-1.parquet"),
        &[case_row("r3", day(4), None, 4, 0)],
    );

    write_parquet(
        &dir.join("predictions.parquet"),
        &[
            // The later computation arrives first and must survive
            computed(prediction("district_a1", None, day(8), 3, 2.5), 5),
            computed(prediction("district_a1", None, day(8), 1, 0.5), 2),
            computed(prediction("district_a2", Some("state_a"), day(8), 0, 0.0), 2),
        ],
    );
}

/// Test a snapshot directory loads into a queryable engine
#[tokio::test]
async fn test_snapshot_round_trip() -> Result<()> {
    let dir = tempfile::tempdir().unwrap();
    write_snapshot(dir.path());

    let snapshot = Snapshot::load_dir(dir.path()).await?;
    assert_eq!(snapshot.hierarchy.len(), 4);
    assert_eq!(snapshot.store.case_count(), 3);
    assert_eq!(snapshot.store.prediction_count(), 2);

    let subdistrict = snapshot.hierarchy.find("subdistrict_a1x")?;
    assert_eq!(subdistrict.region_type, "subdistrict");
    assert_eq!(subdistrict.parent_ids, vec!["state_a", "district_a1"]);

    let engine = AggregationEngine::new(Arc::new(snapshot.hierarchy), Arc::new(snapshot.store));
    let request = QueryRequest::new(
        "state_a",
        "2021-03-01",
        "2021-03-07",
        &[
            Aggregate::Summary,
            Aggregate::SubregionwiseDistribution,
            Aggregate::FeatureDistributions,
            Aggregate::Predictions,
        ],
    );
    let response = engine.query(&tenant(), SCOPE, &request).await?;
    assert!(response.failures().is_empty());

    let summary = response.summary.as_ref().and_then(|s| s.value()).unwrap();
    assert_eq!(summary.get("confirmed"), 7);
    assert_eq!(summary.get("tested"), 6);
    assert_eq!(summary.get("deaths"), 0);

    let rows = response
        .subregionwise_distribution
        .as_ref()
        .and_then(|s| s.value())
        .unwrap();
    assert_eq!(rows[0].totals.get("confirmed"), 2);
    assert_eq!(rows[1].totals.get("confirmed"), 1);

    // Blank genders are read as unrecorded
    let features = response
        .feature_distributions
        .as_ref()
        .and_then(|f| f.value())
        .unwrap();
    assert_eq!(features.gender.len(), 1);
    assert_eq!(features.gender[0].category, None);
    assert_eq!(features.gender[0].count, 7);

    // Parent derived from the hierarchy, newest computation kept
    let slots = response.predictions.as_ref().and_then(|p| p.value()).unwrap();
    assert_eq!(slots[0].date, day(8));
    assert_eq!(slots[0].subregions[0].score, Some(PredictionScore { zone: 3, value: 2.5 }));
    assert_eq!(slots[0].subregions[1].score, Some(PredictionScore { zone: 0, value: 0.0 }));
    assert_eq!(slots[0].prediction, None);

    assert_eq!(engine.latest_record_date("state_a", SCOPE).await?, Some(day(4)));
    Ok(())
}

/// Test predictions are optional but regions and cases are not
#[tokio::test]
async fn test_snapshot_inputs() -> Result<()> {
    let dir = tempfile::tempdir().unwrap();
    write_snapshot(dir.path());
    fs::remove_file(dir.path().join("predictions.parquet")).unwrap();

    let snapshot = Snapshot::load_dir(dir.path()).await?;
    assert_eq!(snapshot.store.prediction_count(), 0);

    fs::remove_dir_all(dir.path().join("cases")).unwrap();
    let error = Snapshot::load_dir(dir.path()).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Internal);
    assert!(error.to_string().contains("cases"));

    let missing = Snapshot::load_dir(&dir.path().join("nowhere")).await.unwrap_err();
    assert_eq!(missing.kind(), ErrorKind::Internal);
    Ok(())
}

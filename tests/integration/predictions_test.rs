use chrono::NaiveDate;
use epi_aggregator::models::PredictionScore;
use epi_aggregator::{Aggregate, MemoryStore, QueryRequest, Result};
use serde_json::json;

use crate::utils::{SCOPE, cases, day, engine, engine_with, prediction, sunday_tenant, tenant};

fn overlay_request(region_id: &str) -> QueryRequest {
    QueryRequest::new(region_id, "2021-03-01", "2021-03-07", &[Aggregate::Predictions])
}

/// Test the four slots follow the week containing the end date
#[tokio::test]
async fn test_prediction_slots() -> Result<()> {
    let response = engine().query(&tenant(), SCOPE, &overlay_request("state_a")).await?;

    let slots = response.predictions.as_ref().and_then(|p| p.value()).unwrap();
    let dates: Vec<NaiveDate> = slots.iter().map(|s| s.date).collect();
    assert_eq!(dates, vec![day(8), day(15), day(22), day(29)]);

    let first = &slots[0];
    assert_eq!(first.prediction, Some(PredictionScore { zone: 0, value: 0.0 }));
    let children: Vec<&str> = first.subregions.iter().map(|s| s.region_id.as_str()).collect();
    assert_eq!(children, vec!["district_a1", "district_a2", "village_a3"]);
    assert_eq!(first.subregions[0].score, Some(PredictionScore { zone: 2, value: 1.4 }));
    assert_eq!(first.subregions[1].score, None);

    assert!(slots[1..].iter().all(|slot| slot.prediction.is_none()));
    Ok(())
}

/// Test a real zone-0 prediction is not confused with a missing one
#[tokio::test]
async fn test_missing_prediction_encoding() -> Result<()> {
    let response = engine().query(&tenant(), SCOPE, &overlay_request("state_a")).await?;
    let encoded = serde_json::to_value(&response).unwrap();

    let first = &encoded["predictions"][0];
    assert_eq!(first["date"], "2021-03-08");
    assert_eq!(first["prediction"], json!({"zone": 0, "value": 0.0}));
    assert_eq!(first["subregions"][1]["zone"], -2);
    assert_eq!(first["subregions"][1]["value"], 0.0);

    let second = &encoded["predictions"][1];
    assert_eq!(second["prediction"], json!({"zone": -2, "value": 0.0}));
    Ok(())
}

/// Test Sunday tenants get Sunday slots
#[tokio::test]
async fn test_sunday_prediction_slots() -> Result<()> {
    let response = engine()
        .query(&sunday_tenant(), SCOPE, &overlay_request("state_a"))
        .await?;

    let slots = response.predictions.as_ref().and_then(|p| p.value()).unwrap();
    let dates: Vec<NaiveDate> = slots.iter().map(|s| s.date).collect();
    assert_eq!(
        dates,
        vec![
            day(14),
            day(21),
            day(28),
            NaiveDate::from_ymd_opt(2021, 4, 4).unwrap()
        ]
    );
    assert!(slots.iter().all(|slot| slot.prediction.is_none()));
    Ok(())
}

/// Test a childless region has slots with no subregions
#[tokio::test]
async fn test_leaf_prediction_overlay() -> Result<()> {
    let response = engine()
        .query(&tenant(), SCOPE, &overlay_request("district_a1"))
        .await?;

    let slots = response.predictions.as_ref().and_then(|p| p.value()).unwrap();
    assert_eq!(slots.len(), 4);
    assert_eq!(slots[0].prediction, Some(PredictionScore { zone: 2, value: 1.4 }));
    assert_eq!(slots[0].subregions.len(), 1);
    assert_eq!(slots[0].subregions[0].region_id, "subdistrict_a1x");
    assert_eq!(slots[0].subregions[0].score, None);
    Ok(())
}

/// Test child predictions are found by region id, not by their recorded parent
#[tokio::test]
async fn test_child_predictions_ignore_recorded_parent() -> Result<()> {
    let predictions = vec![
        prediction("district_a1", None, day(8), 3, 2.5),
        prediction("district_a2", Some("state_b"), day(8), 1, 0.5),
    ]
    .into_iter()
    .collect();
    let engine = engine_with(MemoryStore::new(cases(), predictions));

    let response = engine.query(&tenant(), SCOPE, &overlay_request("state_a")).await?;
    let slots = response.predictions.as_ref().and_then(|p| p.value()).unwrap();
    let first = &slots[0];
    assert_eq!(first.subregions[0].region_id, "district_a1");
    assert_eq!(first.subregions[0].score, Some(PredictionScore { zone: 3, value: 2.5 }));
    assert_eq!(first.subregions[1].region_id, "district_a2");
    assert_eq!(first.subregions[1].score, Some(PredictionScore { zone: 1, value: 0.5 }));
    assert_eq!(first.subregions[2].score, None);

    let encoded = serde_json::to_value(&response).unwrap();
    assert_eq!(encoded["predictions"][0]["subregions"][0]["zone"], 3);
    Ok(())
}

use epi_aggregator::engine::CategoryCount;
use epi_aggregator::{
    Aggregate, CaseEntry, ErrorKind, MemoryStore, PredictionSet, QueryRequest, Result,
};
use serde_json::json;

use crate::utils::{SCOPE, day, engine, engine_with, tenant};

fn first_week(region_id: &str, aggregates: &[Aggregate]) -> QueryRequest {
    QueryRequest::new(region_id, "2021-03-01", "2021-03-07", aggregates)
}

fn category(label: Option<&str>, count: u64) -> CategoryCount {
    CategoryCount {
        category: label.map(str::to_string),
        count,
    }
}

/// Test that the summary sums every stage and counts records without a district
#[tokio::test]
async fn test_summary_totals() -> Result<()> {
    let response = engine()
        .query(&tenant(), SCOPE, &first_week("state_a", &[Aggregate::Summary]))
        .await?;

    let summary = response.summary.as_ref().and_then(|s| s.value()).unwrap();
    assert_eq!(summary.get("confirmed"), 12);
    assert_eq!(summary.get("tested"), 20);
    assert_eq!(summary.get("deaths"), 0);
    assert_eq!(summary.len(), 4);

    assert!(response.subregionwise_distribution.is_none());
    assert!(response.trends.is_none());
    Ok(())
}

/// Test that an empty window yields zeros rather than an empty summary
#[tokio::test]
async fn test_summary_zero_fill() -> Result<()> {
    let request = QueryRequest::new("state_a", "2020-01-01", "2020-01-31", &[Aggregate::Summary]);
    let response = engine().query(&tenant(), SCOPE, &request).await?;

    let summary = response.summary.as_ref().and_then(|s| s.value()).unwrap();
    assert_eq!(summary.len(), 4);
    assert!(summary.is_zero());
    Ok(())
}

/// Test subregion rows cover every child, in id order, zero-filled
#[tokio::test]
async fn test_subregion_distribution() -> Result<()> {
    let response = engine()
        .query(
            &tenant(),
            SCOPE,
            &first_week("state_a", &[Aggregate::SubregionwiseDistribution]),
        )
        .await?;

    let rows = response
        .subregionwise_distribution
        .as_ref()
        .and_then(|s| s.value())
        .unwrap();
    let ids: Vec<&str> = rows.iter().map(|row| row.region_id.as_str()).collect();
    assert_eq!(ids, vec!["district_a1", "district_a2", "village_a3"]);

    assert_eq!(rows[0].totals.get("confirmed"), 5);
    assert_eq!(rows[0].totals.get("tested"), 14);
    assert_eq!(rows[1].totals.get("confirmed"), 0);
    assert_eq!(rows[1].totals.get("tested"), 6);
    assert!(rows[2].totals.is_zero());

    // The state-level record without a district is not attributed to any child
    let attributed: u64 = rows.iter().map(|row| row.totals.get("confirmed")).sum();
    assert_eq!(attributed, 5);
    Ok(())
}

/// Test regions below the configured depth and childless regions are leaves
#[tokio::test]
async fn test_subregion_distribution_of_leaves() -> Result<()> {
    let engine = engine();
    for leaf in ["village_a3", "subdistrict_a1x"] {
        let response = engine
            .query(
                &tenant(),
                SCOPE,
                &first_week(leaf, &[Aggregate::SubregionwiseDistribution]),
            )
            .await?;
        let rows = response
            .subregionwise_distribution
            .as_ref()
            .and_then(|s| s.value())
            .unwrap();
        assert!(rows.is_empty(), "{leaf} should have no subregion rows");
    }
    Ok(())
}

/// Test a district distributes over its subdistricts
#[tokio::test]
async fn test_subregion_distribution_below_root() -> Result<()> {
    let path = ["state_a", "district_a1", "subdistrict_a1x"];
    let cases = vec![
        CaseEntry::new("s1", day(2), "linelists", &path)
            .with_count("confirmed", 3)
            .with_count("tested", 5),
        CaseEntry::new("s2", day(4), "summaries", &path).with_count("confirmed", 1),
        CaseEntry::new("s3", day(4), "linelists", &["state_a", "district_a1"])
            .with_count("confirmed", 6),
    ];
    let engine = engine_with(MemoryStore::new(cases, PredictionSet::new()));

    let response = engine
        .query(
            &tenant(),
            SCOPE,
            &first_week("district_a1", &[Aggregate::SubregionwiseDistribution]),
        )
        .await?;
    let rows = response
        .subregionwise_distribution
        .as_ref()
        .and_then(|s| s.value())
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].region_id, "subdistrict_a1x");
    assert_eq!(rows[0].totals.get("confirmed"), 4);
    assert_eq!(rows[0].totals.get("tested"), 5);
    Ok(())
}

/// Test feature distributions only count confirmed linelist records
#[tokio::test]
async fn test_feature_distributions() -> Result<()> {
    let response = engine()
        .query(
            &tenant(),
            SCOPE,
            &first_week("state_a", &[Aggregate::FeatureDistributions]),
        )
        .await?;

    let features = response
        .feature_distributions
        .as_ref()
        .and_then(|f| f.value())
        .unwrap();
    assert_eq!(
        features.age_range,
        vec![category(None, 1), category(Some("20-29"), 3)]
    );
    assert_eq!(features.gender, vec![category(None, 1), category(Some("F"), 3)]);
    assert_eq!(
        features.test_type,
        vec![category(None, 1), category(Some("rtpcr"), 3)]
    );

    let encoded = serde_json::to_value(features).unwrap();
    assert_eq!(encoded["age_range"][0], json!({"category": "unknown", "count": 1}));
    Ok(())
}

/// Test the old panel name selects feature distributions
#[tokio::test]
async fn test_demographic_alias() -> Result<()> {
    let request = QueryRequest {
        region_id: "district_a1".into(),
        start_date: "2021-03-01".into(),
        end_date: "2021-03-07".into(),
        aggregates: vec!["demographic_distributions".into()],
    };
    let response = engine().query(&tenant(), SCOPE, &request).await?;
    assert!(response.feature_distributions.is_some_and(|f| f.is_ok()));
    Ok(())
}

/// Test the region header and breadcrumbs of a nested region
#[tokio::test]
async fn test_breadcrumbs() -> Result<()> {
    let response = engine()
        .query(&tenant(), SCOPE, &first_week("subdistrict_a1x", &[Aggregate::Summary]))
        .await?;

    assert_eq!(response.region_name, "Subdistrict A1X");
    assert_eq!(response.region_type, "subdistrict");
    let trail: Vec<&str> = response.breadcrumbs.iter().map(|b| b.id.as_str()).collect();
    assert_eq!(trail, vec!["state_a", "district_a1", "subdistrict_a1x"]);

    // A narrower caller scope cuts the trail at its scope region
    let response = engine()
        .query(&tenant(), "district_a1", &first_week("subdistrict_a1x", &[Aggregate::Summary]))
        .await?;
    let trail: Vec<&str> = response.breadcrumbs.iter().map(|b| b.id.as_str()).collect();
    assert_eq!(trail, vec!["district_a1", "subdistrict_a1x"]);
    Ok(())
}

/// Test whole-request errors for unknown, out-of-scope and malformed queries
#[tokio::test]
async fn test_request_errors() {
    let engine = engine();
    let tenant = tenant();

    let unknown = engine
        .query(&tenant, SCOPE, &first_week("district_zz", &[Aggregate::Summary]))
        .await
        .unwrap_err();
    assert_eq!(unknown.kind(), ErrorKind::NotFound);

    let outside = engine
        .query(&tenant, SCOPE, &first_week("state_b", &[Aggregate::Summary]))
        .await
        .unwrap_err();
    assert_eq!(outside.kind(), ErrorKind::Forbidden);

    let reversed = QueryRequest::new("state_a", "2021-03-07", "2021-03-01", &[Aggregate::Summary]);
    let bad = engine.query(&tenant, SCOPE, &reversed).await.unwrap_err();
    assert_eq!(bad.kind(), ErrorKind::BadRequest);

    let empty = QueryRequest::new("state_a", "2021-03-01", "2021-03-07", &[]);
    let bad = engine.query(&tenant, SCOPE, &empty).await.unwrap_err();
    assert_eq!(bad.kind(), ErrorKind::BadRequest);
}

/// Test the latest record date respects region membership and scope
#[tokio::test]
async fn test_latest_record_date() -> Result<()> {
    let engine = engine();
    assert_eq!(engine.latest_record_date("state_a", SCOPE).await?, Some(day(5)));
    assert_eq!(engine.latest_record_date("district_a2", SCOPE).await?, Some(day(2)));
    assert_eq!(engine.latest_record_date("village_a3", SCOPE).await?, None);

    let outside = engine.latest_record_date("state_b", SCOPE).await.unwrap_err();
    assert_eq!(outside.kind(), ErrorKind::Forbidden);
    Ok(())
}

/// Test every panel together serializes under its own key
#[tokio::test]
async fn test_full_dashboard_response() -> Result<()> {
    let response = engine()
        .query(&tenant(), SCOPE, &first_week("state_a", &Aggregate::ALL))
        .await?;
    assert!(response.failures().is_empty());

    let encoded = serde_json::to_value(&response).unwrap();
    for aggregate in Aggregate::ALL {
        assert!(encoded.get(aggregate.name()).is_some(), "missing {aggregate}");
    }
    assert_eq!(encoded["summary"]["confirmed"], 12);
    assert_eq!(encoded["subregionwise_distribution"][0]["region_id"], "district_a1");
    assert_eq!(encoded["available_stages"], json!(["suspected", "tested", "confirmed", "deaths"]));
    Ok(())
}

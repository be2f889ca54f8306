use epi_aggregator::store::GroupKey;
use epi_aggregator::{Aggregate, ErrorKind, MemoryStore, QueryRequest, Result, RetryingStore};
use serde_json::json;

use crate::utils::{
    FailingStore, SCOPE, cases, engine_with, fast_retry_policy, predictions, tenant,
};

fn failing_trends() -> FailingStore {
    FailingStore {
        inner: MemoryStore::new(cases(), predictions()),
        fail_on: GroupKey::Day,
    }
}

fn dashboard_request() -> QueryRequest {
    QueryRequest::new(
        "state_a",
        "2021-03-01",
        "2021-03-07",
        &[Aggregate::Summary, Aggregate::Trends, Aggregate::Predictions],
    )
}

/// Test one failing aggregate leaves the others intact
#[tokio::test]
async fn test_partial_failure() -> Result<()> {
    let engine = engine_with(failing_trends());
    let response = engine.query(&tenant(), SCOPE, &dashboard_request()).await?;

    let summary = response.summary.as_ref().and_then(|s| s.value()).unwrap();
    assert_eq!(summary.get("confirmed"), 12);
    assert!(response.predictions.as_ref().is_some_and(|p| p.is_ok()));

    let failures = response.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, Aggregate::Trends);
    assert_eq!(failures[0].1.kind, ErrorKind::Unavailable);

    let encoded = serde_json::to_value(&response).unwrap();
    assert_eq!(encoded["trends"]["error"]["kind"], json!("unavailable"));
    assert_eq!(encoded["summary"]["confirmed"], 12);
    Ok(())
}

/// Test retries are exhausted and the failure is still isolated
#[tokio::test]
async fn test_partial_failure_through_retries() -> Result<()> {
    let store = RetryingStore::new(failing_trends(), fast_retry_policy(), 2);
    let engine = engine_with(store);
    let response = engine.query(&tenant(), SCOPE, &dashboard_request()).await?;

    assert!(response.summary.as_ref().is_some_and(|s| s.is_ok()));
    let trends_error = response.trends.as_ref().and_then(|t| t.error()).unwrap();
    assert_eq!(trends_error.kind, ErrorKind::Unavailable);
    assert!(trends_error.message.contains("connection refused"));
    Ok(())
}

/// Test whole-request errors are raised before any store call
#[tokio::test]
async fn test_forbidden_before_store() {
    let engine = engine_with(failing_trends());
    let request = QueryRequest::new("state_b", "2021-03-01", "2021-03-07", &[Aggregate::Trends]);
    let error = engine.query(&tenant(), SCOPE, &request).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Forbidden);
}

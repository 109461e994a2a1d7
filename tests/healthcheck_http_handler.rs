//! The HTTP adapter renders the aggregator's joined outcome as 200/503
//! (§4.10, §6).

use std::sync::Arc;

use axum::http::StatusCode;
use tower_resilience_healthcheck::{health_handler, HealthAggregator};

#[tokio::test]
async fn healthy_report_yields_200_with_a_status_body() {
    let aggregator = Arc::new(HealthAggregator::builder().check("database", || async { Ok(()) }).build());

    let resp = health_handler(aggregator).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn unhealthy_report_yields_503() {
    let aggregator = Arc::new(
        HealthAggregator::builder()
            .check("database", || async { Ok(()) })
            .check("downstream_api", || async { Err("timed out".into()) })
            .build(),
    );

    let resp = health_handler(aggregator).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}

//! HTTP handler adapter for [`HealthAggregator`] (§4.10).

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::aggregator::HealthAggregator;

/// Runs every registered check and renders the result as the handler's
/// response: 200 with `{"status":"healthy",...}` when every check passed,
/// else 503 with `{"status":"unhealthy",...}`.
///
/// ```
/// use axum::{routing::get, Router};
/// use std::sync::Arc;
/// use tower_resilience_healthcheck::{health_handler, HealthAggregator};
///
/// # fn build() -> Router {
/// let aggregator = Arc::new(HealthAggregator::builder().build());
/// Router::new().route(
///     "/healthz",
///     get(move || {
///         let aggregator = Arc::clone(&aggregator);
///         async move { health_handler(aggregator).await }
///     }),
/// )
/// # }
/// ```
pub async fn health_handler(aggregator: Arc<HealthAggregator>) -> Response {
    let report = aggregator.run().await;
    let status = if report.healthy() { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status, Json(report.to_json())).into_response()
}

//! gRPC health-check status adapter (§4.10).
//!
//! Mirrors the two statuses a `grpc.health.v1.Health/Check` responder needs,
//! without depending on a gRPC runtime: callers wire this enum into whatever
//! server stack they already run.

use crate::aggregator::HealthReport;

/// The two serving states a gRPC health responder reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServingStatus {
    Serving,
    NotServing,
}

impl From<&HealthReport> for ServingStatus {
    fn from(report: &HealthReport) -> Self {
        if report.healthy() {
            ServingStatus::Serving
        } else {
            ServingStatus::NotServing
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::CheckResult;

    #[test]
    fn healthy_report_is_serving() {
        let report = HealthReport {
            results: vec![CheckResult { name: "a".into(), healthy: true, error_string: None }],
        };
        assert_eq!(ServingStatus::from(&report), ServingStatus::Serving);
    }

    #[test]
    fn unhealthy_report_is_not_serving() {
        let report = HealthReport {
            results: vec![CheckResult { name: "a".into(), healthy: false, error_string: Some("x".into()) }],
        };
        assert_eq!(ServingStatus::from(&report), ServingStatus::NotServing);
    }
}

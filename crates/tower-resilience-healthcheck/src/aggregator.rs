//! Parallel named health checks (§4.10).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Serialize;
use tower_resilience_concurrency::{map, BoxError, Errors, Workers};

/// A single named health check. Stored as a boxed closure so a
/// [`HealthAggregator`] can hold a heterogeneous set of checks.
type CheckFn = Arc<dyn Fn() -> Pin<Box<dyn Future<Output = Result<(), BoxError>> + Send>> + Send + Sync>;

struct Check {
    name: String,
    run: CheckFn,
}

/// The outcome of one named check, as reported in a [`HealthReport`].
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub name: String,
    pub healthy: bool,
    #[serde(rename = "error", skip_serializing_if = "Option::is_none")]
    pub error_string: Option<String>,
}

/// The joined outcome of running every registered check once.
#[derive(Debug)]
pub struct HealthReport {
    pub results: Vec<CheckResult>,
}

impl HealthReport {
    /// `true` iff every check reported healthy.
    pub fn healthy(&self) -> bool {
        self.results.iter().all(|r| r.healthy)
    }

    /// Renders the body the HTTP and gRPC adapters agree on:
    /// `{"status": "healthy"|"unhealthy", "checks": [...]}`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "status": if self.healthy() { "healthy" } else { "unhealthy" },
            "checks": self.results,
        })
    }
}

/// Runs a fixed set of named checks in parallel and joins their outcomes.
///
/// Every check runs to completion regardless of its peers' outcomes: a slow
/// or failing check never prevents the others from reporting. Built on
/// [`tower_resilience_concurrency::map`], so the same never-discard-a-failure
/// guarantee applies here.
///
/// # Example
///
/// ```
/// use tower_resilience_healthcheck::HealthAggregator;
///
/// # async fn example() {
/// let aggregator = HealthAggregator::builder()
///     .check("database", || async { Ok(()) })
///     .check("cache", || async { Ok(()) })
///     .build();
///
/// let report = aggregator.run().await;
/// assert!(report.healthy());
/// # }
/// ```
#[derive(Clone)]
pub struct HealthAggregator {
    checks: Arc<Vec<Check>>,
    workers: Workers,
}

impl HealthAggregator {
    /// Starts building an aggregator with no checks registered.
    pub fn builder() -> HealthAggregatorBuilder {
        HealthAggregatorBuilder {
            checks: Vec::new(),
            workers: None,
        }
    }

    /// Runs every registered check in parallel and returns the joined report.
    ///
    /// A check that panics is treated the same as a check that fails: the
    /// panic becomes an error attributed to that check's name and every
    /// other check still runs to completion (`map` always waits for all
    /// in-flight tasks).
    pub async fn run(&self) -> HealthReport {
        let names: Vec<String> = self.checks.iter().map(|c| c.name.clone()).collect();
        let runs: Vec<CheckFn> = self.checks.iter().map(|c| Arc::clone(&c.run)).collect();

        let (_outcomes, errors): (Vec<Option<()>>, Option<Errors>) =
            map(runs, self.workers, |run| async move { (run)().await }).await;

        let failed_indices: std::collections::HashSet<usize> =
            errors.as_ref().map(|e| e.failures.iter().map(|f| f.index).collect()).unwrap_or_default();
        let messages: std::collections::HashMap<usize, String> = errors
            .map(|e| e.failures.into_iter().map(|f| (f.index, f.error.to_string())).collect())
            .unwrap_or_default();

        let results = names
            .into_iter()
            .enumerate()
            .map(|(index, name)| {
                let healthy = !failed_indices.contains(&index);
                let error_string = messages.get(&index).cloned();
                #[cfg(feature = "tracing")]
                if !healthy {
                    tracing::warn!(check = %name, error = error_string.as_deref().unwrap_or(""), "health check failed");
                }
                #[cfg(feature = "metrics")]
                metrics::counter!("healthcheck_runs_total", "check" => name.clone(), "healthy" => healthy.to_string()).increment(1);
                CheckResult { name, healthy, error_string }
            })
            .collect();

        HealthReport { results }
    }
}

/// Builder for [`HealthAggregator`].
pub struct HealthAggregatorBuilder {
    checks: Vec<Check>,
    workers: Option<Workers>,
}

impl HealthAggregatorBuilder {
    /// Registers a named check. `name` appears in the report and in any
    /// joined error message.
    pub fn check<F, Fut>(mut self, name: impl Into<String>, check: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.checks.push(Check {
            name: name.into(),
            run: Arc::new(move || Box::pin(check())),
        });
        self
    }

    /// Bounds how many checks run concurrently. Defaults to the host's
    /// available parallelism, which is effectively unbounded for the small
    /// check counts this is meant for.
    pub fn workers(mut self, workers: Workers) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Builds the aggregator.
    pub fn build(self) -> HealthAggregator {
        HealthAggregator {
            checks: Arc::new(self.checks),
            workers: self.workers.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn all_healthy_reports_healthy() {
        let aggregator = HealthAggregator::builder()
            .check("a", || async { Ok(()) })
            .check("b", || async { Ok(()) })
            .build();

        let report = aggregator.run().await;
        assert!(report.healthy());
        assert_eq!(report.results.len(), 2);
    }

    #[tokio::test]
    async fn one_failure_marks_only_that_check_unhealthy() {
        let aggregator = HealthAggregator::builder()
            .check("ok", || async { Ok(()) })
            .check("broken", || async { Err("connection refused".into()) })
            .build();

        let report = aggregator.run().await;
        assert!(!report.healthy());

        let ok = report.results.iter().find(|r| r.name == "ok").unwrap();
        assert!(ok.healthy);
        assert!(ok.error_string.is_none());

        let broken = report.results.iter().find(|r| r.name == "broken").unwrap();
        assert!(!broken.healthy);
        assert_eq!(broken.error_string.as_deref(), Some("connection refused"));
    }

    #[tokio::test]
    async fn every_check_runs_even_when_one_fails() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let ran = Arc::new(AtomicUsize::new(0));

        let r1 = Arc::clone(&ran);
        let r2 = Arc::clone(&ran);
        let aggregator = HealthAggregator::builder()
            .check("fails", move || {
                let r1 = Arc::clone(&r1);
                async move {
                    r1.fetch_add(1, Ordering::SeqCst);
                    Err("boom".into())
                }
            })
            .check("succeeds", move || {
                let r2 = Arc::clone(&r2);
                async move {
                    r2.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .build();

        aggregator.run().await;
        assert_eq!(ran.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn no_checks_is_trivially_healthy() {
        let report = HealthAggregator::builder().build().run().await;
        assert!(report.healthy());
        assert!(report.results.is_empty());
    }

    #[test]
    fn report_json_shape() {
        let report = HealthReport {
            results: vec![CheckResult { name: "db".into(), healthy: true, error_string: None }],
        };
        let json = report.to_json();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["checks"][0]["name"], "db");
    }
}

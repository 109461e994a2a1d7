use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::work::{Errors, Failure};
use crate::workers::Workers;

/// Runs `f` over every item in `items`, bounded to `workers` concurrent
/// tasks, and collects results aligned with the input order.
///
/// Always waits for every in-flight task to finish, even once some have
/// failed. `results[i]` is `Some` iff `items[i]`'s task succeeded;
/// the returned `Errors`, if any, records every failure with its original
/// index.
pub async fn map<T, R, E, F, Fut>(items: Vec<T>, workers: Workers, f: F) -> (Vec<Option<R>>, Option<Errors>)
where
    T: Send + 'static,
    R: Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
{
    let n = items.len();
    let semaphore = Arc::new(Semaphore::new(workers.get()));
    let f = Arc::new(f);
    let mut set = JoinSet::new();

    for (index, item) in items.into_iter().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let f = Arc::clone(&f);
        set.spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore is never closed");
            let outcome = f(item).await;
            #[cfg(feature = "tracing")]
            if outcome.is_err() {
                tracing::debug!(index, "map task failed");
            }
            (index, outcome)
        });
    }

    let mut results: Vec<Option<R>> = (0..n).map(|_| None).collect();
    let mut failures = Vec::new();

    while let Some(joined) = set.join_next().await {
        let (index, outcome) = joined.expect("map task panicked");
        match outcome {
            Ok(value) => results[index] = Some(value),
            Err(error) => failures.push(Failure {
                index,
                error: Box::new(error),
            }),
        }
    }

    (results, Errors::from_failures(failures))
}

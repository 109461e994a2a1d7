use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::work::{Errors, Failure};
use crate::workers::Workers;

/// Runs every task in `tasks` to completion, bounded to `workers` concurrent
/// tasks, with no ordered output and no first-error short-circuit.
///
/// Unlike [`crate::map`], there's no per-item value to return — only whether
/// each task succeeded. Every task runs regardless of its peers' outcomes.
pub async fn all<Fut, E>(tasks: Vec<Fut>, workers: Workers) -> Option<Errors>
where
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    let semaphore = Arc::new(Semaphore::new(workers.get()));
    let mut set = JoinSet::new();

    for (index, task) in tasks.into_iter().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        set.spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore is never closed");
            (index, task.await)
        });
    }

    let mut failures = Vec::new();
    while let Some(joined) = set.join_next().await {
        let (index, outcome) = joined.expect("all task panicked");
        if let Err(error) = outcome {
            failures.push(Failure {
                index,
                error: Box::new(error),
            });
        }
    }

    Errors::from_failures(failures)
}

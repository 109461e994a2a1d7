use std::future::Future;
use std::pin::Pin;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::work::{Errors, Failure};

/// A future produced by a [`RaceTask`], boxed so tasks of different shapes
/// can race against each other.
pub type BoxFuture<R, E> = Pin<Box<dyn Future<Output = Result<R, E>> + Send>>;

/// A factory that builds a racing task's future from the shared cancellation
/// token, so the task can observe cancellation once a sibling has won.
pub type RaceTask<R, E> = Box<dyn FnOnce(CancellationToken) -> BoxFuture<R, E> + Send>;

/// Runs every task in `tasks` against a shared cancellable sub-context. The
/// first task to succeed cancels the token and aborts the remainder; its
/// value is returned. If every task fails, returns the aggregated
/// [`Errors`].
pub async fn race<R, E>(tasks: Vec<RaceTask<R, E>>) -> Result<R, Errors>
where
    R: Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    let token = CancellationToken::new();
    let mut set = JoinSet::new();

    for (index, task) in tasks.into_iter().enumerate() {
        let token = token.clone();
        set.spawn(async move { (index, task(token).await) });
    }

    let mut failures = Vec::new();
    while let Some(joined) = set.join_next().await {
        let (index, outcome) = joined.expect("race task panicked");
        match outcome {
            Ok(value) => {
                token.cancel();
                set.abort_all();
                return Ok(value);
            }
            Err(error) => failures.push(Failure {
                index,
                error: Box::new(error),
            }),
        }
    }

    Err(Errors::from_failures(failures).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn first_success_wins_and_cancels_the_rest() {
        let loser_observed_cancel = Arc::new(AtomicBool::new(false));
        let loser_flag = Arc::clone(&loser_observed_cancel);

        let fast: RaceTask<&'static str, std::io::Error> = Box::new(|_token| {
            Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                Ok("fast")
            })
        });
        let slow: RaceTask<&'static str, std::io::Error> = Box::new(move |token| {
            let flag = loser_flag;
            Box::pin(async move {
                token.cancelled().await;
                flag.store(true, Ordering::SeqCst);
                Err(std::io::Error::other("cancelled"))
            })
        });

        let winner = race(vec![fast, slow]).await.expect("one task should win");
        assert_eq!(winner, "fast");
        assert!(loser_observed_cancel.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn all_failing_returns_aggregated_errors() {
        let a: RaceTask<(), std::io::Error> = Box::new(|_| Box::pin(async { Err(std::io::Error::other("a")) }));
        let b: RaceTask<(), std::io::Error> = Box::new(|_| Box::pin(async { Err(std::io::Error::other("b")) }));

        let err = race(vec![a, b]).await.unwrap_err();
        assert_eq!(err.len(), 2);
    }
}

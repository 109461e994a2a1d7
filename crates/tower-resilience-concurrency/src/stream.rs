use std::future::Future;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;

use crate::work::WorkResult;
use crate::workers::Workers;

/// Lazily consumes `input`, bounded to `workers` concurrent tasks, and
/// produces a stream of [`WorkResult`] tagged with the order each item was
/// received from `input`.
///
/// Acquires a semaphore permit before spawning each item's task. When
/// `cancel` fires, stops pulling new items from `input` but lets in-flight
/// tasks finish; the output stream closes once both the input is exhausted
/// (or cancelled) and every in-flight task has completed.
pub fn stream<T, R, E, F, Fut, In>(
    input: In,
    workers: Workers,
    cancel: CancellationToken,
    f: F,
) -> impl Stream<Item = WorkResult<R, E>>
where
    In: Stream<Item = T> + Send + 'static,
    T: Send + 'static,
    R: Send + 'static,
    E: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let semaphore = Arc::new(Semaphore::new(workers.get()));
    let f = Arc::new(f);

    tokio::spawn(async move {
        let mut input = Box::pin(input);
        let mut set: JoinSet<()> = JoinSet::new();
        let mut next_index = 0usize;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                item = input.next() => {
                    let Some(item) = item else { break };
                    let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else { break };
                    let f = Arc::clone(&f);
                    let tx = tx.clone();
                    let index = next_index;
                    next_index += 1;

                    set.spawn(async move {
                        let result = f(item).await;
                        drop(permit);
                        let _ = tx.send(WorkResult { index, result });
                    });
                }
            }
        }

        while set.join_next().await.is_some() {}
    });

    UnboundedReceiverStream::new(rx)
}

//! Components run under a [`crate::Lifecycle`].

use std::error::Error as StdError;
use std::future::Future;
use std::pin::Pin;

use tokio_util::sync::CancellationToken;

type ComponentFuture = Pin<Box<dyn Future<Output = Result<(), Box<dyn StdError + Send + Sync>>> + Send>>;

/// A named unit of work run concurrently with its siblings under
/// [`crate::Lifecycle::run`].
///
/// The component receives a [`CancellationToken`] derived from the run's
/// shared context: it should watch the token and wind down promptly once
/// it fires, whether because a sibling failed or because the process
/// received a termination signal.
pub struct Component {
    pub(crate) name: String,
    pub(crate) run: Box<dyn FnOnce(CancellationToken) -> ComponentFuture + Send>,
}

impl Component {
    /// Wraps a closure as a named component.
    ///
    /// # Examples
    ///
    /// ```
    /// use tower_resilience_lifecycle::Component;
    ///
    /// let _component = Component::new("http-server", |cancel| async move {
    ///     cancel.cancelled().await;
    ///     Ok::<(), std::io::Error>(())
    /// });
    /// ```
    pub fn new<F, Fut, E>(name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: StdError + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            run: Box::new(move |token| Box::pin(async move { f(token).await.map_err(|e| Box::new(e) as Box<dyn StdError + Send + Sync>) })),
        }
    }
}

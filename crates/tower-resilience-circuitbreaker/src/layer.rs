use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tower::Layer;
use tower::Service;

use crate::circuit::CircuitBreaker;
use crate::config::CircuitBreakerConfigBuilder;
use crate::error::CircuitBreakerError;

/// A Tower [`Layer`] that wraps a service with a named circuit breaker.
#[derive(Clone)]
pub struct CircuitBreakerLayer {
    breaker: Arc<CircuitBreaker>,
}

impl CircuitBreakerLayer {
    /// Starts building a layer for the breaker named `name`.
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::default()
    }

    pub(crate) fn from_breaker(breaker: Arc<CircuitBreaker>) -> Self {
        Self { breaker }
    }

    /// The underlying breaker, for state inspection or manual `allow`/`record`.
    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }
}

impl<S> Layer<S> for CircuitBreakerLayer {
    type Service = CircuitBreakerService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CircuitBreakerService {
            inner,
            breaker: Arc::clone(&self.breaker),
        }
    }
}

/// A Tower [`Service`] that checks a circuit breaker before calling the
/// wrapped service and records the outcome afterward.
#[derive(Clone)]
pub struct CircuitBreakerService<S> {
    inner: S,
    breaker: Arc<CircuitBreaker>,
}

impl<S> CircuitBreakerService<S> {
    /// The breaker guarding this service.
    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }
}

impl<S, Req> Service<Req> for CircuitBreakerService<S>
where
    S: Service<Req> + Clone + Send + 'static,
    S::Future: Send + 'static,
    Req: Send + 'static,
{
    type Response = S::Response;
    type Error = CircuitBreakerError<S::Error>;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(CircuitBreakerError::Inner)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let breaker = Arc::clone(&self.breaker);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            breaker.allow()?;

            let result = inner.call(req).await;
            breaker.record(result.is_ok());
            result.map_err(CircuitBreakerError::Inner)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::CircuitState;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tower::{service_fn, ServiceExt};

    #[tokio::test]
    #[serial_test::serial]
    async fn rejects_without_calling_inner_once_open() {
        crate::circuit::CircuitBreakerRegistry::reset();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);

        let layer = CircuitBreakerLayer::builder()
            .name("layer-test-a")
            .threshold(1)
            .reset_timeout(Duration::from_secs(60))
            .build();

        let svc = service_fn(move |_: ()| {
            let calls = Arc::clone(&calls_clone);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), &'static str>("boom")
            }
        });
        let mut svc = layer.layer(svc);

        assert!(svc.ready().await.unwrap().call(()).await.is_err());
        assert_eq!(svc.breaker().state(), CircuitState::Open);

        let err = svc.ready().await.unwrap().call(()).await.unwrap_err();
        assert!(err.is_circuit_open());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

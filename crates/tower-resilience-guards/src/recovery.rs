//! Panic recovery for inbound handlers (§4.11).
//!
//! Wraps the innermost handler: a panic is caught, logged, and converted to
//! a 500 Problem Detail. Because this guard sits directly around the
//! handler (the data-flow in §2 places it innermost, just before the
//! handler itself), a panic always happens before any bytes of *this*
//! response have been produced, so replacing the result with a 500 never
//! risks mutating an already-started response.

use std::any::Any;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use futures::future::BoxFuture;
use tower::{Layer, Service};
use tower_resilience_core::error::render_problem;
use tower_resilience_core::events::EventListeners;
use tower_resilience_core::ServiceError;

use crate::events::GuardEvent;

#[cfg(feature = "metrics")]
use metrics::counter;

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&'static str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

fn internal_error_response() -> Response<Body> {
    let err = ServiceError::internal("internal server error");
    let (status, json) = render_problem(&err, "", "");
    let body = serde_json::to_vec(&json).unwrap_or_default();
    Response::builder()
        .status(StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR))
        .header("content-type", "application/problem+json")
        .body(Body::from(body))
        .expect("problem response is well-formed")
}

/// Tower layer catching panics from the inner service and substituting a
/// 500 Problem Detail response.
pub struct RecoveryLayer {
    name: String,
    event_listeners: Arc<EventListeners<GuardEvent>>,
}

impl RecoveryLayer {
    /// Builds a layer named `name`, used in logs and emitted events.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            event_listeners: Arc::new(EventListeners::new()),
        }
    }

    /// Registers a listener observing [`GuardEvent::PanicRecovered`] events.
    pub fn on_event<L>(mut self, listener: L) -> Self
    where
        L: tower_resilience_core::events::EventListener<GuardEvent> + 'static,
    {
        let mut listeners = EventListeners::new();
        listeners.add(listener);
        self.event_listeners = Arc::new(listeners);
        self
    }
}

impl Clone for RecoveryLayer {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            event_listeners: Arc::clone(&self.event_listeners),
        }
    }
}

impl<S> Layer<S> for RecoveryLayer {
    type Service = Recovery<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Recovery {
            inner,
            name: self.name.clone(),
            event_listeners: Arc::clone(&self.event_listeners),
        }
    }
}

/// Service produced by [`RecoveryLayer`].
#[derive(Clone)]
pub struct Recovery<S> {
    inner: S,
    name: String,
    event_listeners: Arc<EventListeners<GuardEvent>>,
}

impl<S, B> Service<Request<B>> for Recovery<S>
where
    S: Service<Request<B>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    B: Send + 'static,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let mut inner = self.inner.clone();
        let name = self.name.clone();
        let event_listeners = Arc::clone(&self.event_listeners);

        Box::pin(async move {
            let handle = tokio::spawn(async move { inner.call(req).await });

            match handle.await {
                Ok(result) => result,
                Err(join_err) if join_err.is_panic() => {
                    let message = panic_message(join_err.into_panic().as_ref());

                    #[cfg(feature = "tracing")]
                    tracing::error!(guard = %name, panic_message = %message, "panic recovered from handler");

                    #[cfg(feature = "metrics")]
                    counter!("recovery_panics_total", "guard" => name.clone()).increment(1);

                    event_listeners.emit(&GuardEvent::PanicRecovered {
                        pattern_name: name,
                        timestamp: Instant::now(),
                        message,
                    });

                    Ok(internal_error_response())
                }
                Err(_cancelled) => Ok(internal_error_response()),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use tower::{service_fn, ServiceExt};

    #[tokio::test]
    async fn forwards_successful_response() {
        let svc = service_fn(|_req: Request<Body>| async {
            Ok::<_, std::convert::Infallible>(Response::new(Body::empty()))
        });
        let mut guard = RecoveryLayer::new("test").layer(svc);

        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let resp = guard.ready().await.unwrap().call(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn converts_panic_to_500() {
        let svc = service_fn(|_req: Request<Body>| async {
            panic!("boom");
            #[allow(unreachable_code)]
            Ok::<_, std::convert::Infallible>(Response::new(Body::empty()))
        });
        let mut guard = RecoveryLayer::new("test").layer(svc);

        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        // The inner panic is caught inside the guard's own task, so this
        // call must not itself unwind.
        let resp = std::panic::AssertUnwindSafe(guard.ready().await.unwrap().call(req))
            .catch_unwind()
            .await
            .expect("guard call should not panic")
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

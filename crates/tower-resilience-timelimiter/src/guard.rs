//! HTTP-shaped timeout guard for inbound requests.
//!
//! [`TimeoutGuard`] is shaped for axum: on timeout it substitutes a 504
//! Problem Detail response directly instead of returning an error, and a
//! panicking handler is re-raised on the calling task so an outer recovery
//! layer can still observe it.
//!
//! The inner handler always runs to completion in the background even
//! after the guard gives up waiting on it; there is no way to abort
//! arbitrary `Future`s in-flight, only to stop waiting for them. This
//! mirrors goroutine-leak-until-done semantics rather than true
//! cancellation — handlers that need prompt cancellation must watch the
//! request's own cancellation signal.

use std::task::{Context, Poll};
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use futures::future::BoxFuture;
use tower::{Layer, Service};
use tower_resilience_core::error::render_problem;
use tower_resilience_core::ServiceError;

/// A deadline a caller has already imposed upstream (e.g. a propagated
/// gRPC deadline). When present on the request extensions and tighter
/// than the guard's configured duration, it wins.
#[derive(Debug, Clone, Copy)]
pub struct RequestDeadline(pub Duration);

/// Tower layer that bounds how long the inner service may take to produce
/// a response before the guard substitutes a 504 of its own.
#[derive(Clone)]
pub struct TimeoutGuardLayer {
    duration: Duration,
}

impl TimeoutGuardLayer {
    /// Creates a layer with the given default deadline. A request carrying
    /// a tighter [`RequestDeadline`] extension overrides it.
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

impl<S> Layer<S> for TimeoutGuardLayer {
    type Service = TimeoutGuard<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TimeoutGuard {
            inner,
            duration: self.duration,
        }
    }
}

/// Service produced by [`TimeoutGuardLayer`].
#[derive(Clone)]
pub struct TimeoutGuard<S> {
    inner: S,
    duration: Duration,
}

fn timeout_response() -> Response<Body> {
    let err = ServiceError::timeout("handler did not complete before the deadline");
    let (status, json) = render_problem(&err, "", "");
    let body = serde_json::to_vec(&json).unwrap_or_default();
    Response::builder()
        .status(StatusCode::from_u16(status).unwrap_or(StatusCode::GATEWAY_TIMEOUT))
        .header("content-type", "application/problem+json")
        .body(Body::from(body))
        .expect("problem response is well-formed")
}

impl<S, B> Service<Request<B>> for TimeoutGuard<S>
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
        let deadline = req
            .extensions()
            .get::<RequestDeadline>()
            .map(|d| d.0)
            .filter(|d| *d < self.duration)
            .unwrap_or(self.duration);

        let mut inner = self.inner.clone();
        Box::pin(async move {
            let handle = tokio::spawn(async move { inner.call(req).await });

            tokio::select! {
                result = handle => match result {
                    Ok(inner_result) => inner_result,
                    Err(join_err) if join_err.is_panic() => {
                        std::panic::resume_unwind(join_err.into_panic())
                    }
                    Err(_cancelled) => Ok(timeout_response()),
                },
                _ = tokio::time::sleep(deadline) => Ok(timeout_response()),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use futures::FutureExt;
    use tower::{service_fn, ServiceExt};

    fn request() -> Request<Body> {
        Request::builder().uri("/").body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn forwards_response_within_deadline() {
        let svc = service_fn(|_req: Request<Body>| async {
            Ok::<_, std::convert::Infallible>(Response::new(Body::empty()))
        });
        let mut guard = TimeoutGuardLayer::new(Duration::from_millis(100)).layer(svc);

        let resp = guard.ready().await.unwrap().call(request()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn substitutes_504_on_timeout() {
        let svc = service_fn(|_req: Request<Body>| async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok::<_, std::convert::Infallible>(Response::new(Body::empty()))
        });
        let mut guard = TimeoutGuardLayer::new(Duration::from_millis(10)).layer(svc);

        let resp = guard.ready().await.unwrap().call(request()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[tokio::test]
    async fn tighter_caller_deadline_wins() {
        let svc = service_fn(|_req: Request<Body>| async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok::<_, std::convert::Infallible>(Response::new(Body::empty()))
        });
        let mut guard = TimeoutGuardLayer::new(Duration::from_secs(10)).layer(svc);

        let mut req = request();
        req.extensions_mut().insert(RequestDeadline(Duration::from_millis(5)));

        let resp = guard.ready().await.unwrap().call(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[tokio::test]
    async fn panic_in_handler_is_re_raised() {
        let svc = service_fn(|_req: Request<Body>| async {
            panic!("boom");
            #[allow(unreachable_code)]
            Ok::<_, std::convert::Infallible>(Response::new(Body::empty()))
        });
        let mut guard = TimeoutGuardLayer::new(Duration::from_secs(10)).layer(svc);

        let result = std::panic::AssertUnwindSafe(guard.ready().await.unwrap().call(request()))
            .catch_unwind()
            .await;
        assert!(result.is_err());
    }
}

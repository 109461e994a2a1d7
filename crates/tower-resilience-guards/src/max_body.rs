//! Inbound body-size cap (§4.7).
//!
//! Rejects up front when the declared `Content-Length` already exceeds the
//! cap, and additionally wraps the body in a reader that fails once the
//! actual byte count crosses the cap — a request can lie about, or omit,
//! its `Content-Length`.

use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use futures::future::BoxFuture;
use http_body_util::Limited;
use tower::{Layer, Service};
use tower_resilience_core::error::render_problem;
use tower_resilience_core::ServiceError;

use crate::error::ConfigError;

/// Tower layer enforcing a maximum request body size.
#[derive(Clone, Copy)]
pub struct MaxBodyLayer {
    cap: usize,
}

impl MaxBodyLayer {
    /// Builds a layer with the given cap, in bytes. `cap` must be greater
    /// than zero.
    pub fn new(cap: usize) -> Result<Self, ConfigError> {
        if cap == 0 {
            return Err(ConfigError("body cap must be greater than zero".to_string()));
        }
        Ok(Self { cap })
    }
}

impl<S> Layer<S> for MaxBodyLayer {
    type Service = MaxBody<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MaxBody { inner, cap: self.cap }
    }
}

/// Service produced by [`MaxBodyLayer`].
#[derive(Clone)]
pub struct MaxBody<S> {
    inner: S,
    cap: usize,
}

fn payload_too_large_response(cap: usize) -> Response<Body> {
    let err = ServiceError::payload_too_large(format!("request body exceeds {cap} byte limit"));
    let (status, json) = render_problem(&err, "", "");
    let body = serde_json::to_vec(&json).unwrap_or_default();
    Response::builder()
        .status(StatusCode::from_u16(status).unwrap_or(StatusCode::PAYLOAD_TOO_LARGE))
        .header("content-type", "application/problem+json")
        .body(Body::from(body))
        .expect("problem response is well-formed")
}

impl<S> Service<Request<Body>> for MaxBody<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let declared = req
            .headers()
            .get("content-length")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok());

        if let Some(len) = declared {
            if len > self.cap {
                let response = payload_too_large_response(self.cap);
                return Box::pin(async move { Ok(response) });
            }
        }

        let cap = self.cap;
        let (parts, body) = req.into_parts();
        let limited = Body::new(Limited::new(body, cap));
        let req = Request::from_parts(parts, limited);

        let mut inner = self.inner.clone();
        Box::pin(async move { inner.call(req).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower::{service_fn, ServiceExt};

    fn ok_service() -> impl Service<Request<Body>, Response = Response<Body>, Error = std::convert::Infallible> + Clone
    {
        service_fn(|_req: Request<Body>| async { Ok(Response::new(Body::empty())) })
    }

    #[test]
    fn zero_cap_is_rejected() {
        assert!(MaxBodyLayer::new(0).is_err());
    }

    #[tokio::test]
    async fn declared_length_over_cap_is_rejected_without_reaching_inner() {
        let mut svc = MaxBodyLayer::new(10).unwrap().layer(ok_service());
        let req = Request::builder()
            .uri("/")
            .header("content-length", "100")
            .body(Body::from(vec![0u8; 100]))
            .unwrap();
        let resp = svc.ready().await.unwrap().call(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn body_within_cap_passes_through() {
        let mut svc = MaxBodyLayer::new(1024).unwrap().layer(ok_service());
        let req = Request::builder()
            .uri("/")
            .header("content-length", "5")
            .body(Body::from("hello"))
            .unwrap();
        let resp = svc.ready().await.unwrap().call(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}

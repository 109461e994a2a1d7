//! Stable per-request correlation ID (§4.11).
//!
//! Generates a v4-like 128-bit identifier on entry, stashes it in the
//! request extensions, and echoes it as the `X-Request-ID` response
//! header. If an upstream hop already set the header, it's honored instead
//! of generating a new one, so the ID stays stable across a service mesh.

use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use std::time::{SystemTime, UNIX_EPOCH};

use axum::body::Body;
use axum::http::{HeaderValue, Request, Response};
use futures::future::BoxFuture;
use tower::{Layer, Service};

static FALLBACK_COUNTER: AtomicU64 = AtomicU64::new(0);

/// The request ID assigned by [`RequestIdLayer`], stored in request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn generate_id() -> String {
    // uuid's CSPRNG-backed v4 generator is infallible in practice but can
    // theoretically panic if the OS RNG is unavailable; catch that and fall
    // back to a counter + timestamp so request tagging never takes down
    // the request path itself.
    let result = std::panic::catch_unwind(uuid::Uuid::new_v4);
    match result {
        Ok(id) => id.to_string(),
        Err(_) => {
            let n = FALLBACK_COUNTER.fetch_add(1, Ordering::Relaxed);
            let nanos = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or(0);
            format!("fallback-{n}-{nanos}")
        }
    }
}

/// Tower layer assigning a stable request ID to every inbound request.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestIdLayer;

impl<S> Layer<S> for RequestIdLayer {
    type Service = RequestIdGuard<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestIdGuard { inner }
    }
}

/// Service produced by [`RequestIdLayer`].
#[derive(Clone)]
pub struct RequestIdGuard<S> {
    inner: S,
}

impl<S, B> Service<Request<B>> for RequestIdGuard<S>
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

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        let id = req
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(ToOwned::to_owned)
            .unwrap_or_else(generate_id);

        req.extensions_mut().insert(RequestId(id.clone()));

        let mut inner = self.inner.clone();
        Box::pin(async move {
            let mut resp = inner.call(req).await?;
            if let Ok(value) = HeaderValue::from_str(&id) {
                resp.headers_mut().insert("x-request-id", value);
            }
            Ok(resp)
        })
    }
}

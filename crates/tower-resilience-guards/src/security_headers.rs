//! Security-header injection (§4.7).
//!
//! Sets the usual hardening headers on every response; HSTS is only emitted
//! when the inbound request is confirmed HTTPS, since advertising it over
//! plain HTTP is meaningless and can be actively wrong behind a
//! misconfigured proxy.

use std::task::{Context, Poll};
use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderValue, Request, Response};
use futures::future::BoxFuture;
use tower::{Layer, Service};

/// HSTS parameters, emitted only over confirmed HTTPS.
#[derive(Debug, Clone)]
pub struct HstsConfig {
    /// `max-age` directive.
    pub max_age: Duration,
    /// Whether to add `includeSubDomains`.
    pub include_subdomains: bool,
    /// Whether to add `preload`.
    pub preload: bool,
}

impl Default for HstsConfig {
    /// Two-year max-age, includeSubDomains, preload — the spec's defaults (§4.7).
    fn default() -> Self {
        Self {
            max_age: Duration::from_secs(2 * 365 * 24 * 3600),
            include_subdomains: true,
            preload: true,
        }
    }
}

impl HstsConfig {
    fn header_value(&self) -> HeaderValue {
        let mut value = format!("max-age={}", self.max_age.as_secs());
        if self.include_subdomains {
            value.push_str("; includeSubDomains");
        }
        if self.preload {
            value.push_str("; preload");
        }
        HeaderValue::from_str(&value).expect("hsts header value is well-formed")
    }
}

/// Security headers to inject into every response. Any field left `None`
/// is not emitted.
#[derive(Debug, Clone, Default)]
pub struct SecurityHeadersConfig {
    pub content_security_policy: Option<String>,
    pub x_content_type_options: Option<String>,
    pub x_frame_options: Option<String>,
    pub referrer_policy: Option<String>,
    pub permissions_policy: Option<String>,
    pub cross_origin_opener_policy: Option<String>,
    pub hsts: Option<HstsConfig>,
    /// Trust a `X-Forwarded-Proto: https` header as confirmation of HTTPS,
    /// in addition to the request URI's own scheme. Only enable this
    /// behind a proxy that's known to set the header itself.
    pub trust_forwarded_proto: bool,
}

impl SecurityHeadersConfig {
    /// A reasonable baseline: nosniff, DENY framing, strict-origin referrer
    /// policy, same-origin popup isolation, and HSTS with default
    /// parameters. CSP and Permissions-Policy are left unset since they are
    /// application-specific.
    pub fn recommended() -> Self {
        Self {
            content_security_policy: None,
            x_content_type_options: Some("nosniff".to_string()),
            x_frame_options: Some("DENY".to_string()),
            referrer_policy: Some("strict-origin-when-cross-origin".to_string()),
            permissions_policy: None,
            cross_origin_opener_policy: Some("same-origin".to_string()),
            hsts: Some(HstsConfig::default()),
            trust_forwarded_proto: false,
        }
    }
}

/// Tower layer applying [`SecurityHeadersConfig`] to every response.
#[derive(Clone)]
pub struct SecurityHeadersLayer {
    config: SecurityHeadersConfig,
}

impl SecurityHeadersLayer {
    /// Builds a layer from the given configuration.
    pub fn new(config: SecurityHeadersConfig) -> Self {
        Self { config }
    }
}

impl<S> Layer<S> for SecurityHeadersLayer {
    type Service = SecurityHeaders<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SecurityHeaders {
            inner,
            config: self.config.clone(),
        }
    }
}

/// Service produced by [`SecurityHeadersLayer`].
#[derive(Clone)]
pub struct SecurityHeaders<S> {
    inner: S,
    config: SecurityHeadersConfig,
}

fn is_https<B>(req: &Request<B>, trust_forwarded_proto: bool) -> bool {
    if req.uri().scheme_str() == Some("https") {
        return true;
    }
    if trust_forwarded_proto {
        if let Some(proto) = req.headers().get("x-forwarded-proto").and_then(|v| v.to_str().ok()) {
            return proto.eq_ignore_ascii_case("https");
        }
    }
    false
}

impl<S, B> Service<Request<B>> for SecurityHeaders<S>
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
        let https = is_https(&req, self.config.trust_forwarded_proto);
        let config = self.config.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let mut resp = inner.call(req).await?;
            let headers = resp.headers_mut();

            if let Some(csp) = &config.content_security_policy {
                if let Ok(v) = HeaderValue::from_str(csp) {
                    headers.insert("content-security-policy", v);
                }
            }
            if let Some(v) = &config.x_content_type_options {
                if let Ok(v) = HeaderValue::from_str(v) {
                    headers.insert("x-content-type-options", v);
                }
            }
            if let Some(v) = &config.x_frame_options {
                if let Ok(v) = HeaderValue::from_str(v) {
                    headers.insert("x-frame-options", v);
                }
            }
            if let Some(v) = &config.referrer_policy {
                if let Ok(v) = HeaderValue::from_str(v) {
                    headers.insert("referrer-policy", v);
                }
            }
            if let Some(v) = &config.permissions_policy {
                if let Ok(v) = HeaderValue::from_str(v) {
                    headers.insert("permissions-policy", v);
                }
            }
            if let Some(v) = &config.cross_origin_opener_policy {
                if let Ok(v) = HeaderValue::from_str(v) {
                    headers.insert("cross-origin-opener-policy", v);
                }
            }
            if https {
                if let Some(hsts) = &config.hsts {
                    headers.insert("strict-transport-security", hsts.header_value());
                }
            }

            Ok(resp)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use tower::{service_fn, ServiceExt};

    fn ok_service() -> impl Service<Request<Body>, Response = Response<Body>, Error = std::convert::Infallible> + Clone
    {
        service_fn(|_req: Request<Body>| async { Ok(Response::new(Body::empty())) })
    }

    #[tokio::test]
    async fn sets_configured_headers() {
        let config = SecurityHeadersConfig::recommended();
        let mut svc = SecurityHeadersLayer::new(config).layer(ok_service());

        let req = Request::builder().uri("https://example.com/").body(Body::empty()).unwrap();
        let resp = svc.ready().await.unwrap().call(req).await.unwrap();

        assert_eq!(resp.headers().get("x-content-type-options").unwrap(), "nosniff");
        assert_eq!(resp.headers().get("x-frame-options").unwrap(), "DENY");
        assert!(resp.headers().get("strict-transport-security").is_some());
    }

    #[tokio::test]
    async fn hsts_omitted_over_plain_http() {
        let config = SecurityHeadersConfig::recommended();
        let mut svc = SecurityHeadersLayer::new(config).layer(ok_service());

        let req = Request::builder().uri("http://example.com/").body(Body::empty()).unwrap();
        let resp = svc.ready().await.unwrap().call(req).await.unwrap();

        assert!(resp.headers().get("strict-transport-security").is_none());
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn hsts_emitted_on_trusted_forwarded_proto() {
        let mut config = SecurityHeadersConfig::recommended();
        config.trust_forwarded_proto = true;
        let mut svc = SecurityHeadersLayer::new(config).layer(ok_service());

        let req = Request::builder()
            .uri("http://example.com/")
            .header("x-forwarded-proto", "https")
            .body(Body::empty())
            .unwrap();
        let resp = svc.ready().await.unwrap().call(req).await.unwrap();

        assert!(resp.headers().get("strict-transport-security").is_some());
    }

    #[tokio::test]
    async fn untrusted_forwarded_proto_is_ignored() {
        let config = SecurityHeadersConfig::recommended();
        let mut svc = SecurityHeadersLayer::new(config).layer(ok_service());

        let req = Request::builder()
            .uri("http://example.com/")
            .header("x-forwarded-proto", "https")
            .body(Body::empty())
            .unwrap();
        let resp = svc.ready().await.unwrap().call(req).await.unwrap();

        assert!(resp.headers().get("strict-transport-security").is_none());
    }
}

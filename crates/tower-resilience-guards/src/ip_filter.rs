//! CIDR allow/deny IP filter (§4.7).

use std::net::IpAddr;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, Response, StatusCode};
use futures::future::BoxFuture;
use ipnet::IpNet;
use tower::{Layer, Service};
use tower_resilience_core::error::render_problem;
use tower_resilience_core::events::EventListeners;
use tower_resilience_core::ServiceError;

use crate::error::ConfigError;
use crate::events::GuardEvent;

#[cfg(feature = "metrics")]
use metrics::counter;

fn peer_ip<B>(req: &Request<B>) -> Option<IpAddr> {
    req.extensions().get::<ConnectInfo<std::net::SocketAddr>>().map(|ci| ci.0.ip())
}

/// Configuration for [`IpFilterLayer`], pre-parsed at construction (§4.7).
pub struct IpFilterConfig {
    name: String,
    deny: Vec<IpNet>,
    allow: Vec<IpNet>,
    event_listeners: EventListeners<GuardEvent>,
}

impl IpFilterConfig {
    /// Starts building a config from the given instance name.
    pub fn builder(name: impl Into<String>) -> IpFilterConfigBuilder {
        IpFilterConfigBuilder {
            name: name.into(),
            deny: Vec::new(),
            allow: Vec::new(),
            event_listeners: EventListeners::new(),
        }
    }
}

/// Builder for [`IpFilterConfig`].
pub struct IpFilterConfigBuilder {
    name: String,
    deny: Vec<IpNet>,
    allow: Vec<IpNet>,
    event_listeners: EventListeners<GuardEvent>,
}

impl IpFilterConfigBuilder {
    /// Adds CIDR ranges that are always rejected, evaluated before `allow`.
    pub fn deny<I, S>(mut self, cidrs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for cidr in cidrs {
            self.deny
                .push(cidr.as_ref().parse().map_err(|e| ConfigError(format!("invalid deny CIDR {:?}: {e}", cidr.as_ref())))?);
        }
        Ok(self)
    }

    /// Adds CIDR ranges that are required for admission once any `allow`
    /// rule is present; with no `allow` rules, every non-denied IP passes.
    pub fn allow<I, S>(mut self, cidrs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for cidr in cidrs {
            self.allow
                .push(cidr.as_ref().parse().map_err(|e| ConfigError(format!("invalid allow CIDR {:?}: {e}", cidr.as_ref())))?);
        }
        Ok(self)
    }

    /// Registers a listener observing rejection events.
    pub fn on_event<L>(mut self, listener: L) -> Self
    where
        L: tower_resilience_core::events::EventListener<GuardEvent> + 'static,
    {
        self.event_listeners.add(listener);
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> IpFilterConfig {
        IpFilterConfig {
            name: self.name,
            deny: self.deny,
            allow: self.allow,
            event_listeners: self.event_listeners,
        }
    }
}

impl IpFilterConfig {
    fn admits(&self, ip: IpAddr) -> bool {
        if self.deny.iter().any(|net| net.contains(&ip)) {
            return false;
        }
        if self.allow.is_empty() {
            return true;
        }
        self.allow.iter().any(|net| net.contains(&ip))
    }
}

/// Tower layer rejecting requests whose source IP fails the configured
/// deny/allow CIDR rules.
pub struct IpFilterLayer {
    config: Arc<IpFilterConfig>,
}

impl IpFilterLayer {
    /// Builds a layer from a validated configuration.
    pub fn new(config: IpFilterConfig) -> Self {
        Self { config: Arc::new(config) }
    }
}

impl Clone for IpFilterLayer {
    fn clone(&self) -> Self {
        Self { config: Arc::clone(&self.config) }
    }
}

impl<S> Layer<S> for IpFilterLayer {
    type Service = IpFilter<S>;

    fn layer(&self, inner: S) -> Self::Service {
        IpFilter {
            inner,
            config: Arc::clone(&self.config),
        }
    }
}

/// Service produced by [`IpFilterLayer`].
#[derive(Clone)]
pub struct IpFilter<S> {
    inner: S,
    config: Arc<IpFilterConfig>,
}

fn forbidden_response(detail: &str) -> Response<Body> {
    let err = ServiceError::forbidden(detail);
    let (status, json) = render_problem(&err, "", "");
    let body = serde_json::to_vec(&json).unwrap_or_default();
    Response::builder()
        .status(StatusCode::from_u16(status).unwrap_or(StatusCode::FORBIDDEN))
        .header("content-type", "application/problem+json")
        .body(Body::from(body))
        .expect("problem response is well-formed")
}

impl<S, B> Service<Request<B>> for IpFilter<S>
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
        // The IP can't be determined without `ConnectInfo`, so fail closed:
        // a filter that can't evaluate its rule can't claim to enforce it.
        let admitted = peer_ip(&req).map(|ip| self.config.admits(ip)).unwrap_or(false);

        if admitted {
            let mut inner = self.inner.clone();
            Box::pin(async move { inner.call(req).await })
        } else {
            #[cfg(feature = "metrics")]
            counter!("ip_filter_rejected_total", "filter" => self.config.name.clone()).increment(1);
            self.config.event_listeners.emit(&GuardEvent::Rejected {
                pattern_name: self.config.name.clone(),
                timestamp: Instant::now(),
                reason: "ip_denied",
            });
            #[cfg(feature = "tracing")]
            tracing::warn!(filter = %self.config.name, "ip filter rejected request");
            let response = forbidden_response("source address is not permitted");
            Box::pin(async move { Ok(response) })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use tower::{service_fn, ServiceExt};

    fn ok_service() -> impl Service<Request<Body>, Response = Response<Body>, Error = std::convert::Infallible> + Clone
    {
        service_fn(|_req: Request<Body>| async { Ok(Response::new(Body::empty())) })
    }

    fn request_from(peer: &str) -> Request<Body> {
        let mut req = Request::builder().uri("/").body(Body::empty()).unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(peer.parse::<SocketAddr>().unwrap()));
        req
    }

    #[tokio::test]
    async fn deny_rule_rejects_before_allow_is_checked() {
        let config = IpFilterConfig::builder("test")
            .deny(["10.0.0.0/8"])
            .unwrap()
            .allow(["10.0.0.0/8"])
            .unwrap()
            .build();
        let mut svc = IpFilterLayer::new(config).layer(ok_service());
        let resp = svc.ready().await.unwrap().call(request_from("10.1.2.3:1")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn no_allow_rules_admits_everything_not_denied() {
        let config = IpFilterConfig::builder("test").build();
        let mut svc = IpFilterLayer::new(config).layer(ok_service());
        let resp = svc.ready().await.unwrap().call(request_from("203.0.113.1:1")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn allow_rule_rejects_unmatched_ip() {
        let config = IpFilterConfig::builder("test").allow(["198.51.100.0/24"]).unwrap().build();
        let mut svc = IpFilterLayer::new(config).layer(ok_service());
        let resp = svc.ready().await.unwrap().call(request_from("203.0.113.1:1")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn allow_rule_admits_matched_ip() {
        let config = IpFilterConfig::builder("test").allow(["203.0.113.0/24"]).unwrap().build();
        let mut svc = IpFilterLayer::new(config).layer(ok_service());
        let resp = svc.ready().await.unwrap().call(request_from("203.0.113.1:1")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[test]
    fn invalid_cidr_rejected_at_construction() {
        assert!(IpFilterConfig::builder("test").deny(["not-a-cidr"]).is_err());
    }
}

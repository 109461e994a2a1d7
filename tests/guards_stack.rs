//! Guards compose in any order (§4.7, §4.11, §6): a representative stack of
//! CORS, IP filter, body cap, security headers, request ID, and recovery
//! wrapping a single handler.

use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, Response, StatusCode};
use tower::{Layer, Service, ServiceBuilder, ServiceExt};
use tower_resilience_guards::cors::CorsConfig;
use tower_resilience_guards::ip_filter::IpFilterConfig;
use tower_resilience_guards::security_headers::SecurityHeadersConfig;
use tower_resilience_guards::{CorsLayer, IpFilterLayer, MaxBodyLayer, RecoveryLayer, RequestIdLayer, SecurityHeadersLayer};

fn request_from(peer: &str, uri: &str) -> Request<Body> {
    let mut req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    req.extensions_mut().insert(ConnectInfo(peer.parse::<SocketAddr>().unwrap()));
    req
}

fn build_stack() -> impl Service<Request<Body>, Response = Response<Body>, Error = std::convert::Infallible> + Clone {
    let cors = CorsLayer::new(CorsConfig::builder().allow_any_origin().build().unwrap());
    let ip_filter = IpFilterLayer::new(IpFilterConfig::builder("edge").allow(["10.0.0.0/8"]).unwrap().build());
    let max_body = MaxBodyLayer::new(1024).unwrap();

    let handler = tower::service_fn(|_req: Request<Body>| async { Ok::<_, std::convert::Infallible>(Response::new(Body::empty())) });

    // Layers closest to `.service()` wrap innermost: Recovery sits directly
    // around the handler, so a panic there never escapes past it, while
    // RequestIdLayer wraps everything so its header survives any guard's
    // rejection (§2 data-flow, innermost-to-outermost).
    ServiceBuilder::new()
        .layer(RequestIdLayer)
        .layer(SecurityHeadersLayer::new(SecurityHeadersConfig::recommended()))
        .layer(cors)
        .layer(ip_filter)
        .layer(max_body)
        .layer(RecoveryLayer::new("edge"))
        .service(handler)
}

#[tokio::test]
async fn admitted_request_gets_request_id_and_security_headers() {
    let mut svc = build_stack();
    let req = request_from("10.1.2.3:1", "/");
    let resp = svc.ready().await.unwrap().call(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("x-request-id"));
    assert!(resp.headers().contains_key("x-content-type-options"));
}

#[tokio::test]
async fn ip_filter_rejects_before_reaching_the_handler() {
    let mut svc = build_stack();
    let req = request_from("203.0.113.9:1", "/");
    let resp = svc.ready().await.unwrap().call(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(resp.headers().get("content-type").unwrap(), "application/problem+json");
}

#[tokio::test]
async fn recovery_layer_survives_a_panicking_handler_behind_the_same_stack() {
    let handler = tower::service_fn(|_req: Request<Body>| async {
        panic!("handler exploded");
        #[allow(unreachable_code)]
        Ok::<_, std::convert::Infallible>(Response::new(Body::empty()))
    });

    let mut svc = ServiceBuilder::new()
        .layer(RequestIdLayer)
        .layer(RecoveryLayer::new("edge"))
        .service(handler);

    let req = request_from("10.1.2.3:1", "/");
    let resp = tokio::time::timeout(Duration::from_secs(1), svc.ready().await.unwrap().call(req))
        .await
        .expect("guard must not hang on a panicking handler")
        .unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    // Recovery sits innermost, so the request ID assigned further out still
    // makes it onto the substituted error response.
    assert!(resp.headers().contains_key("x-request-id"));
}

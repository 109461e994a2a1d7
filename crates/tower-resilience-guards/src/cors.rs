//! CORS guard with preflight handling (§4.7).

use std::task::{Context, Poll};
use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderValue, Method, Request, Response, StatusCode};
use futures::future::BoxFuture;
use tower::{Layer, Service};

use crate::error::ConfigError;

/// The set of origins a [`CorsConfig`] will echo back.
#[derive(Debug, Clone)]
pub enum AllowOrigins {
    /// Any origin is allowed (`Access-Control-Allow-Origin: *`).
    Any,
    /// Only origins in this exact-match list are allowed.
    List(Vec<String>),
}

/// CORS policy configuration, validated at construction (§4.7).
#[derive(Debug, Clone)]
pub struct CorsConfig {
    allow_origins: AllowOrigins,
    allow_credentials: bool,
    allow_methods: Vec<String>,
    allow_headers: Vec<String>,
    max_age: Option<Duration>,
}

impl CorsConfig {
    /// Starts building a config. `allow_origins` must be non-empty when a
    /// [`AllowOrigins::List`] is supplied.
    pub fn builder() -> CorsConfigBuilder {
        CorsConfigBuilder::default()
    }
}

/// Builder for [`CorsConfig`].
#[derive(Debug, Default)]
pub struct CorsConfigBuilder {
    allow_origins: Option<AllowOrigins>,
    allow_credentials: bool,
    allow_methods: Vec<String>,
    allow_headers: Vec<String>,
    max_age: Option<Duration>,
}

impl CorsConfigBuilder {
    /// Allows any origin.
    pub fn allow_any_origin(mut self) -> Self {
        self.allow_origins = Some(AllowOrigins::Any);
        self
    }

    /// Allows only the given exact-match origins.
    pub fn allow_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow_origins = Some(AllowOrigins::List(origins.into_iter().map(Into::into).collect()));
        self
    }

    /// Allows credentialed requests (cookies, `Authorization` headers).
    /// Cannot be combined with [`Self::allow_any_origin`].
    pub fn allow_credentials(mut self, allow: bool) -> Self {
        self.allow_credentials = allow;
        self
    }

    /// Methods advertised in preflight responses.
    pub fn allow_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow_methods = methods.into_iter().map(Into::into).collect();
        self
    }

    /// Headers advertised in preflight responses.
    pub fn allow_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow_headers = headers.into_iter().map(Into::into).collect();
        self
    }

    /// How long browsers may cache a preflight response.
    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    /// Validates and builds the configuration.
    ///
    /// Errors when `allow_origins` is an empty list, or when credentials
    /// are allowed alongside a wildcard origin (the CORS spec forbids
    /// combining `Access-Control-Allow-Credentials: true` with
    /// `Access-Control-Allow-Origin: *`).
    pub fn build(self) -> Result<CorsConfig, ConfigError> {
        let allow_origins = self
            .allow_origins
            .ok_or_else(|| ConfigError("allow_origins must be set".to_string()))?;

        if let AllowOrigins::List(ref origins) = allow_origins {
            if origins.is_empty() {
                return Err(ConfigError("allow_origins list must be non-empty".to_string()));
            }
        }

        if self.allow_credentials && matches!(allow_origins, AllowOrigins::Any) {
            return Err(ConfigError(
                "allow_credentials cannot be combined with a wildcard origin".to_string(),
            ));
        }

        Ok(CorsConfig {
            allow_origins,
            allow_credentials: self.allow_credentials,
            allow_methods: if self.allow_methods.is_empty() {
                vec!["GET".into(), "POST".into(), "PUT".into(), "PATCH".into(), "DELETE".into()]
            } else {
                self.allow_methods
            },
            allow_headers: self.allow_headers,
            max_age: self.max_age,
        })
    }
}

/// Tower layer applying the CORS policy described by [`CorsConfig`].
#[derive(Clone)]
pub struct CorsLayer {
    config: CorsConfig,
}

impl CorsLayer {
    /// Builds a layer from a validated configuration.
    pub fn new(config: CorsConfig) -> Self {
        Self { config }
    }
}

impl<S> Layer<S> for CorsLayer {
    type Service = Cors<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Cors {
            inner,
            config: self.config.clone(),
        }
    }
}

/// Service produced by [`CorsLayer`].
#[derive(Clone)]
pub struct Cors<S> {
    inner: S,
    config: CorsConfig,
}

impl CorsConfig {
    fn matches(&self, origin: &str) -> bool {
        match &self.allow_origins {
            AllowOrigins::Any => true,
            AllowOrigins::List(list) => list.iter().any(|o| o == origin),
        }
    }
}

fn apply_cors_headers(resp: &mut Response<Body>, config: &CorsConfig, origin: &str, wildcard: bool) {
    let headers = resp.headers_mut();
    let value = if wildcard {
        HeaderValue::from_static("*")
    } else {
        HeaderValue::from_str(origin).expect("origin header value")
    };
    headers.insert("access-control-allow-origin", value);
    if !wildcard {
        headers.append("vary", HeaderValue::from_static("origin"));
    }
    if config.allow_credentials {
        headers.insert("access-control-allow-credentials", HeaderValue::from_static("true"));
    }
}

fn preflight_response(config: &CorsConfig, origin: Option<&str>) -> Response<Body> {
    let mut builder = Response::builder().status(StatusCode::NO_CONTENT);

    if let Some(origin) = origin {
        if config.matches(origin) {
            let wildcard = matches!(config.allow_origins, AllowOrigins::Any);
            builder = builder.header(
                "access-control-allow-origin",
                if wildcard { "*".to_string() } else { origin.to_string() },
            );
            if !wildcard {
                builder = builder.header("vary", "origin, access-control-request-method, access-control-request-headers");
            }
            if config.allow_credentials {
                builder = builder.header("access-control-allow-credentials", "true");
            }
            builder = builder.header("access-control-allow-methods", config.allow_methods.join(", "));
            if !config.allow_headers.is_empty() {
                builder = builder.header("access-control-allow-headers", config.allow_headers.join(", "));
            }
            if let Some(max_age) = config.max_age {
                builder = builder.header("access-control-max-age", max_age.as_secs().to_string());
            }
        }
    }

    builder.body(Body::empty()).expect("preflight response is well-formed")
}

impl<S, B> Service<Request<B>> for Cors<S>
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
        let origin = req
            .headers()
            .get("origin")
            .and_then(|v| v.to_str().ok())
            .map(ToOwned::to_owned);

        let Some(origin) = origin else {
            let mut inner = self.inner.clone();
            return Box::pin(async move { inner.call(req).await });
        };

        let is_preflight = req.method() == Method::OPTIONS
            && req.headers().contains_key("access-control-request-method");

        if is_preflight {
            let config = self.config.clone();
            return Box::pin(async move { Ok(preflight_response(&config, Some(&origin))) });
        }

        let config = self.config.clone();
        let mut inner = self.inner.clone();
        Box::pin(async move {
            let mut resp = inner.call(req).await?;
            if config.matches(&origin) {
                let wildcard = matches!(config.allow_origins, AllowOrigins::Any);
                apply_cors_headers(&mut resp, &config, &origin, wildcard);
            }
            Ok(resp)
        })
    }
}

//! Unified service error model with dual HTTP/RPC status codes and
//! RFC 9457 Problem Details serialization.
//!
//! [`ServiceError`] is the error type every layer in this toolkit eventually
//! converges on for responses that cross a wire: guards convert policy
//! violations into one, the resilient client classifies transport failures
//! into one, and handlers construct one directly for domain errors. The
//! point is that a single value can be rendered consistently as an HTTP
//! status, a gRPC status, or a JSON body, no matter which transport the
//! caller used.

use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

/// Names that [`ProblemDetail`] reserves for its own top-level members.
///
/// Extensions carrying one of these keys are dropped rather than allowed to
/// shadow the structured field.
pub const RESERVED_PROBLEM_FIELDS: &[&str] = &["type", "title", "status", "detail", "instance"];

/// Transport-independent classification of a [`ServiceError`].
///
/// Each kind carries a default HTTP status, RPC status, and Problem Details
/// type URI; see [`ErrorKind::http_status`], [`ErrorKind::rpc_status`], and
/// [`ErrorKind::type_uri`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The request failed input validation.
    Validation,
    /// The caller's credentials were missing or invalid.
    Unauthorized,
    /// The caller is authenticated but not permitted to perform the action.
    Forbidden,
    /// The requested resource does not exist.
    NotFound,
    /// The request body exceeded a configured size limit.
    PayloadTooLarge,
    /// The caller exceeded a rate limit.
    RateLimit,
    /// A downstream dependency failed or is unavailable.
    Dependency,
    /// The operation did not complete before its deadline.
    Timeout,
    /// An unclassified internal failure.
    Internal,
}

/// gRPC-style status codes, named per the standard gRPC status code table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum RpcStatus {
    InvalidArgument,
    Unauthenticated,
    PermissionDenied,
    NotFound,
    ResourceExhausted,
    Internal,
    Unavailable,
    DeadlineExceeded,
}

impl RpcStatus {
    /// The canonical gRPC status name, as it appears on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            RpcStatus::InvalidArgument => "INVALID_ARGUMENT",
            RpcStatus::Unauthenticated => "UNAUTHENTICATED",
            RpcStatus::PermissionDenied => "PERMISSION_DENIED",
            RpcStatus::NotFound => "NOT_FOUND",
            RpcStatus::ResourceExhausted => "RESOURCE_EXHAUSTED",
            RpcStatus::Internal => "INTERNAL",
            RpcStatus::Unavailable => "UNAVAILABLE",
            RpcStatus::DeadlineExceeded => "DEADLINE_EXCEEDED",
        }
    }
}

impl fmt::Display for RpcStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ErrorKind {
    /// The HTTP status code this kind maps to by default.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::Unauthorized => 401,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::PayloadTooLarge => 413,
            ErrorKind::RateLimit => 429,
            ErrorKind::Internal => 500,
            ErrorKind::Dependency => 503,
            ErrorKind::Timeout => 504,
        }
    }

    /// The RPC status this kind maps to by default.
    pub fn rpc_status(self) -> RpcStatus {
        match self {
            ErrorKind::Validation => RpcStatus::InvalidArgument,
            ErrorKind::Unauthorized => RpcStatus::Unauthenticated,
            ErrorKind::Forbidden => RpcStatus::PermissionDenied,
            ErrorKind::NotFound => RpcStatus::NotFound,
            ErrorKind::PayloadTooLarge => RpcStatus::InvalidArgument,
            ErrorKind::RateLimit => RpcStatus::ResourceExhausted,
            ErrorKind::Internal => RpcStatus::Internal,
            ErrorKind::Dependency => RpcStatus::Unavailable,
            ErrorKind::Timeout => RpcStatus::DeadlineExceeded,
        }
    }

    /// The default Problem Details type URI for this kind.
    pub fn type_uri(self) -> &'static str {
        match self {
            ErrorKind::Validation => "/errors/validation",
            ErrorKind::Unauthorized => "/errors/unauthorized",
            ErrorKind::Forbidden => "/errors/forbidden",
            ErrorKind::NotFound => "/errors/not-found",
            ErrorKind::PayloadTooLarge => "/errors/payload-too-large",
            ErrorKind::RateLimit => "/errors/rate-limit",
            ErrorKind::Internal => "/errors/internal",
            ErrorKind::Dependency => "/errors/dependency",
            ErrorKind::Timeout => "/errors/timeout",
        }
    }

    /// A short human-readable title, used as the Problem Details `title`.
    pub fn title(self) -> &'static str {
        match self {
            ErrorKind::Validation => "Validation Error",
            ErrorKind::Unauthorized => "Unauthorized",
            ErrorKind::Forbidden => "Forbidden",
            ErrorKind::NotFound => "Not Found",
            ErrorKind::PayloadTooLarge => "Payload Too Large",
            ErrorKind::RateLimit => "Rate Limit Exceeded",
            ErrorKind::Internal => "Internal Server Error",
            ErrorKind::Dependency => "Dependency Unavailable",
            ErrorKind::Timeout => "Timeout",
        }
    }
}

/// The toolkit's unified error value.
///
/// Immutable after construction: the fluent decorators (`with_detail`,
/// `with_details`, `with_type`, `with_cause`) each return a new, independent
/// copy rather than mutating `self`. This matters when the same base error
/// is decorated concurrently from multiple call sites (e.g. a shared
/// "not found" constant enriched per-request) — no decoration ever observes
/// or clobbers another's details.
#[derive(Debug, Clone)]
pub struct ServiceError {
    kind: ErrorKind,
    message: String,
    type_uri: Option<Arc<str>>,
    details: Arc<BTreeMap<String, Value>>,
    cause: Option<Arc<dyn StdError + Send + Sync>>,
}

impl ServiceError {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            type_uri: None,
            details: Arc::new(BTreeMap::new()),
            cause: None,
        }
    }

    /// Constructs a [`ErrorKind::Validation`] error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Constructs a [`ErrorKind::Unauthorized`] error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    /// Constructs a [`ErrorKind::Forbidden`] error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    /// Constructs a [`ErrorKind::NotFound`] error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Constructs a [`ErrorKind::PayloadTooLarge`] error.
    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PayloadTooLarge, message)
    }

    /// Constructs a [`ErrorKind::RateLimit`] error.
    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RateLimit, message)
    }

    /// Constructs a [`ErrorKind::Dependency`] error.
    pub fn dependency(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Dependency, message)
    }

    /// Constructs a [`ErrorKind::Timeout`] error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    /// Constructs a [`ErrorKind::Internal`] error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// This error's transport-independent kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The HTTP status code this error maps to.
    pub fn http_status(&self) -> u16 {
        self.kind.http_status()
    }

    /// The RPC status this error maps to.
    pub fn rpc_status(&self) -> RpcStatus {
        self.kind.rpc_status()
    }

    /// The Problem Details type URI: the overridden one if [`Self::with_type`]
    /// was used, otherwise the kind's default.
    pub fn type_uri(&self) -> &str {
        self.type_uri.as_deref().unwrap_or_else(|| self.kind.type_uri())
    }

    /// The detail map attached via [`Self::with_detail`] / [`Self::with_details`].
    pub fn details(&self) -> &BTreeMap<String, Value> {
        &self.details
    }

    /// The underlying cause, if one was attached via [`Self::with_cause`].
    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync)> {
        self.cause.as_deref()
    }

    /// Returns a copy with a single detail entry added (or replaced).
    pub fn with_detail(&self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut details = (*self.details).clone();
        details.insert(name.into(), value.into());
        Self {
            details: Arc::new(details),
            ..self.clone()
        }
    }

    /// Returns a copy with several detail entries merged in.
    pub fn with_details(&self, entries: impl IntoIterator<Item = (String, Value)>) -> Self {
        let mut details = (*self.details).clone();
        details.extend(entries);
        Self {
            details: Arc::new(details),
            ..self.clone()
        }
    }

    /// Returns a copy with the Problem Details type URI overridden.
    pub fn with_type(&self, type_uri: impl Into<Arc<str>>) -> Self {
        Self {
            type_uri: Some(type_uri.into()),
            ..self.clone()
        }
    }

    /// Returns a copy with an underlying cause attached.
    pub fn with_cause(&self, cause: impl StdError + Send + Sync + 'static) -> Self {
        Self {
            cause: Some(Arc::new(cause)),
            ..self.clone()
        }
    }

    /// Walks `err`'s source chain and returns the nearest [`ServiceError`],
    /// cloned. If none is found, wraps `err` as [`ErrorKind::Internal`].
    pub fn from_error(err: &(dyn StdError + 'static)) -> Self {
        let mut cursor: Option<&(dyn StdError + 'static)> = Some(err);
        while let Some(current) = cursor {
            if let Some(found) = current.downcast_ref::<ServiceError>() {
                return found.clone();
            }
            cursor = current.source();
        }
        ServiceError::internal(err.to_string())
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for ServiceError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause.as_ref().map(|c| c.as_ref() as &(dyn StdError + 'static))
    }
}

/// An RFC 9457 Problem Details envelope.
///
/// `extensions` are flattened into the top-level JSON object at
/// serialization time; any extension key that collides with a reserved
/// member name (`type`, `title`, `status`, `detail`, `instance`) is
/// silently dropped rather than allowed to shadow the structured field.
#[derive(Debug, Clone)]
pub struct ProblemDetail {
    /// A URI identifying the problem type.
    pub type_uri: String,
    /// A short, human-readable summary of the problem type.
    pub title: String,
    /// The HTTP status code.
    pub status: u16,
    /// A human-readable explanation specific to this occurrence.
    pub detail: String,
    /// A URI identifying this specific occurrence (typically the request path).
    pub instance: Option<String>,
    /// Extension members, flattened into the top-level object on serialization.
    pub extensions: BTreeMap<String, Value>,
}

impl ProblemDetail {
    /// Builds a [`ProblemDetail`] from a [`ServiceError`] and the request path.
    pub fn from_service_error(err: &ServiceError, instance: impl Into<String>) -> Self {
        let instance = instance.into();
        Self {
            type_uri: err.type_uri().to_string(),
            title: err.kind().title().to_string(),
            status: err.http_status(),
            detail: err.message().to_string(),
            instance: if instance.is_empty() { None } else { Some(instance) },
            extensions: err.details().clone(),
        }
    }

    /// Adds an extension member, returning `self` for chaining. A reserved
    /// name is silently ignored.
    pub fn with_extension(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        if !RESERVED_PROBLEM_FIELDS.contains(&name.as_str()) {
            self.extensions.insert(name, value.into());
        }
        self
    }

    /// Serializes this envelope to a JSON object, with extensions flattened
    /// at the top level and empty/absent optional members omitted.
    pub fn to_json(&self) -> Value {
        let mut map = serde_json::Map::new();
        map.insert("type".to_string(), Value::String(self.type_uri.clone()));
        map.insert("title".to_string(), Value::String(self.title.clone()));
        map.insert("status".to_string(), Value::from(self.status));
        map.insert("detail".to_string(), Value::String(self.detail.clone()));
        if let Some(instance) = &self.instance {
            if !instance.is_empty() {
                map.insert("instance".to_string(), Value::String(instance.clone()));
            }
        }
        for (key, value) in &self.extensions {
            if RESERVED_PROBLEM_FIELDS.contains(&key.as_str()) {
                continue;
            }
            map.insert(key.clone(), value.clone());
        }
        Value::Object(map)
    }
}

impl Serialize for ProblemDetail {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_json().serialize(serializer)
    }
}

/// Builds the Problem Detail envelope for `err`, injecting `request_id` as
/// an extension member when non-empty, and returns `(status, json_body)`
/// ready to be written by whatever transport the caller is using.
///
/// This is the transport-agnostic core of `WriteProblem`; HTTP/gRPC adapters
/// in other crates call this and then set headers/status appropriately.
pub fn render_problem(err: &ServiceError, path: &str, request_id: &str) -> (u16, Value) {
    let mut problem = ProblemDetail::from_service_error(err, path);
    if !request_id.is_empty() {
        problem = problem.with_extension("request_id", Value::String(request_id.to_string()));
    }
    (problem.status, problem.to_json())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_mapping_matches_table() {
        assert_eq!(ErrorKind::Validation.http_status(), 400);
        assert_eq!(ErrorKind::Unauthorized.http_status(), 401);
        assert_eq!(ErrorKind::Forbidden.http_status(), 403);
        assert_eq!(ErrorKind::NotFound.http_status(), 404);
        assert_eq!(ErrorKind::PayloadTooLarge.http_status(), 413);
        assert_eq!(ErrorKind::RateLimit.http_status(), 429);
        assert_eq!(ErrorKind::Internal.http_status(), 500);
        assert_eq!(ErrorKind::Dependency.http_status(), 503);
        assert_eq!(ErrorKind::Timeout.http_status(), 504);

        assert_eq!(ErrorKind::RateLimit.rpc_status().as_str(), "RESOURCE_EXHAUSTED");
        assert_eq!(ErrorKind::PayloadTooLarge.rpc_status().as_str(), "INVALID_ARGUMENT");
    }

    #[test]
    fn decorators_do_not_mutate_original() {
        let original = ServiceError::not_found("widget missing");
        let decorated = original
            .with_detail("widget_id", Value::from(42))
            .with_type("/errors/widget-missing")
            .with_cause(std::io::Error::other("disk gone"));

        assert!(original.details().is_empty());
        assert_eq!(original.type_uri(), "/errors/not-found");
        assert!(original.cause().is_none());

        assert_eq!(decorated.details().get("widget_id"), Some(&Value::from(42)));
        assert_eq!(decorated.type_uri(), "/errors/widget-missing");
        assert!(decorated.cause().is_some());
    }

    #[test]
    fn from_error_is_idempotent() {
        let err = ServiceError::internal("boom");
        let once = ServiceError::from_error(&err);
        let twice = ServiceError::from_error(&once);
        assert_eq!(once.message(), twice.message());
        assert_eq!(once.kind(), twice.kind());
    }

    #[test]
    fn from_error_wraps_foreign_errors_as_internal() {
        let io_err = std::io::Error::other("nope");
        let wrapped = ServiceError::from_error(&io_err);
        assert_eq!(wrapped.kind(), ErrorKind::Internal);
        assert_eq!(wrapped.message(), "nope");
    }

    #[test]
    fn problem_detail_omits_empty_instance_and_extensions() {
        let err = ServiceError::validation("bad field");
        let problem = ProblemDetail::from_service_error(&err, "");
        let json = problem.to_json();
        assert!(json.get("instance").is_none());
        assert_eq!(json["status"], 400);
    }

    #[test]
    fn reserved_extension_names_cannot_be_overridden() {
        let err = ServiceError::internal("boom");
        let problem = ProblemDetail::from_service_error(&err, "/x")
            .with_extension("status", Value::from(999))
            .with_extension("detail", Value::from("hijacked"));
        let json = problem.to_json();
        assert_eq!(json["status"], 500);
        assert_eq!(json["detail"], "boom");
    }

    #[test]
    fn render_problem_injects_request_id_only_when_non_empty() {
        let err = ServiceError::rate_limit("slow down");
        let (status, with_id) = render_problem(&err, "/api", "req-123");
        assert_eq!(status, 429);
        assert_eq!(with_id["request_id"], "req-123");

        let (_, without_id) = render_problem(&err, "/api", "");
        assert!(without_id.get("request_id").is_none());
    }
}

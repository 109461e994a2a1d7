//! Errors produced by [`crate::ResilientClient`].

use std::fmt;

use tower_resilience_core::error::ServiceError;

/// Failure modes for a resilient HTTP call (§4.4).
#[derive(Debug)]
pub enum ClientError {
    /// The circuit breaker rejected the call without invoking the transport.
    CircuitOpen,
    /// The call's deadline elapsed before a response was received.
    Timeout,
    /// The underlying transport failed (connection, DNS, TLS, ...).
    Transport(reqwest::Error),
    /// Every retry attempt returned a server error status and none of them
    /// surfaced a transport-level error to report instead.
    ServerError {
        /// The HTTP status of the last observed response.
        status: u16,
    },
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::CircuitOpen => write!(f, "circuit breaker is open"),
            ClientError::Timeout => write!(f, "request deadline exceeded"),
            ClientError::Transport(err) => write!(f, "transport error: {err}"),
            ClientError::ServerError { status } => {
                write!(f, "server responded {status} on every attempt")
            }
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ClientError> for ServiceError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::CircuitOpen => ServiceError::dependency("circuit breaker is open"),
            ClientError::Timeout => ServiceError::timeout("request deadline exceeded"),
            ClientError::Transport(inner) => {
                let message = inner.to_string();
                ServiceError::dependency(message).with_cause(inner)
            }
            ClientError::ServerError { status } => {
                ServiceError::dependency(format!("server responded {status} on every attempt"))
                    .with_detail("status", serde_json::Value::from(status))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circuit_open_maps_to_dependency_error() {
        let service_error: ServiceError = ClientError::CircuitOpen.into();
        assert_eq!(service_error.http_status(), 503);
    }

    #[test]
    fn timeout_maps_to_504() {
        let service_error: ServiceError = ClientError::Timeout.into();
        assert_eq!(service_error.http_status(), 504);
    }

    #[test]
    fn server_error_carries_status_detail() {
        let service_error: ServiceError = ClientError::ServerError { status: 502 }.into();
        assert_eq!(
            service_error.details().get("status"),
            Some(&serde_json::Value::from(502))
        );
    }
}

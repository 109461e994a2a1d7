use thiserror::Error;

/// Sentinel error returned when a call is rejected because a breaker is open.
///
/// A plain, comparable marker: callers distinguish it from ordinary transport
/// errors with `==`/`matches!` rather than downcasting, which is why it
/// carries no payload. Exported so it is identity-checkable across crate
/// boundaries, per the toolkit's error-sentinel contract.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Default)]
#[error("circuit breaker is open; call not permitted")]
pub struct CircuitOpenError;

impl From<CircuitOpenError> for tower_resilience_core::ServiceError {
    fn from(_: CircuitOpenError) -> Self {
        tower_resilience_core::ServiceError::dependency("circuit breaker is open")
    }
}

/// Errors produced by the [`crate::CircuitBreakerLayer`] tower wrapper.
///
/// Distinct from [`CircuitOpenError`]: this is the error type the wrapped
/// `Service` surfaces, so it needs to carry the inner service's error too.
#[derive(Debug, Error)]
pub enum CircuitBreakerError<E> {
    /// The circuit is open; the inner service was not called.
    #[error(transparent)]
    Open(#[from] CircuitOpenError),

    /// The inner service returned this error.
    #[error("inner service error: {0}")]
    Inner(E),
}

impl<E> CircuitBreakerError<E> {
    /// Returns `true` if the circuit was open (the inner service was never called).
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, CircuitBreakerError::Open(_))
    }

    /// Returns the inner error, if this was not a circuit-open rejection.
    pub fn into_inner(self) -> Option<E> {
        match self {
            CircuitBreakerError::Inner(e) => Some(e),
            CircuitBreakerError::Open(_) => None,
        }
    }
}

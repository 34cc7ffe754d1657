//! Gateway error taxonomy.
//!
//! Every variant is a per-request failure: it is fed to the circuit breaker
//! as a failed outcome and rendered to the client as a bare 500. Nothing
//! here is fatal to the process.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Body returned for every gateway-produced failure.
pub const FAILURE_BODY: &str = "500 Internal Server Error";

/// Why the breaker refused to run a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The circuit is open and the cool-down has not elapsed.
    CircuitOpen,
    /// `max_concurrent` calls are already in flight.
    ConcurrencyLimit,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::CircuitOpen => write!(f, "circuit-open"),
            RejectReason::ConcurrencyLimit => write!(f, "concurrency-limit"),
        }
    }
}

/// Errors produced while dispatching a request.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("rejected: {0}")]
    BreakerRejected(RejectReason),

    #[error("rejected: timeout")]
    BreakerTimeout,

    #[error("backend unreachable: {0}")]
    BackendUnreachable(String),

    #[error("protocol error: {0}")]
    ProtocolError(String),
}

impl GatewayError {
    /// Short label used for log fields and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::BreakerRejected(RejectReason::CircuitOpen) => "short_circuited",
            GatewayError::BreakerRejected(RejectReason::ConcurrencyLimit) => "rejected",
            GatewayError::BreakerTimeout => "timeout",
            GatewayError::BackendUnreachable(_) => "unreachable",
            GatewayError::ProtocolError(_) => "protocol",
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, FAILURE_BODY).into_response()
    }
}

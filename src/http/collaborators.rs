//! Fixed endpoints served by the gateway itself.
//!
//! None of these pass through the breaker, so they stay answerable while
//! a circuit is open.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::http::server::AppState;

#[derive(Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
}

pub async fn health() -> Json<HealthStatus> {
    Json(HealthStatus { status: "healthy" })
}

pub async fn run() -> &'static str {
    "You are now running request-gateway"
}

/// Prometheus text exposition: request counters, then recorder metrics.
pub async fn metrics(State(state): State<AppState>) -> Response {
    let mut body = match state.counters.render() {
        Ok(body) => body,
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode request counters");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    if let Some(handle) = &state.prometheus {
        body.push_str(&handle.render());
    }
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
        .into_response()
}

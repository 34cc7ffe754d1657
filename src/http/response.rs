//! Response handling and transformation.
//!
//! Backend responses stream back to the client unbuffered; only hop-by-hop
//! headers are removed.

use axum::body::Body;
use axum::http::StatusCode;
use axum::response::Response;
use hyper::body::Incoming;

use crate::http::request::strip_hop_by_hop;

/// Turn a backend response into a client response without buffering.
pub fn from_upstream(response: Response<Incoming>) -> Response {
    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    Response::from_parts(parts, Body::new(body))
}

/// Plain-text response with a fixed status.
pub fn plain(status: StatusCode, message: &'static str) -> Response {
    let mut response = Response::new(Body::from(message));
    *response.status_mut() = status;
    response
}

//! HTTP reverse-proxy adapter.
//!
//! Rewrites the request destination to the resolved backend and streams
//! the body in both directions. Method, headers (including `Host`), query
//! and body pass through; only hop-by-hop headers are dropped.

use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Body;
use axum::http::uri::Scheme;
use axum::http::{Request, Uri, Version};
use axum::response::Response;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::error::GatewayError;
use crate::http::{request, response};
use crate::routing::BackendTarget;

/// Pooled HTTP/1.1 client shared by every request.
pub type HttpClient = Client<HttpConnector, Body>;

pub fn build_client(connect_timeout: Duration) -> HttpClient {
    let mut connector = HttpConnector::new();
    connector.set_connect_timeout(Some(connect_timeout));
    connector.set_nodelay(true);
    Client::builder(TokioExecutor::new()).build(connector)
}

/// Upstream URI for `uri` on `target`.
pub fn upstream_uri(target: &BackendTarget, uri: &Uri) -> Result<Uri, GatewayError> {
    Uri::builder()
        .scheme(Scheme::HTTP)
        .authority(target.host.as_str())
        .path_and_query(target.path_and_query(uri.path(), uri.query()))
        .build()
        .map_err(|e| GatewayError::ProtocolError(format!("invalid upstream uri: {}", e)))
}

/// Forward `request` to `target` and return the streamed backend response.
///
/// Resolves once the response head arrives; the body is copied as the
/// client reads it.
pub async fn forward(
    client: &HttpClient,
    target: &BackendTarget,
    peer: Option<SocketAddr>,
    request: Request<Body>,
) -> Result<Response, GatewayError> {
    let (mut parts, body) = request.into_parts();

    parts.uri = upstream_uri(target, &parts.uri)?;
    parts.version = Version::HTTP_11;
    request::prepare_upstream_headers(&mut parts.headers, peer);

    tracing::debug!(upstream = %parts.uri, method = %parts.method, "Forwarding request");

    let upstream = client
        .request(Request::from_parts(parts, body))
        .await
        .map_err(|e| GatewayError::BackendUnreachable(format!("{}: {}", target.host, e)))?;

    Ok(response::from_upstream(upstream))
}

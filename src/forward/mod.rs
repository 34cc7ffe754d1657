//! Generic forward proxy.
//!
//! An independent listener that relays arbitrary outbound traffic:
//! - absolute-form requests (`GET http://host/path`) are forwarded as-is
//! - `CONNECT host:port` opens a raw TCP tunnel
//!
//! No path logic, no breaker, no counters.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode, Version};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;

use crate::http::proxy::HttpClient;
use crate::http::{request, response};

pub struct ForwardProxy {
    client: HttpClient,
}

impl ForwardProxy {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// Accept connections until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        tracing::info!(address = %listener.local_addr()?, "Forward proxy listening");

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            tracing::warn!(error = %e, "Forward proxy accept failed");
                            continue;
                        }
                    };
                    let client = self.client.clone();
                    tokio::spawn(async move {
                        let service = service_fn(move |req| handle(client.clone(), peer, req));
                        if let Err(e) = http1::Builder::new()
                            .preserve_header_case(true)
                            .title_case_headers(true)
                            .serve_connection(TokioIo::new(stream), service)
                            .with_upgrades()
                            .await
                        {
                            tracing::debug!(peer = %peer, error = %e, "Forward proxy connection ended");
                        }
                    });
                }
                _ = shutdown.recv() => {
                    tracing::info!("Forward proxy stopped");
                    return Ok(());
                }
            }
        }
    }
}

async fn handle(
    client: HttpClient,
    peer: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<Body>, Infallible> {
    tracing::debug!(peer = %peer, method = %req.method(), uri = %req.uri(), "Forward proxy request");

    if req.method() == Method::CONNECT {
        Ok(connect_tunnel(req).await)
    } else {
        Ok(forward_absolute(client, peer, req).await)
    }
}

/// Dial the CONNECT target, answer 200, then splice the two sockets.
async fn connect_tunnel(req: Request<Incoming>) -> Response<Body> {
    let Some(authority) = req.uri().authority().map(|a| a.to_string()) else {
        return response::plain(StatusCode::BAD_REQUEST, "CONNECT requires host:port");
    };

    let mut upstream = match TcpStream::connect(authority.as_str()).await {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!(target_addr = %authority, error = %e, "CONNECT dial failed");
            return response::plain(StatusCode::BAD_GATEWAY, "Upstream unreachable");
        }
    };

    tokio::spawn(async move {
        match hyper::upgrade::on(req).await {
            Ok(upgraded) => {
                let mut client = TokioIo::new(upgraded);
                match tokio::io::copy_bidirectional(&mut client, &mut upstream).await {
                    Ok((sent, received)) => {
                        tracing::debug!(target_addr = %authority, sent, received, "CONNECT tunnel closed");
                    }
                    Err(e) => {
                        tracing::debug!(target_addr = %authority, error = %e, "CONNECT tunnel ended");
                    }
                }
            }
            Err(e) => tracing::warn!(error = %e, "CONNECT upgrade failed"),
        }
    });

    Response::new(Body::empty())
}

async fn forward_absolute(client: HttpClient, peer: SocketAddr, req: Request<Incoming>) -> Response<Body> {
    if req.uri().authority().is_none() {
        return response::plain(StatusCode::BAD_REQUEST, "Forward proxy requires an absolute URI");
    }

    let (mut parts, body) = req.into_parts();
    request::prepare_upstream_headers(&mut parts.headers, Some(peer));
    parts.version = Version::HTTP_11;

    match client.request(Request::from_parts(parts, Body::new(body))).await {
        Ok(upstream) => response::from_upstream(upstream),
        Err(e) => {
            tracing::warn!(error = %e, "Forward proxy upstream failed");
            response::plain(StatusCode::BAD_GATEWAY, "Upstream request failed")
        }
    }
}

//! Shared utilities for integration and load testing.
#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderValue, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{
    ErrorResponse, Request as HandshakeRequest, Response as HandshakeResponse,
};
use tokio_tungstenite::tungstenite::Message;

use request_gateway::config::{GatewayConfig, MatchKind, RouteConfig};
use request_gateway::{AppState, GatewayServer, Shutdown};

pub async fn bind_local() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let (listener, addr) = bind_local().await;
    drop(listener);
    addr
}

fn serve(listener: TcpListener, app: Router) {
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
}

/// Backend echoing the request body, with request details in headers.
pub async fn start_echo_backend(name: &'static str) -> SocketAddr {
    let (listener, addr) = bind_local().await;
    let app = Router::new().fallback(move |request: Request<Body>| async move {
        let (parts, body) = request.into_parts();
        let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();

        let mut response = Response::new(Body::from(bytes));
        let headers = response.headers_mut();
        headers.insert("x-backend", HeaderValue::from_static(name));
        headers.insert("x-echo-method", HeaderValue::from_str(parts.method.as_str()).unwrap());
        headers.insert("x-echo-uri", HeaderValue::from_str(&parts.uri.to_string()).unwrap());
        for (from, to) in [
            ("host", "x-echo-host"),
            ("x-forwarded-for", "x-echo-forwarded-for"),
            ("x-request-id", "x-echo-request-id"),
            ("content-type", "x-echo-content-type"),
        ] {
            if let Some(value) = parts.headers.get(from) {
                headers.insert(to, value.clone());
            }
        }
        response
    });
    serve(listener, app);
    addr
}

/// Backend whose status and body come from an async closure.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let (listener, addr) = bind_local().await;
    let f = Arc::new(f);
    let app = Router::new().fallback(move || {
        let f = f.clone();
        async move {
            let (status, body) = f().await;
            let mut response = Response::new(Body::from(body));
            *response.status_mut() = StatusCode::from_u16(status).unwrap();
            response
        }
    });
    serve(listener, app);
    addr
}

/// Backend that accepts connections and never answers.
pub async fn start_silent_backend() -> SocketAddr {
    let (listener, addr) = bind_local().await;
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    addr
}

#[derive(Debug, Clone, PartialEq)]
pub enum WsEvent {
    Connected {
        path: String,
        protocol: Option<String>,
        forwarded_for: Option<String>,
    },
    Received(Message),
    Closed,
    /// The backend dropped the socket without a close handshake.
    Dropped,
}

/// WebSocket backend that echoes text/binary frames and reports events.
///
/// A text frame `close-me` makes the backend close the connection;
/// `drop-me` makes it drop the socket without a close frame.
pub async fn start_ws_backend() -> (SocketAddr, mpsc::UnboundedReceiver<WsEvent>) {
    let (listener, addr) = bind_local().await;
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let tx = tx.clone();
            tokio::spawn(async move {
                let handshake_tx = tx.clone();
                let callback = move |req: &HandshakeRequest,
                                     mut resp: HandshakeResponse|
                      -> Result<HandshakeResponse, ErrorResponse> {
                    let protocol = req
                        .headers()
                        .get("sec-websocket-protocol")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| v.split(',').next())
                        .map(|p| p.trim().to_string());
                    if let Some(p) = &protocol {
                        resp.headers_mut()
                            .insert("sec-websocket-protocol", HeaderValue::from_str(p).unwrap());
                    }
                    let forwarded_for = req
                        .headers()
                        .get("x-forwarded-for")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    let _ = handshake_tx.send(WsEvent::Connected {
                        path: req.uri().path().to_string(),
                        protocol,
                        forwarded_for,
                    });
                    Ok(resp)
                };

                let Ok(mut ws) = tokio_tungstenite::accept_hdr_async(stream, callback).await else {
                    return;
                };

                while let Some(Ok(msg)) = ws.next().await {
                    match msg {
                        Message::Text(ref text) if text.as_str() == "close-me" => {
                            let _ = ws.close(None).await;
                            break;
                        }
                        Message::Text(ref text) if text.as_str() == "drop-me" => {
                            let _ = tx.send(WsEvent::Dropped);
                            return;
                        }
                        Message::Text(_) | Message::Binary(_) => {
                            let _ = tx.send(WsEvent::Received(msg.clone()));
                            if ws.send(msg).await.is_err() {
                                break;
                            }
                        }
                        Message::Close(_) => break,
                        _ => {}
                    }
                }
                let _ = tx.send(WsEvent::Closed);
            });
        }
    });

    (addr, rx)
}

/// Gateway config with no routes, no static files and no forward proxy.
pub fn gateway_config(default_backend: SocketAddr) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.routes.clear();
    config.default_target = format!("http://{}", default_backend);
    config.static_files.enabled = false;
    config.forward_proxy.enabled = false;
    config
}

pub fn route(name: &str, path: &str, match_kind: MatchKind, target: String) -> RouteConfig {
    RouteConfig {
        name: name.to_string(),
        path: path.to_string(),
        match_kind,
        target,
        command: None,
    }
}

/// Start a gateway on an ephemeral port.
pub async fn start_gateway(config: GatewayConfig) -> (SocketAddr, AppState, Shutdown) {
    let (listener, addr) = bind_local().await;
    let server = GatewayServer::new(&config).unwrap();
    let state = server.state().clone();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, state, shutdown)
}

pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

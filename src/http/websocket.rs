//! WebSocket proxy handling.
//!
//! # Responsibilities
//! - Validate the client's upgrade request
//! - Dial the backend before answering the client, so connect failures
//!   surface as ordinary request failures
//! - Complete the client upgrade with the backend's chosen subprotocol
//! - Bidirectional frame forwarding until either side ends
//!
//! # Data Flow
//! ```text
//! Client ←──── WebSocket frames ────→ Gateway ←──── WebSocket frames ────→ Backend
//! ```
//!
//! # Design Decisions
//! - Frame-level forwarding (no message buffering)
//! - Close frames propagated in both directions
//! - When one direction ends the whole tunnel is torn down
//! - The handshake is one breaker call; a tunnel the backend later breaks
//!   adds one failure. Client disconnects are never charged.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::FromRequestParts;
use axum::http::{header, HeaderValue, Request};
use axum::response::Response;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame as BackendCloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as BackendMessage};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use uuid::Uuid;

use crate::error::GatewayError;
use crate::http::request::{append_forwarded_for, X_REQUEST_ID};
use crate::resilience::CircuitBreaker;
use crate::routing::BackendTarget;

type BackendSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Client headers carried over to the backend handshake.
const FORWARDED_HEADERS: [header::HeaderName; 4] = [
    header::ORIGIN,
    header::COOKIE,
    header::AUTHORIZATION,
    header::SEC_WEBSOCKET_PROTOCOL,
];

/// Open a tunnel between the client and `target`.
///
/// Returns the `101 Switching Protocols` response once the backend
/// handshake succeeds; the relay then runs on its own task.
pub async fn tunnel(
    target: &BackendTarget,
    breaker: Arc<CircuitBreaker>,
    connect_timeout: Duration,
    peer: Option<SocketAddr>,
    request: Request<Body>,
) -> Result<Response, GatewayError> {
    let (mut parts, _body) = request.into_parts();

    let upgrade = WebSocketUpgrade::from_request_parts(&mut parts, &())
        .await
        .map_err(|rejection| GatewayError::ProtocolError(rejection.body_text()))?;

    let url = target.url_for(parts.uri.path(), parts.uri.query());
    let mut backend_request = url
        .as_str()
        .into_client_request()
        .map_err(|e| GatewayError::ProtocolError(format!("invalid backend url {}: {}", url, e)))?;

    let headers = backend_request.headers_mut();
    for name in FORWARDED_HEADERS {
        for value in parts.headers.get_all(&name) {
            headers.append(name.clone(), value.clone());
        }
    }
    if let Some(id) = parts.headers.get(X_REQUEST_ID) {
        headers.insert(X_REQUEST_ID, id.clone());
    }
    append_forwarded_for(headers, peer);

    let (backend, handshake) =
        tokio::time::timeout(connect_timeout, tokio_tungstenite::connect_async(backend_request))
            .await
            .map_err(|_| GatewayError::BackendUnreachable(format!("{}: connect timed out", url)))?
            .map_err(|e| match e {
                WsError::Io(e) => GatewayError::BackendUnreachable(format!("{}: {}", url, e)),
                other => GatewayError::ProtocolError(format!("{}: {}", url, other)),
            })?;

    let upgrade = match handshake
        .headers()
        .get(header::SEC_WEBSOCKET_PROTOCOL)
        .and_then(|v| v.to_str().ok())
    {
        Some(protocol) => upgrade.protocols([protocol.to_owned()]),
        None => upgrade,
    };

    let tunnel_id = Uuid::new_v4();
    tracing::info!(tunnel_id = %tunnel_id, backend = %url, "WebSocket tunnel established");

    let set_cookies: Vec<HeaderValue> = handshake
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .cloned()
        .collect();

    let mut response = upgrade
        .on_failed_upgrade(move |e| {
            tracing::warn!(tunnel_id = %tunnel_id, error = %e, "Client upgrade failed");
        })
        .on_upgrade(move |socket| relay(socket, backend, breaker, tunnel_id));

    for cookie in set_cookies {
        response.headers_mut().append(header::SET_COOKIE, cookie);
    }
    Ok(response)
}

/// Which side broke a tunnel.
#[derive(Debug)]
enum RelayError {
    /// The client went away without a close handshake.
    Client(String),
    /// The backend failed; charged to the route's breaker.
    Backend(String),
}

/// Pump frames both ways until one side closes or fails.
async fn relay(client: WebSocket, backend: BackendSocket, breaker: Arc<CircuitBreaker>, tunnel_id: Uuid) {
    let (client_write, client_read) = client.split();
    let (backend_write, backend_read) = backend.split();

    let result = tokio::select! {
        result = client_to_backend(client_read, backend_write) => result,
        result = backend_to_client(backend_read, client_write) => result,
    };

    // Dropping the losing pump releases both sockets.
    match result {
        Ok(()) => tracing::info!(tunnel_id = %tunnel_id, "WebSocket tunnel closed"),
        Err(RelayError::Client(e)) => {
            tracing::info!(tunnel_id = %tunnel_id, error = %e, "WebSocket client disconnected");
        }
        Err(RelayError::Backend(e)) => {
            breaker.record_failure();
            tracing::warn!(tunnel_id = %tunnel_id, command = %breaker.name(), error = %e, "WebSocket tunnel failed");
        }
    }
}

async fn client_to_backend(
    mut client_read: SplitStream<WebSocket>,
    mut backend_write: SplitSink<BackendSocket, BackendMessage>,
) -> Result<(), RelayError> {
    while let Some(msg) = client_read.next().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                let _ = backend_write.send(BackendMessage::Close(None)).await;
                return Err(RelayError::Client(e.to_string()));
            }
        };
        let closing = matches!(msg, Message::Close(_));

        match backend_write.send(to_backend(msg)).await {
            Ok(()) => {}
            Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => return Ok(()),
            Err(e) => return Err(RelayError::Backend(format!("write: {}", e))),
        }
        if closing {
            return Ok(());
        }
    }
    let _ = backend_write.close().await;
    Ok(())
}

async fn backend_to_client(
    mut backend_read: SplitStream<BackendSocket>,
    mut client_write: SplitSink<WebSocket, Message>,
) -> Result<(), RelayError> {
    while let Some(msg) = backend_read.next().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => break,
            Err(e) => {
                let _ = client_write.close().await;
                return Err(RelayError::Backend(format!("read: {}", e)));
            }
        };
        let closing = matches!(msg, BackendMessage::Close(_));

        let Some(msg) = to_client(msg) else {
            continue;
        };
        if let Err(e) = client_write.send(msg).await {
            return Err(RelayError::Client(e.to_string()));
        }
        if closing {
            return Ok(());
        }
    }
    let _ = client_write.close().await;
    Ok(())
}

fn to_backend(msg: Message) -> BackendMessage {
    match msg {
        Message::Text(text) => BackendMessage::Text(text.as_str().to_owned().into()),
        Message::Binary(data) => BackendMessage::Binary(data),
        Message::Ping(data) => BackendMessage::Ping(data),
        Message::Pong(data) => BackendMessage::Pong(data),
        Message::Close(frame) => BackendMessage::Close(frame.map(|f| BackendCloseFrame {
            code: CloseCode::from(f.code),
            reason: f.reason.as_str().to_owned().into(),
        })),
    }
}

fn to_client(msg: BackendMessage) -> Option<Message> {
    let msg = match msg {
        BackendMessage::Text(text) => Message::Text(text.as_str().to_owned().into()),
        BackendMessage::Binary(data) => Message::Binary(data),
        BackendMessage::Ping(data) => Message::Ping(data),
        BackendMessage::Pong(data) => Message::Pong(data),
        BackendMessage::Close(frame) => Message::Close(frame.map(|f| CloseFrame {
            code: f.code.into(),
            reason: f.reason.as_str().to_owned().into(),
        })),
        BackendMessage::Frame(_) => return None,
    };
    Some(msg)
}

//! Request handling and transformation.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers before a request leaves the gateway
//! - Record the client address in `x-forwarded-for`
//!
//! The original request's `Host` header is kept so backends see the name
//! the client asked for.

use std::net::SocketAddr;

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};

/// Header carrying the per-request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Headers meaningful only for a single transport-level connection.
const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "proxy-connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Remove hop-by-hop headers, including any named by `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

/// Append the client address to `x-forwarded-for`.
pub fn append_forwarded_for(headers: &mut HeaderMap, peer: Option<SocketAddr>) {
    let Some(peer) = peer else {
        return;
    };
    let ip = peer.ip().to_string();
    let value = match headers.get(&X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(prior) => format!("{}, {}", prior, ip),
        None => ip,
    };
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}

/// Prepare inbound headers for an upstream HTTP request.
pub fn prepare_upstream_headers(headers: &mut HeaderMap, peer: Option<SocketAddr>) {
    strip_hop_by_hop(headers);
    append_forwarded_for(headers, peer);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_hop_by_hop_and_listed_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive, x-session-hint"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert("x-session-hint", HeaderValue::from_static("abc"));
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert(header::HOST, HeaderValue::from_static("gateway.local"));
        headers.insert("x-custom", HeaderValue::from_static("kept"));

        strip_hop_by_hop(&mut headers);

        assert!(headers.get(header::CONNECTION).is_none());
        assert!(headers.get("keep-alive").is_none());
        assert!(headers.get("x-session-hint").is_none());
        assert!(headers.get(header::TRANSFER_ENCODING).is_none());
        assert_eq!(headers.get(header::HOST).unwrap(), "gateway.local");
        assert_eq!(headers.get("x-custom").unwrap(), "kept");
    }

    #[test]
    fn test_forwarded_for_appends() {
        let peer: SocketAddr = "10.0.0.7:5555".parse().unwrap();

        let mut headers = HeaderMap::new();
        append_forwarded_for(&mut headers, Some(peer));
        assert_eq!(headers.get(&X_FORWARDED_FOR).unwrap(), "10.0.0.7");

        let mut headers = HeaderMap::new();
        headers.insert(X_FORWARDED_FOR, HeaderValue::from_static("192.168.1.1"));
        append_forwarded_for(&mut headers, Some(peer));
        assert_eq!(headers.get(&X_FORWARDED_FOR).unwrap(), "192.168.1.1, 10.0.0.7");

        let mut headers = HeaderMap::new();
        append_forwarded_for(&mut headers, None);
        assert!(headers.is_empty());
    }
}

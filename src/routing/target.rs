//! Backend target descriptors.
//!
//! A target is one downstream service instance, parsed from a URL at
//! startup and never mutated afterwards.

use url::Url;

/// Protocol spoken to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Http,
    WebSocket,
}

impl Protocol {
    pub fn scheme(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::WebSocket => "ws",
        }
    }
}

/// Why a target URL was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    #[error("{0}")]
    Url(#[from] url::ParseError),

    #[error("unsupported scheme `{0}` (expected http or ws)")]
    UnsupportedScheme(String),

    #[error("missing host")]
    MissingHost,
}

/// A resolved downstream service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendTarget {
    pub protocol: Protocol,
    /// `host:port` authority.
    pub host: String,
    /// Path that replaces the request path, when the target URL carries one.
    pub rewrite_path: Option<String>,
}

impl BackendTarget {
    /// Parse `http://host[:port][/path]` or `ws://host[:port][/path]`.
    pub fn parse(raw: &str) -> Result<Self, TargetError> {
        let url = Url::parse(raw)?;

        let protocol = match url.scheme() {
            "http" => Protocol::Http,
            "ws" => Protocol::WebSocket,
            other => return Err(TargetError::UnsupportedScheme(other.to_string())),
        };

        let host = url.host_str().ok_or(TargetError::MissingHost)?;
        let host = match url.port_or_known_default() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        let rewrite_path = match url.path() {
            "" | "/" => None,
            path => Some(path.to_string()),
        };

        Ok(Self {
            protocol,
            host,
            rewrite_path,
        })
    }

    /// Path and query to send upstream for a request with `path` and `query`.
    pub fn path_and_query(&self, path: &str, query: Option<&str>) -> String {
        let path = self.rewrite_path.as_deref().unwrap_or(path);
        let path = if path.is_empty() { "/" } else { path };
        match query {
            Some(q) if !q.is_empty() => format!("{}?{}", path, q),
            _ => path.to_string(),
        }
    }

    /// Full upstream URL for a request with `path` and `query`.
    pub fn url_for(&self, path: &str, query: Option<&str>) -> String {
        format!(
            "{}://{}{}",
            self.protocol.scheme(),
            self.host,
            self.path_and_query(path, query)
        )
    }
}

impl std::fmt::Display for BackendTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}://{}", self.protocol.scheme(), self.host)?;
        if let Some(path) = &self.rewrite_path {
            write!(f, "{}", path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_http_target() {
        let target = BackendTarget::parse("http://localhost:9980").unwrap();
        assert_eq!(target.protocol, Protocol::Http);
        assert_eq!(target.host, "localhost:9980");
        assert_eq!(target.rewrite_path, None);
    }

    #[test]
    fn test_parse_ws_target_with_path() {
        let target = BackendTarget::parse("ws://localhost:10086/ray").unwrap();
        assert_eq!(target.protocol, Protocol::WebSocket);
        assert_eq!(target.rewrite_path.as_deref(), Some("/ray"));
        assert_eq!(target.url_for("/ignored", Some("a=1")), "ws://localhost:10086/ray?a=1");
    }

    #[test]
    fn test_default_port_is_filled_in() {
        let target = BackendTarget::parse("http://backend.internal").unwrap();
        assert_eq!(target.host, "backend.internal:80");
    }

    #[test]
    fn test_rejects_bad_targets() {
        assert!(matches!(
            BackendTarget::parse("https://localhost:443"),
            Err(TargetError::UnsupportedScheme(_))
        ));
        assert!(matches!(BackendTarget::parse("localhost:9980"), Err(_)));
        assert!(matches!(
            BackendTarget::parse("not a url"),
            Err(TargetError::Url(_))
        ));
    }

    #[test]
    fn test_request_path_preserved_without_rewrite() {
        let target = BackendTarget::parse("http://localhost:9980").unwrap();
        assert_eq!(target.path_and_query("/api/items", Some("page=2")), "/api/items?page=2");
        assert_eq!(target.path_and_query("", None), "/");
    }
}

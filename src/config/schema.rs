//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Inbound listener.
    pub listener: ListenerConfig,

    /// Route rules mapping path patterns to backends.
    pub routes: Vec<RouteConfig>,

    /// Catch-all reverse-proxy target for unmatched paths.
    pub default_target: String,

    /// Circuit breaker commands.
    pub breaker: BreakerConfig,

    /// Backend timeouts.
    pub timeouts: TimeoutConfig,

    /// Static file collaborator.
    pub static_files: StaticFilesConfig,

    /// Generic pass-through forward proxy.
    pub forward_proxy: ForwardProxyConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            routes: default_routes(),
            default_target: "http://localhost:9980".to_string(),
            breaker: BreakerConfig::default(),
            timeouts: TimeoutConfig::default(),
            static_files: StaticFilesConfig::default(),
            forward_proxy: ForwardProxyConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Replace the port of the listener bind address, keeping the host.
    pub fn set_port(&mut self, port: u16) {
        let host = self
            .listener
            .bind_address
            .rsplit_once(':')
            .map(|(host, _)| host)
            .unwrap_or("0.0.0.0");
        self.listener.bind_address = format!("{}:{}", host, port);
    }
}

fn default_routes() -> Vec<RouteConfig> {
    vec![
        RouteConfig {
            name: "ws-primary".to_string(),
            path: "/ws".to_string(),
            match_kind: MatchKind::Exact,
            target: "ws://localhost:9980/ws".to_string(),
            command: None,
        },
        RouteConfig {
            name: "ws-ray".to_string(),
            path: "/ray".to_string(),
            match_kind: MatchKind::Exact,
            target: "ws://localhost:10086/ray".to_string(),
            command: None,
        },
        RouteConfig {
            name: "ray".to_string(),
            path: "/ray".to_string(),
            match_kind: MatchKind::Prefix,
            target: "http://localhost:10086".to_string(),
            command: None,
        },
    ]
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// How a route's `path` is compared against the request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    /// Request path must equal `path`.
    Exact,
    /// Request path must start with `path`.
    #[default]
    Prefix,
}

/// A single route rule.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging.
    pub name: String,

    /// Path pattern.
    pub path: String,

    /// Exact or prefix match.
    #[serde(default, rename = "match")]
    pub match_kind: MatchKind,

    /// Backend URL, `http://host:port[/path]` or `ws://host:port[/path]`.
    pub target: String,

    /// Breaker command protecting this route (default command if unset).
    #[serde(default)]
    pub command: Option<String>,
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Command used by routes that do not name one.
    pub default_command: String,

    /// Per-command settings.
    pub commands: HashMap<String, CommandConfig>,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        let default_command = "gateway".to_string();
        let mut commands = HashMap::new();
        commands.insert(default_command.clone(), CommandConfig::default());
        Self {
            default_command,
            commands,
        }
    }
}

/// Settings for one breaker command.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CommandConfig {
    /// Time a call may run before it counts as a timeout.
    pub timeout_ms: u64,

    /// Maximum calls in flight at once.
    pub max_concurrent: usize,

    /// Error percentage above which the circuit opens.
    pub error_threshold_percent: u32,

    /// Minimum calls in the window before the error rate is considered.
    pub request_volume_threshold: u64,

    /// Cool-down before an open circuit admits a trial call.
    pub sleep_window_ms: u64,

    /// Length of the rolling outcome window, in one-second buckets.
    pub rolling_window_secs: u64,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 1000,
            max_concurrent: 100,
            error_threshold_percent: 25,
            request_volume_threshold: 20,
            sleep_window_ms: 5000,
            rolling_window_secs: 10,
        }
    }
}

/// Timeout configuration for backend connections.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Backend connection establishment timeout in milliseconds.
    pub connect_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { connect_ms: 1000 }
    }
}

/// Static file serving.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StaticFilesConfig {
    pub enabled: bool,
    /// URL prefix the directory is mounted under.
    pub mount: String,
    /// Local directory.
    pub dir: String,
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mount: "/test".to_string(),
            dir: "./public".to_string(),
        }
    }
}

/// Forward proxy listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ForwardProxyConfig {
    pub enabled: bool,
    pub bind_address: String,
}

impl Default for ForwardProxyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "0.0.0.0:18080".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Install the Prometheus recorder for breaker metrics.
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Json,
            metrics_enabled: true,
        }
    }
}

//! request-gateway
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────────┐
//!                    │                       GATEWAY                        │
//!   Client Request   │  ┌──────────┐   ┌──────────┐   ┌──────────────────┐  │
//!   ─────────────────┼─▶│ counters │──▶│ breaker  │──▶│ BackendDirectory │  │
//!                    │  │ registry │   │ envelope │   │  (path → target) │  │
//!                    │  └──────────┘   └──────────┘   └────────┬─────────┘  │
//!                    │                                         │            │
//!                    │                      ┌──────────────────┴────┐       │
//!                    │                      ▼                       ▼       │
//!                    │               ┌────────────┐         ┌────────────┐  │
//!   Client Response  │               │ HTTP proxy │         │ WS tunnel  │  │
//!   ◀────────────────┼───────────────│  adapter   │         │  adapter   │◀─┼── Backends
//!                    │               └────────────┘         └────────────┘  │
//!                    └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use request_gateway::config::resolve_config;
use request_gateway::forward::ForwardProxy;
use request_gateway::observability::{logging, metrics};
use request_gateway::{AppState, GatewayServer, Shutdown};

#[derive(Parser, Debug)]
#[command(name = "request-gateway", version, about = "Path-routing HTTP/WebSocket gateway")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listener port, overriding the configured bind address.
    #[arg(long, env = "PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = resolve_config(cli.config.as_deref(), cli.port)?;

    logging::init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
        default_target = %config.default_target,
        "Configuration loaded"
    );

    let prometheus = if config.observability.metrics_enabled {
        metrics::init_metrics()
    } else {
        None
    };

    let state = AppState::from_config(&config)?.with_prometheus(prometheus);
    let shutdown = Shutdown::new();

    if config.forward_proxy.enabled {
        let listener = TcpListener::bind(&config.forward_proxy.bind_address).await?;
        let proxy = ForwardProxy::new(state.client.clone());
        let proxy_shutdown = shutdown.subscribe();
        tokio::spawn(async move {
            if let Err(e) = proxy.run(listener, proxy_shutdown).await {
                tracing::error!(error = %e, "Forward proxy failed");
            }
        });
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = GatewayServer::with_state(&config, state);
    let server_shutdown = shutdown.subscribe();

    let serve = server.run(listener, server_shutdown);
    tokio::pin!(serve);

    let signalled = tokio::select! {
        result = &mut serve => {
            result?;
            false
        }
        _ = shutdown.trigger_on_signal() => true,
    };
    if signalled {
        serve.await?;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

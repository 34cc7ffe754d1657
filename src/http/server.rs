//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the gateway fallback and fixed endpoints
//! - Wire up middleware (request counting, tracing, request ID)
//! - Bind server to listener
//! - Dispatch requests through the breaker envelope to an adapter

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::config::{GatewayConfig, StaticFilesConfig};
use crate::error::GatewayError;
use crate::http::{collaborators, proxy, websocket};
use crate::observability::CounterRegistry;
use crate::resilience::{BreakerRegistry, CircuitBreaker};
use crate::routing::{BackendDirectory, DirectoryError, Protocol, Route};

/// Failure building [`AppState`] from configuration.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error("request counters: {0}")]
    Counters(#[from] prometheus::Error),
}

/// Application state injected into handlers.
///
/// Everything shared between requests lives here; nothing is global.
#[derive(Clone)]
pub struct AppState {
    pub directory: Arc<BackendDirectory>,
    pub breakers: Arc<BreakerRegistry>,
    pub counters: Arc<CounterRegistry>,
    pub client: proxy::HttpClient,
    pub connect_timeout: Duration,
    pub prometheus: Option<PrometheusHandle>,
}

impl AppState {
    /// Build fresh state from validated configuration.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, StateError> {
        let connect_timeout = Duration::from_millis(config.timeouts.connect_ms);
        Ok(Self {
            directory: Arc::new(BackendDirectory::from_config(config)?),
            breakers: Arc::new(BreakerRegistry::from_config(&config.breaker)),
            counters: Arc::new(CounterRegistry::new()?),
            client: proxy::build_client(connect_timeout),
            connect_timeout,
            prometheus: None,
        })
    }

    pub fn with_prometheus(mut self, handle: Option<PrometheusHandle>) -> Self {
        self.prometheus = handle;
        self
    }
}

/// HTTP server for the gateway.
pub struct GatewayServer {
    router: Router,
    state: AppState,
}

impl GatewayServer {
    /// Create a server with fresh state built from `config`.
    pub fn new(config: &GatewayConfig) -> Result<Self, StateError> {
        Ok(Self::with_state(config, AppState::from_config(config)?))
    }

    /// Create a server around existing state.
    pub fn with_state(config: &GatewayConfig, state: AppState) -> Self {
        let router = build_router(&config.static_files, state.clone());
        Self { router, state }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn into_router(self) -> Router {
        self.router
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Gateway listening");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Gateway draining");
            })
            .await?;

        tracing::info!("Gateway stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
pub fn build_router(static_files: &StaticFilesConfig, state: AppState) -> Router {
    let mut router = Router::new()
        .route("/metrics", get(collaborators::metrics))
        .route("/health", get(collaborators::health))
        .route("/run", get(collaborators::run));

    if static_files.enabled {
        router = router.nest_service(&static_files.mount, ServeDir::new(&static_files.dir));
    }

    router
        .fallback(gateway_handler)
        .layer(middleware::from_fn_with_state(state.clone(), count_requests))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
}

/// Count every inbound request by path and method.
async fn count_requests(State(state): State<AppState>, request: Request<Body>, next: Next) -> Response {
    state
        .counters
        .increment(request.uri().path(), request.method().as_str());
    next.run(request).await
}

/// Gateway entry point for every path without a fixed endpoint.
async fn gateway_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let path = request.uri().path().to_string();
    let method = request.method().clone();

    let route = state.directory.resolve(&path);
    let breaker = state.breakers.command(&route.command);

    tracing::debug!(
        method = %method,
        path = %path,
        route = %route.name,
        target = %route.target,
        command = %route.command,
        "Dispatching request"
    );

    match breaker.execute(dispatch(&state, route, breaker.clone(), peer, request)).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(
                method = %method,
                path = %path,
                route = %route.name,
                kind = e.kind(),
                error = %e,
                "Request failed"
            );
            e.into_response()
        }
    }
}

async fn dispatch(
    state: &AppState,
    route: &Route,
    breaker: Arc<CircuitBreaker>,
    peer: Option<SocketAddr>,
    request: Request<Body>,
) -> Result<Response, GatewayError> {
    match route.target.protocol {
        Protocol::Http => proxy::forward(&state.client, &route.target, peer, request).await,
        Protocol::WebSocket => {
            websocket::tunnel(&route.target, breaker, state.connect_timeout, peer, request).await
        }
    }
}

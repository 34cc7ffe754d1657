//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request counting, breaker envelope)
//!     → [routing::BackendDirectory picks the route]
//!     → proxy.rs (plain HTTP rewrite) | websocket.rs (upgrade + tunnel)
//!     → request.rs / response.rs (hop-by-hop headers, x-forwarded-for)
//!     → Send to client
//! ```

pub mod collaborators;
pub mod proxy;
pub mod request;
pub mod response;
pub mod server;
pub mod websocket;

pub use request::X_REQUEST_ID;
pub use server::{AppState, GatewayServer, StateError};

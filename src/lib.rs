//! Path-routing HTTP/WebSocket gateway with circuit breaking.

pub mod config;
pub mod error;
pub mod forward;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod routing;

pub use config::schema::GatewayConfig;
pub use error::GatewayError;
pub use http::{AppState, GatewayServer};
pub use lifecycle::Shutdown;

//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional) + PORT
//!     → loader.rs (parse & deserialize, apply port override)
//!     → validation.rs (semantic checks, all errors collected)
//!     → GatewayConfig (validated, immutable)
//!     → compiled into BackendDirectory + BreakerRegistry at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Any validation error aborts startup

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{read_config, resolve_config, ConfigError};
pub use schema::{
    BreakerConfig, CommandConfig, ForwardProxyConfig, GatewayConfig, ListenerConfig, LogFormat,
    MatchKind, ObservabilityConfig, RouteConfig, StaticFilesConfig, TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};

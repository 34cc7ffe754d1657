//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → directory.rs (ordered rule scan)
//!     → matcher.rs (exact / prefix evaluation)
//!     → Return: matched Route, or the catch-all Route
//!
//! Route Compilation (at startup):
//!     RouteConfig[] + default_target
//!     → target.rs (parse URLs, fatal on error)
//!     → sort by precedence
//!     → freeze as immutable BackendDirectory
//! ```

pub mod directory;
pub mod matcher;
pub mod target;

pub use directory::{BackendDirectory, DirectoryError, Route, DEFAULT_ROUTE};
pub use matcher::PathMatcher;
pub use target::{BackendTarget, Protocol, TargetError};

//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Build state → Bind listeners
//!
//! Shutdown (shutdown.rs):
//!     SIGINT/SIGTERM → broadcast → listeners stop accepting → drain → exit
//! ```
//!
//! Any startup error is fatal.

pub mod shutdown;

pub use shutdown::Shutdown;

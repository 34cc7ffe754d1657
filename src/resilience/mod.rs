//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request dispatch:
//!     → registry.rs (look up the route's command)
//!     → circuit_breaker.rs (state check, concurrency permit)
//!     → run the adapter, raced against the command timeout
//!     → rolling.rs (record outcome, derive error rate)
//! ```
//!
//! # Design Decisions
//! - Fail fast: rejected calls never reach the backend
//! - Every call has a deadline
//! - No retries

pub mod circuit_breaker;
pub mod registry;
pub mod rolling;

pub use circuit_breaker::{BreakerSnapshot, CircuitBreaker, CircuitState, Permit};
pub use registry::BreakerRegistry;
pub use rolling::{Counts, Outcome, RollingWindow};

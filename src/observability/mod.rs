//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Router:
//!     → counters.rs (per route/method request counts)
//! Breakers:
//!     → metrics.rs (events and open state via the metrics facade)
//! All subsystems:
//!     → logging.rs (structured tracing events)
//!
//! Consumers:
//!     → GET /metrics (Prometheus scrape)
//!     → stdout (JSON logs)
//! ```

pub mod counters;
pub mod logging;
pub mod metrics;

pub use counters::CounterRegistry;

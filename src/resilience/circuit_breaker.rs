//! Circuit breaker for backend protection.
//!
//! # States
//! - Closed: normal operation, calls pass while under `max_concurrent`
//! - Open: backend assumed down, calls fail fast
//! - Half-Open: one trial call is in flight
//!
//! # State Transitions
//! ```text
//! Closed → Open: error rate > threshold (with enough volume) in the window
//! Open → Half-Open: first call after the sleep window becomes the trial
//! Half-Open → Closed: trial succeeds (window reset)
//! Half-Open → Open: trial fails, times out or is cancelled
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use crate::config::CommandConfig;
use crate::error::{GatewayError, RejectReason};
use crate::observability::metrics;
use crate::resilience::rolling::{Counts, Outcome, RollingWindow};

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    /// When the circuit last opened (or the last trial failed).
    opened_at: Instant,
    window: RollingWindow,
}

/// One named breaker command.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CommandConfig,
    in_flight: AtomicUsize,
    inner: Mutex<Inner>,
}

/// Point-in-time view of a breaker, for logs and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerSnapshot {
    pub state: CircuitState,
    pub in_flight: usize,
    pub counts: Counts,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CommandConfig) -> Self {
        let window = RollingWindow::new(Duration::from_secs(config.rolling_window_secs));
        Self {
            name: name.into(),
            config,
            in_flight: AtomicUsize::new(0),
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                opened_at: Instant::now(),
                window,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CommandConfig {
        &self.config
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.config.timeout_ms)
    }

    fn sleep_window(&self) -> Duration {
        Duration::from_millis(self.config.sleep_window_ms)
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let mut inner = self.inner.lock();
        BreakerSnapshot {
            state: inner.state,
            in_flight: self.in_flight.load(Ordering::Acquire),
            counts: inner.window.totals(Instant::now()),
        }
    }

    /// Run `work` under this breaker.
    ///
    /// Rejections return without polling `work`. A call still running when
    /// the timeout fires is dropped and counted as a timeout.
    pub async fn execute<F, T>(self: &Arc<Self>, work: F) -> Result<T, GatewayError>
    where
        F: Future<Output = Result<T, GatewayError>>,
    {
        let permit = self.try_acquire().map_err(GatewayError::BreakerRejected)?;

        match tokio::time::timeout(self.timeout(), work).await {
            Ok(Ok(value)) => {
                permit.complete(Outcome::Success);
                Ok(value)
            }
            Ok(Err(e)) => {
                permit.complete(Outcome::Failure);
                Err(e)
            }
            Err(_) => {
                permit.complete(Outcome::Timeout);
                Err(GatewayError::BreakerTimeout)
            }
        }
    }

    /// Ask for permission to run one call.
    pub fn try_acquire(self: &Arc<Self>) -> Result<Permit, RejectReason> {
        let now = Instant::now();
        let mut inner = self.inner.lock();

        let trial = match inner.state {
            CircuitState::Closed => false,
            CircuitState::Open if now >= inner.opened_at + self.sleep_window() => true,
            CircuitState::Open | CircuitState::HalfOpen => {
                self.observe(&mut inner, Outcome::ShortCircuited, now);
                return Err(RejectReason::CircuitOpen);
            }
        };

        if !self.try_reserve_slot() {
            self.observe(&mut inner, Outcome::Rejected, now);
            return Err(RejectReason::ConcurrencyLimit);
        }

        if trial {
            inner.state = CircuitState::HalfOpen;
            tracing::info!(command = %self.name, "Circuit half-open, admitting trial call");
        }

        Ok(Permit {
            breaker: self.clone(),
            trial,
            completed: false,
        })
    }

    /// Record a failure that happened outside a permit, e.g. a tunnel that
    /// broke after its handshake call already completed.
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        self.observe(&mut inner, Outcome::Failure, Instant::now());
    }

    fn try_reserve_slot(&self) -> bool {
        let mut current = self.in_flight.load(Ordering::Acquire);
        loop {
            if current >= self.config.max_concurrent {
                return false;
            }
            match self.in_flight.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    fn release_slot(&self) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
    }

    /// Count an outcome and trip the circuit if a closed breaker crosses
    /// the threshold.
    fn observe(&self, inner: &mut Inner, outcome: Outcome, now: Instant) {
        inner.window.record(outcome, now);
        metrics::record_breaker_event(&self.name, outcome);

        if inner.state != CircuitState::Closed || !outcome.is_error() {
            return;
        }

        let counts = inner.window.totals(now);
        if counts.total() >= self.config.request_volume_threshold
            && counts.error_rate_exceeds(self.config.error_threshold_percent)
        {
            inner.state = CircuitState::Open;
            inner.opened_at = now;
            metrics::record_breaker_open(&self.name, true);
            tracing::warn!(
                command = %self.name,
                error_percent = counts.error_percent(),
                total = counts.total(),
                "Circuit opened"
            );
        }
    }

    fn finish(&self, outcome: Outcome, trial: bool) {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        self.observe(&mut inner, outcome, now);

        if !trial {
            return;
        }

        if outcome == Outcome::Success {
            inner.state = CircuitState::Closed;
            inner.window.reset();
            metrics::record_breaker_open(&self.name, false);
            tracing::info!(command = %self.name, "Trial call succeeded, circuit closed");
        } else {
            inner.state = CircuitState::Open;
            inner.opened_at = now;
            tracing::warn!(command = %self.name, outcome = outcome.as_str(), "Trial call failed, circuit re-opened");
        }
    }

    fn abandon_trial(&self) {
        let mut inner = self.inner.lock();
        if inner.state == CircuitState::HalfOpen {
            inner.state = CircuitState::Open;
            inner.opened_at = Instant::now();
            tracing::debug!(command = %self.name, "Trial call cancelled, circuit re-opened");
        }
    }
}

/// Permission to run one call. Holds a concurrency slot until dropped.
#[derive(Debug)]
pub struct Permit {
    breaker: Arc<CircuitBreaker>,
    trial: bool,
    completed: bool,
}

impl Permit {
    pub fn is_trial(&self) -> bool {
        self.trial
    }

    /// Report how the call ended and release the slot.
    pub fn complete(mut self, outcome: Outcome) {
        self.completed = true;
        self.breaker.finish(outcome, self.trial);
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        if self.trial && !self.completed {
            self.breaker.abandon_trial();
        }
        self.breaker.release_slot();
    }
}

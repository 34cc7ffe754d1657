//! Rolling outcome window.
//!
//! Outcomes are counted in one-second buckets; buckets older than the
//! window length are evicted lazily on every access.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

/// Result of one call as seen by the breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
    Timeout,
    /// Refused because of the concurrency limit.
    Rejected,
    /// Refused because the circuit was open.
    ShortCircuited,
}

impl Outcome {
    pub fn is_error(&self) -> bool {
        !matches!(self, Outcome::Success)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Failure => "failure",
            Outcome::Timeout => "timeout",
            Outcome::Rejected => "rejected",
            Outcome::ShortCircuited => "short_circuited",
        }
    }
}

/// Outcome counts over some span of time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub success: u64,
    pub failure: u64,
    pub timeout: u64,
    pub rejected: u64,
    pub short_circuited: u64,
}

impl Counts {
    fn add(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Success => self.success += 1,
            Outcome::Failure => self.failure += 1,
            Outcome::Timeout => self.timeout += 1,
            Outcome::Rejected => self.rejected += 1,
            Outcome::ShortCircuited => self.short_circuited += 1,
        }
    }

    fn merge(&mut self, other: &Counts) {
        self.success += other.success;
        self.failure += other.failure;
        self.timeout += other.timeout;
        self.rejected += other.rejected;
        self.short_circuited += other.short_circuited;
    }

    pub fn errors(&self) -> u64 {
        self.failure + self.timeout + self.rejected + self.short_circuited
    }

    pub fn total(&self) -> u64 {
        self.success + self.errors()
    }

    /// Integer error percentage, 0 when empty.
    pub fn error_percent(&self) -> u64 {
        match self.total() {
            0 => 0,
            total => self.errors() * 100 / total,
        }
    }

    /// True if the error rate is strictly above `threshold` percent.
    pub fn error_rate_exceeds(&self, threshold: u32) -> bool {
        self.errors() * 100 > u64::from(threshold) * self.total()
    }
}

/// Time-bucketed outcome counter.
#[derive(Debug)]
pub struct RollingWindow {
    origin: Instant,
    buckets: VecDeque<(u64, Counts)>,
    len_secs: u64,
}

impl RollingWindow {
    pub fn new(len: Duration) -> Self {
        Self {
            origin: Instant::now(),
            buckets: VecDeque::new(),
            len_secs: len.as_secs().max(1),
        }
    }

    fn slot(&self, now: Instant) -> u64 {
        now.saturating_duration_since(self.origin).as_secs()
    }

    fn evict(&mut self, current: u64) {
        while let Some((slot, _)) = self.buckets.front() {
            if slot + self.len_secs <= current {
                self.buckets.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn record(&mut self, outcome: Outcome, now: Instant) {
        let current = self.slot(now);
        self.evict(current);
        match self.buckets.back_mut() {
            Some((slot, counts)) if *slot == current => counts.add(outcome),
            _ => {
                let mut counts = Counts::default();
                counts.add(outcome);
                self.buckets.push_back((current, counts));
            }
        }
    }

    /// Totals over the live part of the window.
    pub fn totals(&mut self, now: Instant) -> Counts {
        self.evict(self.slot(now));
        let mut totals = Counts::default();
        for (_, counts) in &self.buckets {
            totals.merge(counts);
        }
        totals
    }

    pub fn reset(&mut self) {
        self.buckets.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_counts_within_window() {
        let mut window = RollingWindow::new(Duration::from_secs(10));
        let now = Instant::now();
        window.record(Outcome::Success, now);
        window.record(Outcome::Failure, now);
        window.record(Outcome::Timeout, now + Duration::from_secs(3));

        let totals = window.totals(now + Duration::from_secs(3));
        assert_eq!(totals.total(), 3);
        assert_eq!(totals.errors(), 2);
        assert_eq!(totals.error_percent(), 66);
    }

    #[tokio::test(start_paused = true)]
    async fn test_old_buckets_expire() {
        let mut window = RollingWindow::new(Duration::from_secs(10));
        let now = Instant::now();
        window.record(Outcome::Failure, now);
        window.record(Outcome::Success, now + Duration::from_secs(5));

        let totals = window.totals(now + Duration::from_secs(10));
        assert_eq!(totals.total(), 1);
        assert_eq!(totals.success, 1);

        let totals = window.totals(now + Duration::from_secs(30));
        assert_eq!(totals.total(), 0);
    }

    #[test]
    fn test_threshold_is_strict() {
        let counts = Counts {
            success: 3,
            failure: 1,
            ..Counts::default()
        };
        assert!(!counts.error_rate_exceeds(25));
        assert!(counts.error_rate_exceeds(24));
        assert!(!Counts::default().error_rate_exceeds(0));
    }
}

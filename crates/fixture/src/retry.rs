//! Bounded polling with exponential backoff.

use crate::config::BackoffPolicy;
use docfix_core::{Error, Result};
use std::time::{Duration, Instant};
use tracing::trace;

/// Delays produced by a [`BackoffPolicy`].
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
    max: Duration,
    multiplier: f64,
}

impl Backoff {
    /// Start a backoff sequence.
    pub fn new(policy: &BackoffPolicy) -> Self {
        Self {
            next: Duration::from_millis(policy.initial_ms),
            max: Duration::from_millis(policy.max_ms.max(policy.initial_ms)),
            multiplier: policy.multiplier.max(1.0),
        }
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let current = self.next;
        self.next = self.next.mul_f64(self.multiplier).min(self.max);
        Some(current)
    }
}

/// Call `attempt` until it yields a value or `timeout` elapses.
///
/// `attempt` returns `Ok(None)` to ask for another try and `Err` to stop
/// immediately. On deadline the result is `Error::Timeout` for `operation`.
/// The first attempt always runs, even with a zero timeout.
pub fn poll_with_backoff<T>(
    operation: &str,
    timeout: Duration,
    policy: &BackoffPolicy,
    mut attempt: impl FnMut() -> Result<Option<T>>,
) -> Result<T> {
    let deadline = Instant::now() + timeout;
    let mut delays = Backoff::new(policy);
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        if let Some(value) = attempt()? {
            return Ok(value);
        }
        let now = Instant::now();
        if now >= deadline {
            trace!(operation, attempts, "poll deadline reached");
            return Err(Error::timeout(operation, timeout));
        }
        let delay = delays.next().unwrap_or(timeout).min(deadline - now);
        std::thread::sleep(delay);
    }
}

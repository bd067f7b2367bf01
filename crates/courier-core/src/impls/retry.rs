//! Retry policy for relational writes that could not obtain an identifier.
//!
//! Only storage writes are retried. Outbound calls never are.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::warn;

/// Bounded exponential retry.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Never unbounded.
    pub max_attempts: u32,

    /// Delay before the second attempt.
    pub base_delay: Duration,

    /// Backoff multiplier for exponential backoff.
    pub multiplier: f64,

    /// Upper bound for a single delay.
    pub max_delay: Duration,

    /// Stop retrying once this much time has passed since the first attempt.
    /// Each attempt may itself block (e.g. on SQLite's busy timeout).
    pub max_elapsed: Option<Duration>,
}

impl RetryPolicy {
    /// Policy for the SQLite insert path: 100 attempts, 1ms doubling, capped at 50ms,
    /// at most 30s in total.
    pub fn for_inserts() -> Self {
        Self {
            max_attempts: 100,
            base_delay: Duration::from_millis(1),
            multiplier: 2.0,
            max_delay: Duration::from_millis(50),
            max_elapsed: Some(Duration::from_secs(30)),
        }
    }

    /// Delay after the given number of failed attempts (1-indexed).
    ///
    /// delay = min(base_delay * multiplier^(attempts - 1), max_delay)
    pub fn next_delay(&self, attempts: u32) -> Duration {
        let base_nanos = self.base_delay.as_nanos() as f64;
        let exponent = attempts.saturating_sub(1).min(i32::MAX as u32) as i32;
        let delay_nanos = base_nanos * self.multiplier.powi(exponent);
        if !delay_nanos.is_finite() || delay_nanos >= self.max_delay.as_nanos() as f64 {
            return self.max_delay;
        }
        Duration::from_nanos(delay_nanos.round() as u64)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error,
    /// or `max_attempts` / `max_elapsed` is used up. Returns the last error
    /// in the latter cases.
    pub async fn run<T, E, F, Fut, R>(&self, mut op: F, is_retryable: R) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        R: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let started = Instant::now();
        let mut attempts = 0;
        loop {
            attempts += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(err)
                    if attempts < max_attempts
                        && !self.out_of_time(started)
                        && is_retryable(&err) =>
                {
                    let delay = self.next_delay(attempts);
                    warn!(attempts, max_attempts, error = %err, ?delay, "retrying history insert");
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn out_of_time(&self, started: Instant) -> bool {
        self.max_elapsed.is_some_and(|limit| started.elapsed() >= limit)
    }
}

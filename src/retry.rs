/// Bounded retry with exponential backoff.
///
/// One explicit policy object shared by the remote client and the store,
/// instead of retry behavior hidden inside each call site. The caller
/// supplies the retryable-error predicate, so transport errors can be
/// retried while application-level failures (bad parameters, empty result)
/// pass straight through.

use std::thread;
use std::time::Duration;

use crate::logging::{self, DataSource};

/// Retry schedule: `max_attempts` tries total, sleeping
/// `base_delay_ms * 2^attempt` between failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl RetryPolicy {
    /// Transport-level schedule: 5 attempts, 100 ms base delay.
    /// Matches the connection pool settings the service has always run with.
    pub fn transport() -> Self {
        Self { max_attempts: 5, base_delay_ms: 100 }
    }

    /// Storage schedule: 3 attempts, 200 ms base delay. Safe because every
    /// store operation is an upsert or a pure read.
    pub fn storage() -> Self {
        Self { max_attempts: 3, base_delay_ms: 200 }
    }

    /// Backoff delay before retrying after the given zero-based attempt.
    pub fn delay(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.base_delay_ms << attempt.min(10))
    }

    /// Runs `op` up to `max_attempts` times, sleeping between failures that
    /// satisfy `retryable`. The first success, the first non-retryable
    /// failure, or the final failure is returned as-is.
    pub fn run<T, E, F, P>(&self, what: &str, source: DataSource, retryable: P, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
        P: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let mut attempt = 0;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if attempt + 1 < self.max_attempts && retryable(&e) => {
                    logging::warn(
                        source,
                        None,
                        &format!(
                            "{} failed (attempt {}/{}): {}, retrying",
                            what,
                            attempt + 1,
                            self.max_attempts,
                            e
                        ),
                    );
                    thread::sleep(self.delay(attempt));
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

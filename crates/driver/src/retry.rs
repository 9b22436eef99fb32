//! Bounded exponential backoff. Every retry loop in the driver is governed
//! by one of these policies so "retryable" is an enforceable budget, not an
//! unbounded spin.

use std::future::Future;
use std::time::Duration;

/// A bounded retry budget with exponential backoff.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,

    /// Delay after the first failed attempt.
    pub initial_delay: Duration,

    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy.
    #[must_use]
    pub const fn new(max_attempts: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
            max_delay,
        }
    }

    /// The delay to sleep after the given failed attempt (counted from 1),
    /// doubling each time up to `max_delay`.
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.initial_delay
            .saturating_mul(2u32.saturating_pow(exponent))
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, Duration::from_millis(200), Duration::from_secs(5))
    }
}

/// Why a retried operation gave up.
#[derive(Debug)]
pub enum RetryError<E> {
    /// The error was not transient; retrying cannot help.
    Fatal(E),

    /// Every attempt in the budget failed transiently.
    Exhausted {
        /// Number of attempts made.
        attempts: u32,
        /// The last transient error observed.
        last: E,
    },
}

/// Runs `op` until it succeeds, fails non-transiently, or exhausts the
/// policy's attempt budget.
pub async fn with_backoff<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    is_transient: P,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let mut attempt = 0;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(error) if is_transient(&error) => {
                attempt += 1;
                if attempt >= policy.max_attempts {
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last: error,
                    });
                }
                tokio::time::sleep(policy.delay(attempt)).await;
            }
            Err(error) => return Err(RetryError::Fatal(error)),
        }
    }
}

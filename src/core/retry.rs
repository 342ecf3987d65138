//! Bounded exponential backoff.
//!
//! [`retry_with_backoff`] knows nothing about HTTP: it runs an attempt,
//! asks the error whether it is worth retrying, and waits on an injected
//! [`Sleeper`] between attempts. The first wait is
//! [`RetryPolicy::initial_delay`] and every later wait doubles.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one. Zero is treated as one.
    pub max_attempts: u32,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: DEFAULT_INITIAL_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
        }
    }

    fn attempt_budget(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Suspends the current task. Production code waits on the tokio timer;
/// tests substitute a recorder so no real time passes.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Implemented by errors that can tell transient failures apart from
/// terminal ones.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

#[derive(Debug, PartialEq)]
pub enum RetryError<E> {
    /// Every attempt failed with a retryable error; `last` is the final one.
    Exhausted { attempts: u32, last: E },
    /// An attempt failed with an error that must not be retried.
    Aborted(E),
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryError::Exhausted { attempts, last } => {
                write!(f, "gave up after {attempts} attempts: {last}")
            }
            RetryError::Aborted(err) => write!(f, "{err}"),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for RetryError<E> {}

/// Runs `attempt` until it succeeds, fails terminally, or the policy's
/// attempt budget is spent. `attempt` receives the 1-based attempt number.
///
/// No wait follows the final attempt.
pub async fn retry_with_backoff<T, E, F, Fut, S>(
    policy: &RetryPolicy,
    sleeper: &S,
    mut attempt: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + fmt::Display,
    S: Sleeper + ?Sized,
{
    let budget = policy.attempt_budget();
    let mut delay = policy.initial_delay;
    let mut number = 1;

    loop {
        match attempt(number).await {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_retryable() => return Err(RetryError::Aborted(err)),
            Err(err) if number >= budget => {
                return Err(RetryError::Exhausted {
                    attempts: number,
                    last: err,
                })
            }
            Err(err) => {
                warn!(
                    attempt = number,
                    delay_ms = delay.as_millis() as u64,
                    "{err}; retrying in {}ms",
                    delay.as_millis()
                );
                sleeper.sleep(delay).await;
                delay = delay.saturating_mul(2);
                number += 1;
            }
        }
    }
}

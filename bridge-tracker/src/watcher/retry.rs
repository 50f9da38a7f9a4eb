//! Bounded retry with a fixed delay.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::config::WatcherConfig;
use crate::error::{Result, TrackerError};

/// How many times to try and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }
}

impl From<&WatcherConfig> for RetryPolicy {
    fn from(config: &WatcherConfig) -> Self {
        Self::new(config.retry_attempts, config.retry_delay())
    }
}

/// Runs `op` until it succeeds, fails with an error `retryable` rejects, or the
/// policy runs out of attempts.
///
/// The last error is returned inside `RetriesExhausted`. `op` receives the
/// 1-based attempt number.
pub async fn retry<T, F, Fut, R>(policy: RetryPolicy, retryable: R, mut op: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
    R: Fn(&TrackerError) -> bool,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        let err = match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if retryable(&e) => e,
            Err(e) => return Err(e),
        };

        if attempt >= attempts {
            return Err(TrackerError::RetriesExhausted {
                attempts,
                last: Box::new(err),
            });
        }

        warn!(attempt, max_attempts = attempts, error = %err, "Retrying after {:?}", policy.delay);
        tokio::time::sleep(policy.delay).await;
        attempt += 1;
    }
}

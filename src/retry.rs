//! Bounded retry with exponential backoff and jitter.
//!
//! Used for the raw document fetch inside materialization. Poll-level
//! failures are not retried here at all — the next scheduled poll is the
//! retry, which keeps staleness bounded by the poll interval instead of by
//! an open-ended loop.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

/// What the error classifier tells the retry loop to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAction {
    Retry,
    Abort,
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the initial attempt.
    pub max_retries: u32,
    pub base_delay_secs: u64,
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_secs: 2,
            max_delay_secs: 30,
        }
    }
}

impl RetryConfig {
    /// Delay before retry `attempt` (0-indexed): exponential growth capped at
    /// `max_delay_secs`, plus jitter in `0..base_delay_secs` so simultaneous
    /// failures don't re-arrive in lockstep.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponential = self
            .base_delay_secs
            .saturating_mul(1u64.checked_shl(attempt).unwrap_or(u64::MAX));
        let capped = exponential.min(self.max_delay_secs);
        let jitter = if self.base_delay_secs > 0 {
            rand::thread_rng().gen_range(0..self.base_delay_secs)
        } else {
            0
        };
        Duration::from_secs(capped.saturating_add(jitter))
    }
}

/// Run `operation`, retrying per `config` while `classifier` answers
/// [`RetryAction::Retry`]. Returns the first success or the error that
/// exhausted the budget (or aborted it).
pub async fn retry_with_backoff<F, Fut, T, E, C>(
    config: &RetryConfig,
    classifier: C,
    operation: F,
) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> RetryAction,
    E: std::fmt::Display,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if classifier(&e) == RetryAction::Abort || attempt >= config.max_retries {
                    return Err(e);
                }
                let delay = config.delay_for(attempt);
                tracing::warn!(
                    attempt = attempt + 1,
                    budget = config.max_retries,
                    delay_secs = delay.as_secs(),
                    error = %e,
                    "transient failure, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

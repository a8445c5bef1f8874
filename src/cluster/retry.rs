//! Bounded exponential backoff for transient API failures.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use super::ClusterError;

/// Retry schedule: `steps` attempts in total, the delay between attempts
/// starting at `initial_delay` and multiplying by `factor` each time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Multiplier applied to the delay after each retry.
    pub factor: u32,
    /// Maximum number of attempts, including the first.
    pub steps: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            factor: 2,
            steps: 5,
        }
    }
}

impl Backoff {
    /// Returns the delays slept between attempts.
    pub fn delays(&self) -> impl Iterator<Item = Duration> {
        let factor = self.factor;
        std::iter::successors(Some(self.initial_delay), move |delay| {
            Some(delay.saturating_mul(factor))
        })
        .take(usize::try_from(self.steps.saturating_sub(1)).unwrap_or(usize::MAX))
    }
}

/// Runs `attempt` until it succeeds, fails permanently, or the backoff is
/// exhausted.
///
/// # Errors
///
/// Returns the first non-retryable error, or the last transient one once
/// every attempt has been used.
pub async fn retry_transient<T, F, Fut>(
    backoff: &Backoff,
    operation: &str,
    mut attempt: F,
) -> Result<T, ClusterError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ClusterError>>,
{
    let mut delays = backoff.delays();
    loop {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_retryable() => {
                let Some(delay) = delays.next() else {
                    return Err(error);
                };
                warn!(operation, %error, ?delay, "transient API failure, retrying");
                tokio::time::sleep(delay).await;
            }
            Err(error) => return Err(error),
        }
    }
}

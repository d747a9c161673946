use serde::Deserialize;
use std::{fmt::Display, future::Future, time::Duration};
use tracing::warn;

/// Exponential backoff for establishing the connection.
///
/// The delay before retry `n` (zero-based) is `min_timeout * factor^n`, capped at `max_timeout`
/// when one is set. The defaults, 10 retries with factor 2 starting at one second, allow for a
/// server that takes a while to come up.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryPolicy {
    /// How many times to retry after the first attempt.
    pub retries: u32,
    pub factor: f64,
    /// Delay before the first retry, in milliseconds.
    #[serde(rename = "minTimeout")]
    pub min_timeout_ms: u64,
    /// Upper bound for a single delay, in milliseconds.
    #[serde(rename = "maxTimeout")]
    pub max_timeout_ms: Option<u64>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            retries: 10,
            factor: 2.0,
            min_timeout_ms: 1000,
            max_timeout_ms: None,
        }
    }
}

impl RetryPolicy {
    /// A single attempt.
    pub fn no_retries() -> Self {
        RetryPolicy {
            retries: 0,
            ..Default::default()
        }
    }

    /// The delay before the zero-based retry `retry`.
    pub fn delay(&self, retry: u32) -> Duration {
        let millis = self.min_timeout_ms as f64 * self.factor.powi(retry as i32);
        let millis = match self.max_timeout_ms {
            Some(max) => millis.min(max as f64),
            None => millis,
        };

        Duration::from_millis(millis as u64)
    }

    /// All delays, in order.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (0..self.retries).map(|retry| self.delay(retry))
    }
}

/// Run `operation` until it succeeds, the error is not transient, or the policy is exhausted. The
/// operation receives the one-based attempt number. The last error is returned on failure.
pub(crate) async fn retry_with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    is_transient: impl Fn(&E) -> bool,
    mut operation: F,
) -> Result<T, E>
where
    E: Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut delays = policy.delays();
    let mut attempt = 0;

    loop {
        attempt += 1;

        let err = match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if !is_transient(&err) => return Err(err),
            Err(err) => err,
        };

        match delays.next() {
            Some(delay) => {
                warn!(attempt, delay_ms = delay.as_millis() as u64, error = %err, "Attempt failed, retrying");
                tokio::time::sleep(delay).await;
            }
            None => return Err(err),
        }
    }
}

use std::time::Duration;

use tokio::time::sleep;
use tokio::time::timeout;
use tracing::warn;

use crate::BackoffPolicy;
use crate::Error;
use crate::Result;

/// Runs `task` until it succeeds or `policy.max_retries` attempts are used up.
///
/// Every attempt is bounded by `policy.timeout_ms`. The delay between attempts starts at
/// `policy.base_delay_ms` and doubles each time, capped at `policy.max_delay_ms`.
pub(crate) async fn task_with_timeout_and_exponential_backoff<F, T, P>(
    task: F,
    policy: BackoffPolicy,
) -> Result<P>
where
    F: Fn() -> T,
    T: std::future::Future<Output = Result<P>>,
{
    let max_retries = policy.max_retries.max(1);
    let mut retries = 0;
    let mut delay = policy.base_delay();
    let mut last_error = Error::RetryExhausted("task was never attempted".to_string());

    while retries < max_retries {
        match timeout(policy.timeout(), task()).await {
            Ok(Ok(r)) => return Ok(r),
            Ok(Err(e)) => {
                warn!(attempt = retries + 1, "task failed: {:?}", &e);
                last_error = e;
            }
            Err(_) => {
                warn!(attempt = retries + 1, timeout = ?policy.timeout(), "task timed out");
                last_error = Error::RetryTimeout;
            }
        };

        retries += 1;
        if retries < max_retries {
            sleep(delay).await;
            delay = next_delay(delay, policy.max_delay());
        }
    }

    warn!("task failed after {} attempts", retries);
    Err(Error::RetryExhausted(format!(
        "gave up after {retries} attempts, last error: {last_error}"
    )))
}

pub(crate) fn next_delay(
    current: Duration,
    max: Duration,
) -> Duration {
    current.saturating_mul(2).min(max)
}

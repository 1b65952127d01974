//! Generic retry-with-backoff helper, shared by the fetcher (C1) and the
//! LLM fit analyzer's streaming call (C7), per the design note that both
//! should factor through a single `(isRetryable, backoffFn, maxAttempts)`
//! higher-order helper rather than duplicating the loop.

use std::future::Future;
use std::time::Duration;

/// Outcome of a single attempt, as seen by [`retry_with_backoff`].
pub enum Attempt<T, E> {
    /// The attempt succeeded; stop retrying.
    Done(T),
    /// The attempt failed. `retryable` decides whether another attempt is
    /// made; `retry_after` optionally overrides the computed backoff (used
    /// to honor a `Retry-After` header).
    Failed {
        error: E,
        retryable: bool,
        retry_after: Option<Duration>,
    },
}

/// Run `op` up to `max_attempts` times (the first call plus `max_attempts - 1`
/// retries), sleeping `backoff(attempt)` between attempts unless the attempt
/// itself supplied an explicit `retry_after`. Returns the last error if every
/// attempt failed or the failure was marked non-retryable.
pub async fn retry_with_backoff<T, E, Fut, Op, Backoff>(
    max_attempts: u32,
    backoff: Backoff,
    mut op: Op,
) -> Result<T, E>
where
    Op: FnMut(u32) -> Fut,
    Fut: Future<Output = Attempt<T, E>>,
    Backoff: Fn(u32) -> Duration,
{
    let mut last_error = None;
    for attempt in 0..max_attempts.max(1) {
        match op(attempt).await {
            Attempt::Done(value) => return Ok(value),
            Attempt::Failed {
                error,
                retryable,
                retry_after,
            } => {
                last_error = Some(error);
                let is_last = attempt + 1 >= max_attempts;
                if !retryable || is_last {
                    break;
                }
                let wait = retry_after.unwrap_or_else(|| backoff(attempt));
                tokio::time::sleep(wait).await;
            }
        }
    }
    Err(last_error.expect("at least one attempt runs"))
}

/// `backoffStart · 2^attempt`, the exponential schedule used by C1.
pub fn exponential_backoff(start_ms: u64) -> impl Fn(u32) -> Duration {
    move |attempt: u32| Duration::from_millis(start_ms.saturating_mul(1u64 << attempt))
}

/// `base_ms · (attempt + 1)`, the linear schedule used by C7's network-error
/// retry policy (distinct from its HTTP-status retry schedule).
pub fn linear_backoff(base_ms: u64) -> impl Fn(u32) -> Duration {
    move |attempt: u32| Duration::from_millis(base_ms.saturating_mul(attempt as u64 + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_without_retry() {
        let calls = AtomicU32::new(0);
        let result: Result<&str, &str> = retry_with_backoff(
            3,
            exponential_backoff(1),
            |_attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Attempt::Done("ok") }
            },
        )
        .await;
        assert_eq!(result, Ok("ok"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_until_success() {
        let calls = AtomicU32::new(0);
        let result: Result<&str, &str> = retry_with_backoff(5, exponential_backoff(1), |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 2 {
                    Attempt::Failed {
                        error: "boom",
                        retryable: true,
                        retry_after: None,
                    }
                } else {
                    Attempt::Done("recovered")
                }
            }
        })
        .await;
        assert_eq!(result, Ok("recovered"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn stops_on_non_retryable_failure() {
        let calls = AtomicU32::new(0);
        let result: Result<&str, &str> = retry_with_backoff(5, exponential_backoff(1), |_attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Attempt::Failed {
                    error: "rejected",
                    retryable: false,
                    retry_after: None,
                }
            }
        })
        .await;
        assert_eq!(result, Err("rejected"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausts_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<&str, &str> = retry_with_backoff(3, exponential_backoff(1), |_attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Attempt::Failed {
                    error: "still failing",
                    retryable: true,
                    retry_after: None,
                }
            }
        })
        .await;
        assert_eq!(result, Err("still failing"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn exponential_schedule_doubles() {
        let backoff = exponential_backoff(100);
        assert_eq!(backoff(0), Duration::from_millis(100));
        assert_eq!(backoff(1), Duration::from_millis(200));
        assert_eq!(backoff(2), Duration::from_millis(400));
    }

    #[test]
    fn linear_schedule_increments() {
        let backoff = linear_backoff(1000);
        assert_eq!(backoff(0), Duration::from_millis(1000));
        assert_eq!(backoff(1), Duration::from_millis(2000));
        assert_eq!(backoff(2), Duration::from_millis(3000));
    }
}

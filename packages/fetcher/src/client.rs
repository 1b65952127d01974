//! Rate-limited, retrying HTTP fetcher (C1).
//!
//! `fetch` never returns an `Err` for an ordinary failed request — failures
//! are reported in the returned [`FetchOutcome`] so a connector can record
//! `success=false` for one company without aborting the batch.

use std::future::Future;
use std::time::{Duration, Instant};

use reqwest::{Method, StatusCode};
use serde_json::Value;

use crate::error::FetchError;
use crate::retry::{exponential_backoff, retry_with_backoff, Attempt};
use crate::security::UrlValidator;

/// Per-request knobs.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub timeout: Duration,
    pub max_retries: u32,
    pub backoff_start_ms: u64,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            backoff_start_ms: 500,
        }
    }
}

/// Result of one `fetch` call. Exactly one of `data`/`error` is populated.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub data: Option<String>,
    pub error: Option<String>,
    pub status_code: Option<u16>,
    pub rate_limited: bool,
    pub response_time_ms: u64,
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// A `reqwest`-backed fetcher that retries transient failures with
/// exponential backoff and validates every outbound URL for SSRF.
#[derive(Clone)]
pub struct RateLimitedFetcher {
    client: reqwest::Client,
    validator: UrlValidator,
}

impl Default for RateLimitedFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimitedFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            validator: UrlValidator::new(),
        }
    }

    pub fn with_validator(validator: UrlValidator) -> Self {
        Self {
            client: reqwest::Client::new(),
            validator,
        }
    }

    /// `GET` with retry/backoff per the C1 contract.
    pub async fn fetch(&self, url: &str, opts: &FetchOptions) -> FetchOutcome {
        self.fetch_with_method(Method::GET, url, None, opts).await
    }

    /// `POST` with a JSON body, otherwise identical to [`fetch`].
    pub async fn post(&self, url: &str, body: Value, opts: &FetchOptions) -> FetchOutcome {
        self.fetch_with_method(Method::POST, url, Some(body), opts)
            .await
    }

    async fn fetch_with_method(
        &self,
        method: Method,
        url: &str,
        body: Option<Value>,
        opts: &FetchOptions,
    ) -> FetchOutcome {
        let start = Instant::now();

        if let Err(e) = self.validator.validate_with_dns(url).await {
            return FetchOutcome {
                data: None,
                error: Some(FetchError::from(e).to_string()),
                status_code: None,
                rate_limited: false,
                response_time_ms: elapsed_ms(start),
            };
        }

        let mut rate_limited = false;
        let result = retry_with_backoff(
            opts.max_retries.max(1),
            exponential_backoff(opts.backoff_start_ms),
            |_attempt| {
                let method = method.clone();
                let body = body.clone();
                async {
                    let fut = async {
                        let mut req = self.client.request(method, url);
                        if let Some(ref b) = body {
                            req = req.json(b);
                        }
                        req.send().await
                    };
                    match tokio::time::timeout(opts.timeout, fut).await {
                        Err(_) => Attempt::Failed {
                            error: FetchError::Timeout {
                                url: url.to_string(),
                            },
                            retryable: true,
                            retry_after: None,
                        },
                        Ok(Err(e)) => Attempt::Failed {
                            error: FetchError::Network(e.to_string()),
                            retryable: true,
                            retry_after: None,
                        },
                        Ok(Ok(response)) => {
                            let status = response.status();
                            if status.is_success() {
                                match tokio::time::timeout(opts.timeout, response.text()).await {
                                    Ok(Ok(text)) => Attempt::Done((text, status)),
                                    Ok(Err(e)) => Attempt::Failed {
                                        error: FetchError::Body(e.to_string()),
                                        retryable: true,
                                        retry_after: None,
                                    },
                                    Err(_) => Attempt::Failed {
                                        error: FetchError::Timeout {
                                            url: url.to_string(),
                                        },
                                        retryable: true,
                                        retry_after: None,
                                    },
                                }
                            } else if status == StatusCode::TOO_MANY_REQUESTS {
                                let retry_after = response
                                    .headers()
                                    .get("retry-after")
                                    .and_then(|v| v.to_str().ok())
                                    .and_then(|s| s.parse::<u64>().ok())
                                    .map(Duration::from_secs);
                                Attempt::Failed {
                                    error: FetchError::RateLimited {
                                        url: url.to_string(),
                                        status: status.as_u16(),
                                        attempts: 0,
                                    },
                                    retryable: true,
                                    retry_after,
                                }
                            } else if status.is_server_error() {
                                Attempt::Failed {
                                    error: FetchError::Http {
                                        url: url.to_string(),
                                        status: status.as_u16(),
                                    },
                                    retryable: true,
                                    retry_after: None,
                                }
                            } else {
                                Attempt::Failed {
                                    error: FetchError::Http {
                                        url: url.to_string(),
                                        status: status.as_u16(),
                                    },
                                    retryable: false,
                                    retry_after: None,
                                }
                            }
                        }
                    }
                }
            },
        )
        .await;

        match result {
            Ok((text, status)) => FetchOutcome {
                data: Some(text),
                error: None,
                status_code: Some(status.as_u16()),
                rate_limited,
                response_time_ms: elapsed_ms(start),
            },
            Err(e) => {
                if e.is_rate_limited() {
                    rate_limited = true;
                }
                let status_code = match &e {
                    FetchError::Http { status, .. } => Some(*status),
                    FetchError::RateLimited { status, .. } => Some(*status),
                    _ => None,
                };
                FetchOutcome {
                    data: None,
                    error: Some(e.to_string()),
                    status_code,
                    rate_limited,
                    response_time_ms: elapsed_ms(start),
                }
            }
        }
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Knobs for [`batch_fetch`].
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub batch_size: usize,
    /// Retained for parity with the source; see the design-notes
    /// resolution on why this never serializes a slice.
    pub delay_between_requests_ms: u64,
    pub batch_pause_ms: u64,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_size: 5,
            delay_between_requests_ms: 0,
            batch_pause_ms: 0,
        }
    }
}

/// Drive `fetch_fn` over `items` in slices of `batch_size`, running each
/// slice concurrently. One result per input; a failing item never aborts
/// its siblings.
pub async fn batch_fetch<I, R, F, Fut>(items: Vec<I>, fetch_fn: F, opts: &BatchOptions) -> Vec<R>
where
    I: Clone,
    F: Fn(I) -> Fut,
    Fut: Future<Output = R>,
{
    let batch_size = opts.batch_size.max(1);
    let mut results = Vec::with_capacity(items.len());

    for (slice_index, slice) in items.chunks(batch_size).enumerate() {
        if slice_index > 0 && opts.batch_pause_ms > 0 {
            tokio::time::sleep(Duration::from_millis(opts.batch_pause_ms)).await;
        }
        let futures = slice.iter().cloned().map(&fetch_fn);
        let mut slice_results = futures::future::join_all(futures).await;
        results.append(&mut slice_results);
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn batch_fetch_runs_a_slice_concurrently() {
        let calls = Arc::new(AtomicUsize::new(0));
        let items: Vec<u32> = (0..5).collect();
        let opts = BatchOptions {
            batch_size: 5,
            ..Default::default()
        };

        let start = Instant::now();
        let results = batch_fetch(
            items,
            {
                let calls = calls.clone();
                move |item: u32| {
                    let calls = calls.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        item * 2
                    }
                }
            },
            &opts,
        )
        .await;

        assert_eq!(results, vec![0, 2, 4, 6, 8]);
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        // Five 50ms fetches running in parallel finish near 50ms, not 250ms.
        assert!(start.elapsed() < Duration::from_millis(200));
    }

    #[tokio::test]
    async fn batch_fetch_isolates_one_failure_per_item() {
        let opts = BatchOptions {
            batch_size: 3,
            ..Default::default()
        };
        let items: Vec<i32> = vec![1, 2, 3, 4];
        let results = batch_fetch(
            items,
            |item: i32| async move {
                if item == 2 {
                    Err("boom")
                } else {
                    Ok(item)
                }
            },
            &opts,
        )
        .await;
        assert_eq!(results, vec![Ok(1), Err("boom"), Ok(3), Ok(4)]);
    }

    #[tokio::test]
    async fn batch_fetch_pauses_between_slices() {
        let opts = BatchOptions {
            batch_size: 2,
            batch_pause_ms: 40,
            ..Default::default()
        };
        let items: Vec<i32> = vec![1, 2, 3, 4];
        let start = Instant::now();
        let _ = batch_fetch(items, |item: i32| async move { item }, &opts).await;
        // one pause between the two slices
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn fetch_blocks_ssrf_targets() {
        let fetcher = RateLimitedFetcher::new();
        let outcome = fetcher
            .fetch("http://169.254.169.254/latest/meta-data/", &FetchOptions::default())
            .await;
        assert!(!outcome.is_success());
        assert!(outcome.error.unwrap().contains("blocked"));
    }
}

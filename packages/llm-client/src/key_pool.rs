//! FIFO-fair key pool (C7 §4.7): a small semaphore over N API keys.
//!
//! Acquisition takes the free key at the current round-robin cursor; when
//! no key is free, the acquirer is enqueued and the next `release` hands
//! its key directly to the head of the waiter queue (not back through the
//! cursor), which is what keeps the handoff FIFO-fair instead of merely
//! "some free key, eventually."

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, Mutex};

struct PoolState {
    busy: Vec<bool>,
    cursor: usize,
    waiters: VecDeque<oneshot::Sender<usize>>,
}

struct PoolInner {
    keys: Vec<String>,
    state: Mutex<PoolState>,
}

impl PoolInner {
    async fn release(&self, idx: usize) {
        let mut state = self.state.lock().await;
        // Hand the key directly to the oldest waiter, if any, so a busy
        // pool's FIFO order isn't reshuffled by the free-cursor scan.
        while let Some(waiter) = state.waiters.pop_front() {
            if waiter.send(idx).is_ok() {
                return;
            }
            // Waiter's acquire() timed out and dropped its receiver;
            // try the next one in line for this same freed key.
        }
        state.busy[idx] = false;
    }
}

/// A process-lifetime pool of API keys admitting at most one in-flight
/// request per key. Clone freely; clones share the same underlying state.
#[derive(Clone)]
pub struct KeyPool {
    inner: Arc<PoolInner>,
}

impl KeyPool {
    pub fn new(keys: Vec<String>) -> Self {
        let n = keys.len();
        Self {
            inner: Arc::new(PoolInner {
                keys,
                state: Mutex::new(PoolState {
                    busy: vec![false; n],
                    cursor: 0,
                    waiters: VecDeque::new(),
                }),
            }),
        }
    }

    /// Number of keys in the pool; also the pipeline's LLM concurrency.
    pub fn size(&self) -> usize {
        self.inner.keys.len()
    }

    /// Reset all keys to free and drop any waiters. Exposed for tests that
    /// need a clean process-lifetime singleton between cases.
    pub async fn reset_for_test(&self) {
        let mut state = self.inner.state.lock().await;
        state.busy.iter_mut().for_each(|b| *b = false);
        state.cursor = 0;
        state.waiters.clear();
    }

    /// Acquire a key, waiting up to `timeout` if the pool is fully busy.
    /// Returns `None` on timeout or an empty pool, never an error — per
    /// the contract, acquisition failure means the caller returns `None`
    /// for that job and the pipeline continues.
    pub async fn acquire(&self, timeout: Duration) -> Option<KeyGuard> {
        if self.inner.keys.is_empty() {
            return None;
        }

        let immediate = {
            let mut state = self.inner.state.lock().await;
            let n = self.inner.keys.len();
            let mut found = None;
            for offset in 0..n {
                let idx = (state.cursor + offset) % n;
                if !state.busy[idx] {
                    found = Some(idx);
                    break;
                }
            }
            found.map(|idx| {
                state.busy[idx] = true;
                state.cursor = (idx + 1) % n;
                idx
            })
        };

        let idx = match immediate {
            Some(idx) => idx,
            None => {
                let (tx, rx) = oneshot::channel();
                {
                    let mut state = self.inner.state.lock().await;
                    state.waiters.push_back(tx);
                }
                match tokio::time::timeout(timeout, rx).await {
                    Ok(Ok(idx)) => idx,
                    _ => return None,
                }
            }
        };

        Some(KeyGuard {
            pool: Some(self.inner.clone()),
            key_index: idx,
            key: self.inner.keys[idx].clone(),
        })
    }
}

/// An acquired key. Dropping it (or calling [`KeyGuard::release`]
/// explicitly) returns the key to the pool.
pub struct KeyGuard {
    pool: Option<Arc<PoolInner>>,
    key_index: usize,
    key: String,
}

impl KeyGuard {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Release the key back to the pool immediately.
    pub async fn release(mut self) {
        if let Some(pool) = self.pool.take() {
            pool.release(self.key_index).await;
        }
    }
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            let idx = self.key_index;
            // Best-effort backstop if the holder panicked or forgot to
            // call release() explicitly.
            tokio::spawn(async move { pool.release(idx).await });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn acquires_and_releases_single_key() {
        let pool = KeyPool::new(vec!["key-a".to_string()]);
        let guard = pool.acquire(Duration::from_secs(1)).await.unwrap();
        assert_eq!(guard.key(), "key-a");
        guard.release().await;
        let guard2 = pool.acquire(Duration::from_secs(1)).await.unwrap();
        assert_eq!(guard2.key(), "key-a");
    }

    #[tokio::test]
    async fn round_robins_across_free_keys() {
        let pool = KeyPool::new(vec!["a".into(), "b".into(), "c".into()]);
        let g1 = pool.acquire(Duration::from_secs(1)).await.unwrap();
        let g2 = pool.acquire(Duration::from_secs(1)).await.unwrap();
        assert_ne!(g1.key(), g2.key());
        g1.release().await;
        g2.release().await;
    }

    #[tokio::test]
    async fn waiter_times_out_when_pool_is_exhausted() {
        let pool = KeyPool::new(vec!["only".into()]);
        let _held = pool.acquire(Duration::from_secs(1)).await.unwrap();
        let result = pool.acquire(Duration::from_millis(50)).await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn waiter_gets_key_as_soon_as_it_frees() {
        let pool = KeyPool::new(vec!["only".into()]);
        let held = pool.acquire(Duration::from_secs(1)).await.unwrap();

        let waiter_pool = pool.clone();
        let waiter = tokio::spawn(async move { waiter_pool.acquire(Duration::from_secs(2)).await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        held.release().await;

        let acquired = waiter.await.unwrap();
        assert!(acquired.is_some());
    }

    #[tokio::test]
    async fn empty_pool_never_yields_a_guard() {
        let pool = KeyPool::new(vec![]);
        assert!(pool.acquire(Duration::from_millis(10)).await.is_none());
    }

    #[tokio::test]
    async fn concurrency_equals_pool_size() {
        let pool = KeyPool::new(vec!["a".into(), "b".into()]);
        let g1 = pool.acquire(Duration::from_millis(10)).await;
        let g2 = pool.acquire(Duration::from_millis(10)).await;
        let g3 = pool.acquire(Duration::from_millis(10)).await;
        assert!(g1.is_some());
        assert!(g2.is_some());
        assert!(g3.is_none());
    }
}

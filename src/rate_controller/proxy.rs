//! Round-robin proxy rotation with cooldown for proxies that keep getting
//! blocked.
//!
//! Shared by all links of one target. The lock is held only for the
//! bookkeeping itself, never across a fetch.

use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

use crate::config::{PROXY_BLOCKED_THRESHOLD, PROXY_COOLDOWN};
use crate::models::CheckOutcome;

#[derive(Debug)]
struct ProxyEntry {
    url: String,
    blocked_streak: u32,
    cooling_until: Option<Instant>,
}

impl ProxyEntry {
    fn is_cooling(&self, now: Instant) -> bool {
        self.cooling_until.is_some_and(|until| now < until)
    }
}

#[derive(Debug)]
struct PoolInner {
    entries: Vec<ProxyEntry>,
    cursor: usize,
}

/// Proxy pool of one target.
#[derive(Debug)]
pub struct ProxyPool {
    inner: Mutex<PoolInner>,
    blocked_threshold: u32,
    cooldown: Duration,
}

impl ProxyPool {
    /// Creates a pool with the default threshold and cooldown.
    ///
    /// Returns `None` for an empty list.
    pub fn new(proxies: Vec<String>) -> Option<Self> {
        Self::with_threshold(proxies, PROXY_BLOCKED_THRESHOLD, PROXY_COOLDOWN)
    }

    /// Creates a pool that cools a proxy for `cooldown` after
    /// `blocked_threshold` blocks in a row. Returns `None` for an empty list.
    pub fn with_threshold(proxies: Vec<String>, blocked_threshold: u32, cooldown: Duration) -> Option<Self> {
        if proxies.is_empty() {
            return None;
        }
        let entries = proxies
            .into_iter()
            .map(|url| ProxyEntry {
                url,
                blocked_streak: 0,
                cooling_until: None,
            })
            .collect();
        Some(ProxyPool {
            inner: Mutex::new(PoolInner { entries, cursor: 0 }),
            blocked_threshold: blocked_threshold.max(1),
            cooldown,
        })
    }

    /// Number of proxies, cooling ones included
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Always false for a constructed pool
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Next proxy in round-robin order, skipping cooling proxies.
    ///
    /// When every proxy is cooling, the one whose cooldown ends first is
    /// returned rather than stalling the link.
    pub fn select(&self, now: Instant) -> String {
        let mut inner = self.lock();
        let len = inner.entries.len();

        for offset in 0..len {
            let index = (inner.cursor + offset) % len;
            if !inner.entries[index].is_cooling(now) {
                inner.cursor = (index + 1) % len;
                return inner.entries[index].url.clone();
            }
        }

        let index = inner
            .entries
            .iter()
            .enumerate()
            .min_by_key(|(_, e)| e.cooling_until)
            .map(|(i, _)| i)
            .unwrap_or(0);
        inner.cursor = (index + 1) % len;
        inner.entries[index].url.clone()
    }

    /// Records the outcome of a check that went through `proxy`.
    pub fn record(&self, proxy: &str, outcome: CheckOutcome, now: Instant) {
        let mut inner = self.lock();
        let Some(entry) = inner.entries.iter_mut().find(|e| e.url == proxy) else {
            return;
        };
        match outcome {
            CheckOutcome::Blocked => {
                entry.blocked_streak += 1;
                if entry.blocked_streak >= self.blocked_threshold {
                    entry.blocked_streak = 0;
                    entry.cooling_until = Some(now + self.cooldown);
                    log::warn!(
                        "Proxy {} blocked {} times in a row, cooling down for {}s",
                        entry.url,
                        self.blocked_threshold,
                        self.cooldown.as_secs()
                    );
                }
            }
            CheckOutcome::Success => {
                entry.blocked_streak = 0;
                entry.cooling_until = None;
            }
            CheckOutcome::TransientError | CheckOutcome::CaptchaDetected => {}
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PoolInner> {
        // Bookkeeping stays consistent even if a holder panicked
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(n: usize) -> ProxyPool {
        let proxies = (0..n).map(|i| format!("http://p{i}:8080")).collect();
        ProxyPool::with_threshold(proxies, 2, Duration::from_secs(60)).unwrap()
    }

    #[test]
    fn test_empty_pool_is_none() {
        assert!(ProxyPool::new(vec![]).is_none());
    }

    #[test]
    fn test_round_robin() {
        let pool = pool(3);
        let now = Instant::now();
        let picks: Vec<String> = (0..4).map(|_| pool.select(now)).collect();
        assert_eq!(
            picks,
            vec!["http://p0:8080", "http://p1:8080", "http://p2:8080", "http://p0:8080"]
        );
    }

    #[test]
    fn test_blocked_proxy_is_skipped_during_cooldown() {
        let pool = pool(2);
        let now = Instant::now();
        pool.record("http://p0:8080", CheckOutcome::Blocked, now);
        pool.record("http://p0:8080", CheckOutcome::Blocked, now);

        for _ in 0..3 {
            assert_eq!(pool.select(now), "http://p1:8080");
        }

        let later = now + Duration::from_secs(61);
        let picks: Vec<String> = (0..2).map(|_| pool.select(later)).collect();
        assert!(picks.contains(&"http://p0:8080".to_string()));
    }

    #[test]
    fn test_success_resets_blocked_streak() {
        let pool = pool(2);
        let now = Instant::now();
        pool.record("http://p0:8080", CheckOutcome::Blocked, now);
        pool.record("http://p0:8080", CheckOutcome::Success, now);
        pool.record("http://p0:8080", CheckOutcome::Blocked, now);
        assert_eq!(pool.select(now), "http://p0:8080");
    }

    #[test]
    fn test_all_cooling_returns_earliest() {
        let pool = pool(2);
        let now = Instant::now();
        for _ in 0..2 {
            pool.record("http://p1:8080", CheckOutcome::Blocked, now);
        }
        let later = now + Duration::from_secs(5);
        for _ in 0..2 {
            pool.record("http://p0:8080", CheckOutcome::Blocked, later);
        }
        assert_eq!(pool.select(later), "http://p1:8080");
    }

    #[test]
    fn test_unknown_proxy_is_ignored() {
        let pool = pool(1);
        pool.record("http://other:1", CheckOutcome::Blocked, Instant::now());
        assert_eq!(pool.len(), 1);
    }
}

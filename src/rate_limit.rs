use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Deserialize;

fn default_max_requests() -> u32 { 10 }
fn default_window_ms() -> u64 { 1000 }

/// Per-source request budget: at most `max_requests` within any rolling
/// `window_ms` window against the source's host.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { max_requests: 10, window_ms: 1000 }
    }
}

/// Sliding-window gate shared by every walk against one source.
///
/// The limiter is the single piece of mutable state walks share: all
/// concurrent walks against a source go through the same instance, so the
/// per-host budget holds across tasks, not per walk.
#[derive(Debug)]
pub struct HostRateLimiter {
    max: usize,
    window: Duration,
    stamps: Mutex<VecDeque<Instant>>,
}

impl HostRateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            max: config.max_requests.max(1) as usize,
            window: Duration::from_millis(config.window_ms.max(1)),
            stamps: Mutex::new(VecDeque::new()),
        }
    }

    /// Wait until a request slot is free, then claim it.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut stamps = self.stamps.lock().unwrap();
                let now = Instant::now();
                while let Some(front) = stamps.front() {
                    if now.duration_since(*front) >= self.window {
                        stamps.pop_front();
                    } else {
                        break;
                    }
                }
                if stamps.len() < self.max {
                    stamps.push_back(now);
                    return;
                }
                // Oldest stamp leaves the window first; sleep until then and
                // re-check, since another task may claim the slot meanwhile.
                self.window - now.duration_since(*stamps.front().unwrap())
            };
            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_burst_within_budget_is_immediate() {
        let limiter = HostRateLimiter::new(&RateLimitConfig { max_requests: 5, window_ms: 1000 });
        let start = Instant::now();
        for _ in 0..5 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_over_budget_request_waits_for_window() {
        let limiter = HostRateLimiter::new(&RateLimitConfig { max_requests: 2, window_ms: 200 });
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        // Third request must wait until the first stamp slides out.
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(180));
    }

    #[tokio::test]
    async fn test_shared_across_tasks() {
        let limiter = Arc::new(HostRateLimiter::new(&RateLimitConfig {
            max_requests: 2,
            window_ms: 200,
        }));
        let start = Instant::now();
        let mut handles = Vec::new();
        for _ in 0..4 {
            let l = limiter.clone();
            handles.push(tokio::spawn(async move { l.acquire().await }));
        }
        for h in handles {
            h.await.unwrap();
        }
        // Four acquisitions at two per 200ms need at least one extra window.
        assert!(start.elapsed() >= Duration::from_millis(180));
    }
}

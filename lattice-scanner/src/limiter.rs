use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Enforces a fixed minimum interval between outbound API calls.
///
/// Calls are always issued sequentially from the single crawl loop, never
/// concurrently; the mutex exists only so the engine and the enrichment
/// fetcher can share one limiter behind an `Arc`.
pub struct RateLimiter {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }

    /// Suspend the caller until at least `interval` has elapsed since the
    /// previous `wait` returned. The first call after `new` or `reset`
    /// returns immediately. Never fails.
    pub async fn wait(&self) {
        let mut last = self.last.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.interval {
                tokio::time::sleep(self.interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// Forget the previous call so the next `wait` returns immediately.
    pub async fn reset(&self) {
        *self.last.lock().await = None;
    }
}

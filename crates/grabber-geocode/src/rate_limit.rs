//! Fixed-interval rate limiter for outbound API calls.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

/// Spaces calls at least `1 / rate` seconds apart.
///
/// Callers queue on an async mutex holding the start time of the previous
/// call, so calls are serialized and there is no burst allowance.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    last_tick: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Creates a limiter allowing `rate_per_sec` calls per second.
    ///
    /// A rate of zero is treated as one call per second.
    #[must_use]
    pub fn new(rate_per_sec: u32) -> Self {
        Self {
            interval: Duration::from_secs(1) / rate_per_sec.max(1),
            last_tick: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Waits until the next call is allowed, then records it as started.
    pub async fn wait(&self) {
        let mut last = self.last_tick.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.interval {
                sleep(self.interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

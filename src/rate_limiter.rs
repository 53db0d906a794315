//! Outbound request spacing gate
//!
//! Not a token bucket: a single `Arc<Mutex<Instant>>` records the last time
//! a permit was granted, and `acquire()` sleeps just long enough to keep
//! consecutive requests at least `min_interval` apart. This is intentionally
//! simpler than a bucket with burst capacity — the scan's request pattern is
//! steady paging and per-attachment downloads, not bursty.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// A shared spacing gate enforcing a minimum interval between grants
#[derive(Clone)]
pub struct RateLimiter {
    last_request: Arc<Mutex<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    /// Build a limiter allowing at most `requests_per_second` grants/second
    ///
    /// A rate of `0.0` or less disables spacing entirely (every `acquire`
    /// returns immediately).
    pub fn new(requests_per_second: f64) -> Self {
        let min_interval = if requests_per_second > 0.0 {
            Duration::from_secs_f64(1.0 / requests_per_second)
        } else {
            Duration::ZERO
        };

        Self {
            last_request: Arc::new(Mutex::new(Instant::now() - min_interval)),
            min_interval,
        }
    }

    /// Wait until it is this caller's turn, then record the grant
    pub async fn acquire(&self) {
        if self.min_interval.is_zero() {
            return;
        }

        let mut last = self.last_request.lock().await;
        let now = Instant::now();
        let earliest = *last + self.min_interval;

        if earliest > now {
            tokio::time::sleep(earliest - now).await;
            *last = earliest;
        } else {
            *last = now;
        }
    }
}

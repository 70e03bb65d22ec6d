//! Minimum-interval gate between per-item fetches.

use std::time::Duration;
use tokio::time::Instant;

/// Enforces an adapter's `min_delay` between consecutive calls.
///
/// One pacer per run; provider rate limits are per-run budgets here, not
/// a global token bucket.
pub struct Pacer {
    min_delay: Duration,
    last: Option<Instant>,
}

impl Pacer {
    pub fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            last: None,
        }
    }

    /// Sleep out the remainder of the interval since the previous call.
    /// The first call never waits.
    pub async fn wait(&mut self) {
        if let Some(last) = self.last {
            let elapsed = last.elapsed();
            if elapsed < self.min_delay {
                tokio::time::sleep(self.min_delay - elapsed).await;
            }
        }
        self.last = Some(Instant::now());
    }
}

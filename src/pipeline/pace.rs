//! Fixed-interval pacing between calls to the extraction service.
//!
//! The service enforces a request-rate ceiling. The pipeline is sequential,
//! so a fixed pause after each call is enough to stay below it; no token
//! bucket is needed. Every delay in the crate (retry back-off, per-page and
//! per-item pacing) goes through a [`Pacer`] so the interval is configurable
//! and tests can run with [`Duration::ZERO`] while still counting pauses.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::sleep;
use tracing::trace;

/// A fixed-interval delay that counts how often it was applied.
#[derive(Debug)]
pub struct Pacer {
    label: &'static str,
    interval: Duration,
    pauses: AtomicUsize,
}

impl Pacer {
    pub fn new(label: &'static str, interval: Duration) -> Self {
        Self {
            label,
            interval,
            pauses: AtomicUsize::new(0),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of pauses taken so far.
    pub fn pauses(&self) -> usize {
        self.pauses.load(Ordering::SeqCst)
    }

    /// Wait one interval. A zero interval still counts but never yields to the timer.
    pub async fn pause(&self) {
        self.pauses.fetch_add(1, Ordering::SeqCst);
        if self.interval.is_zero() {
            return;
        }
        trace!("{}: pausing {:?}", self.label, self.interval);
        sleep(self.interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_interval_counts_pauses() {
        let pacer = Pacer::new("test", Duration::ZERO);
        tokio_test::block_on(async {
            pacer.pause().await;
            pacer.pause().await;
        });
        assert_eq!(pacer.pauses(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_waits_the_full_interval() {
        let pacer = Pacer::new("page", Duration::from_secs(2));
        let start = tokio::time::Instant::now();
        pacer.pause().await;
        pacer.pause().await;
        assert_eq!(start.elapsed(), Duration::from_secs(4));
        assert_eq!(pacer.pauses(), 2);
    }
}

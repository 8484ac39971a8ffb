//! Fixed-interval frame clock.

use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{trace, warn};

/// Shortest interval a ticker accepts.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Fires once per `interval`, counting frames.
///
/// If the task wakes up a whole interval or more late, the missed frames
/// are skipped and the cadence restarts from now instead of bursting to
/// catch up.
#[derive(Debug)]
pub struct Ticker {
    interval: Duration,
    next: Instant,
    frame: u64,
}

impl Ticker {
    /// Creates a ticker whose first tick is one interval from now.
    pub fn new(interval: Duration) -> Self {
        let interval = interval.max(MIN_INTERVAL);
        Self {
            interval,
            next: Instant::now() + interval,
            frame: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Waits for the next tick and returns its 1-based frame number.
    pub async fn wait(&mut self) -> u64 {
        time::sleep_until(self.next).await;

        let now = Instant::now();
        let late_by = now.saturating_duration_since(self.next);
        if late_by >= self.interval {
            let skipped = late_by.as_nanos() / self.interval.as_nanos();
            warn!(
                frame = self.frame + 1,
                skipped = skipped as u64,
                "animation frame overrun, skipping ahead"
            );
            self.next = now + self.interval;
        } else {
            self.next += self.interval;
        }

        self.frame += 1;
        trace!(frame = self.frame, "animation tick");
        self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_ticker_fires_on_fixed_interval() {
        let start = Instant::now();
        let mut ticker = Ticker::new(Duration::from_millis(100));

        assert_eq!(ticker.wait().await, 1);
        assert_eq!(ticker.wait().await, 2);
        assert_eq!(ticker.wait().await, 3);
        assert_eq!(start.elapsed(), Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticker_overrun_restarts_cadence_from_now() {
        let start = Instant::now();
        let mut ticker = Ticker::new(Duration::from_millis(100));

        time::advance(Duration::from_millis(350)).await;
        ticker.wait().await;
        assert_eq!(start.elapsed(), Duration::from_millis(350));

        ticker.wait().await;
        assert_eq!(start.elapsed(), Duration::from_millis(450));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticker_zero_interval_is_clamped() {
        let ticker = Ticker::new(Duration::ZERO);
        assert_eq!(ticker.interval(), MIN_INTERVAL);
    }
}

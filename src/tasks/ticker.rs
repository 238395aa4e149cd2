//! Repeating one-period task with an explicit cancel handle

use std::{ops::ControlFlow, time::Duration};

use tokio::{
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::debug;

/// Handle to a background task that calls its callback once per period.
///
/// The first call happens one full period after spawning. Dropping the handle
/// cancels the task.
#[derive(Debug)]
pub struct Ticker {
    handle: JoinHandle<()>,
}

impl Ticker {
    /// Spawn a ticker that runs until `on_tick` returns `ControlFlow::Break`
    /// or the handle is cancelled
    pub fn spawn<F>(period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() -> ControlFlow<()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            // Late ticks are delivered once, never in a burst
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                if on_tick().is_break() {
                    debug!("Ticker stopped by its callback");
                    break;
                }
            }
        });

        Self { handle }
    }

    /// Whether the task is still scheduled
    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Stop the task; no further callbacks run once this returns
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    };
    use tokio::time::sleep;

    fn counting_ticker(period: Duration, stop_after: u64) -> (Ticker, Arc<AtomicU64>) {
        let count = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&count);
        let ticker = Ticker::spawn(period, move || {
            let ticks = counter.fetch_add(1, Ordering::SeqCst) + 1;
            if ticks >= stop_after {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        (ticker, count)
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_once_per_period() {
        let (_ticker, count) = counting_ticker(Duration::from_secs(1), u64::MAX);

        sleep(Duration::from_millis(500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        sleep(Duration::from_millis(3000)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_ticks() {
        let (ticker, count) = counting_ticker(Duration::from_secs(1), u64::MAX);
        sleep(Duration::from_millis(2500)).await;
        ticker.cancel();

        sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_break_finishes_task() {
        let (ticker, count) = counting_ticker(Duration::from_secs(1), 2);
        sleep(Duration::from_secs(5)).await;

        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!(!ticker.is_active());
    }
}

use std::future::Future;
use std::time::Duration;

use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// Paces launches: each `tick` resolves at the next launch slot.
pub trait Ticker: Send {
    fn tick(&mut self) -> impl Future<Output = Instant> + Send;
}

/// Fixed period ticker on the tokio timer.
///
/// The first slot is one period after creation. Missed slots fire back to back,
/// so a dispatcher that fell behind still launches the full count in the same
/// overall time.
pub struct IntervalTicker {
    interval: Interval,
}

impl IntervalTicker {
    /// Must be called within a tokio runtime.
    #[must_use]
    pub fn new(period: Duration) -> Self {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
        Self { interval }
    }

    #[inline]
    #[must_use]
    pub fn period(&self) -> Duration {
        self.interval.period()
    }
}

impl Ticker for IntervalTicker {
    #[inline]
    fn tick(&mut self) -> impl Future<Output = Instant> + Send {
        self.interval.tick()
    }
}

use std::fmt;
use std::time::Duration;

use tracing::info;

use crate::aggregator::AggregateReport;

/// Final result of a run, read once after every worker has finished.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RunReport {
    pub aggregate: AggregateReport,
    pub dispatched: u64,
    pub elapsed: Duration,
}

impl RunReport {
    #[inline]
    #[must_use]
    pub fn average_latency_ms(&self) -> f64 {
        self.aggregate.average_latency_ms()
    }

    /// Requests launched per second of wall-clock time.
    #[must_use]
    pub fn achieved_rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.dispatched as f64 / secs
        } else {
            0.0
        }
    }

    /// Writes the terminal summary entry of the run log.
    pub fn log_summary(&self) {
        info!(
            dispatched = self.dispatched,
            success = self.aggregate.success_count,
            failure = self.aggregate.failure_count,
            excluded = self.aggregate.excluded_count,
            elapsed_secs = self.elapsed.as_secs_f64(),
            avg_latency_ms = self.average_latency_ms(),
            "Run complete"
        );
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Run complete! succeeded: {}, failed: {}",
            self.aggregate.success_count, self.aggregate.failure_count
        )?;
        if self.aggregate.excluded_count > 0 {
            writeln!(
                f,
                "Excluded (unparseable responses): {}",
                self.aggregate.excluded_count
            )?;
        }
        write!(
            f,
            "Dispatched: {} in {:.2} s ({:.1} req/s), average latency: {:.2} ms",
            self.dispatched,
            self.elapsed.as_secs_f64(),
            self.achieved_rate(),
            self.average_latency_ms()
        )
    }
}

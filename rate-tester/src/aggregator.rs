use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::outcome::RequestOutcome;

/// Log target of the per-request events; the console filter turns it off by default.
pub const OUTCOME_TARGET: &str = "rate_tester::outcome";

/// What to do with responses whose body cannot be parsed.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum MalformedBodyPolicy {
    #[default]
    CountAsFailure,
    /// Count them in neither success nor failure, only in `excluded_count`.
    Exclude,
}

/// Counts of a run, taken from an [`Aggregator`].
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct AggregateReport {
    pub success_count: u64,
    pub failure_count: u64,
    pub excluded_count: u64,
    pub total_latency_ms: f64,
}

impl AggregateReport {
    #[inline]
    #[must_use]
    pub fn recorded(&self) -> u64 {
        self.success_count + self.failure_count + self.excluded_count
    }

    /// Mean latency of successful requests, `0.0` when none succeeded.
    #[must_use]
    pub fn average_latency_ms(&self) -> f64 {
        if self.success_count == 0 {
            return 0.0;
        }
        self.total_latency_ms / self.success_count as f64
    }
}

/// Shared result counters, cloned into every worker.
///
/// Each counter is its own atomic. A snapshot is only consistent across fields
/// once no more workers are recording.
#[derive(Clone, Default)]
pub struct Aggregator {
    inner: Arc<Counters>,
    policy: MalformedBodyPolicy,
}

#[derive(Default)]
struct Counters {
    success: AtomicU64,
    failure: AtomicU64,
    excluded: AtomicU64,
    latency_us: AtomicU64,
}

impl Aggregator {
    #[must_use]
    pub fn new(policy: MalformedBodyPolicy) -> Self {
        Self {
            inner: Arc::default(),
            policy,
        }
    }

    #[inline]
    #[must_use]
    pub fn policy(&self) -> MalformedBodyPolicy {
        self.policy
    }

    /// Counts one outcome and logs it.
    pub fn record(&self, outcome: &RequestOutcome) {
        let latency = outcome.latency();
        let latency_ms = latency.as_secs_f64() * 1000.0;
        match outcome {
            RequestOutcome::Success { .. } => {
                let latency_us = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
                self.inner.latency_us.fetch_add(latency_us, Ordering::AcqRel);
                self.inner.success.fetch_add(1, Ordering::AcqRel);
                info!(target: OUTCOME_TARGET, latency_ms, "request succeeded");
            }
            RequestOutcome::ApplicationFailure { reason, .. }
                if reason.is_malformed() && self.policy == MalformedBodyPolicy::Exclude =>
            {
                self.inner.excluded.fetch_add(1, Ordering::AcqRel);
                warn!(target: OUTCOME_TARGET, latency_ms, %reason, "response excluded from counts");
            }
            RequestOutcome::ApplicationFailure { reason, .. } => {
                self.inner.failure.fetch_add(1, Ordering::AcqRel);
                error!(target: OUTCOME_TARGET, latency_ms, %reason, "request failed");
            }
            RequestOutcome::TransportFailure { reason, .. } => {
                self.inner.failure.fetch_add(1, Ordering::AcqRel);
                error!(target: OUTCOME_TARGET, latency_ms, %reason, "request failed");
            }
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> AggregateReport {
        let latency_us = self.inner.latency_us.load(Ordering::Acquire);
        AggregateReport {
            success_count: self.inner.success.load(Ordering::Acquire),
            failure_count: self.inner.failure.load(Ordering::Acquire),
            excluded_count: self.inner.excluded.load(Ordering::Acquire),
            total_latency_ms: latency_us as f64 / 1000.0,
        }
    }
}

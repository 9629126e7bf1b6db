use std::sync::Arc;

use hyper::Uri;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{info, info_span, warn, Instrument};

use crate::aggregator::Aggregator;
use crate::client::{HttpClient, HttpTarget, Target};
use crate::config::RunConfig;
use crate::error::ConfigError;
use crate::report::RunReport;
use crate::ticker::{IntervalTicker, Ticker};

const MAX_PREALLOCATED: usize = 1 << 16;

/// Launches one worker per tick for the configured duration, then waits for
/// every worker before reporting.
///
/// Launching never waits on a previous worker, so slow or failing requests
/// overlap instead of lowering the rate. The one exception is an explicit
/// `max_in_flight` ceiling, which holds the next launch until a worker finishes.
pub struct Dispatcher {
    config: RunConfig,
    uri: Uri,
    total_requests: u64,
}

impl Dispatcher {
    pub fn new(config: RunConfig) -> Result<Self, ConfigError> {
        let uri = config.validate()?;
        let total_requests = config.total_requests()?;
        Ok(Self {
            config,
            uri,
            total_requests,
        })
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn total_requests(&self) -> u64 {
        self.total_requests
    }

    /// Runs against the configured endpoint at the configured rate.
    pub async fn run(&self) -> RunReport {
        let target = HttpTarget::new(
            HttpClient::new(),
            self.uri.clone(),
            self.config.payload.clone(),
            self.config.per_request_timeout,
        );
        let ticker = IntervalTicker::new(self.config.tick());
        self.run_with(target, ticker).await
    }

    pub async fn run_with<T: Target, K: Ticker>(&self, target: T, mut ticker: K) -> RunReport {
        let aggregator = Aggregator::new(self.config.malformed_body_policy);
        let limiter = self
            .config
            .max_in_flight
            .map(|max| Arc::new(Semaphore::new(max)));
        info!(
            url = %self.uri,
            rate = self.config.requests_per_second,
            duration_secs = self.config.duration_secs,
            total = self.total_requests,
            "Starting run"
        );

        let start = Instant::now();
        let capacity = usize::try_from(self.total_requests)
            .map_or(MAX_PREALLOCATED, |n| n.min(MAX_PREALLOCATED));
        let mut workers = Vec::with_capacity(capacity);
        for seq in 0..self.total_requests {
            let permit = match &limiter {
                Some(limiter) => limiter.clone().acquire_owned().await.ok(),
                None => None,
            };
            let target = target.clone();
            let aggregator = aggregator.clone();
            workers.push(tokio::spawn(
                async move {
                    let outcome = target.fire().await;
                    aggregator.record(&outcome);
                    drop(permit);
                }
                .instrument(info_span!("worker", seq)),
            ));
            ticker.tick().await;
        }
        let dispatched = workers.len() as u64;
        info!(
            dispatched,
            launch_secs = start.elapsed().as_secs_f64(),
            "All workers launched, waiting for in-flight requests"
        );

        for worker in workers {
            if let Err(e) = worker.await {
                warn!("Worker did not complete: {e}");
            }
        }

        RunReport {
            aggregate: aggregator.snapshot(),
            dispatched,
            elapsed: start.elapsed(),
        }
    }
}

/// Validates `config` and runs it against its endpoint.
pub async fn run(config: RunConfig) -> Result<RunReport, ConfigError> {
    let dispatcher = Dispatcher::new(config)?;
    Ok(dispatcher.run().await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::RequestOutcome;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct RecordingTarget {
        launches: Arc<Mutex<Vec<Instant>>>,
        running: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
        hold: Duration,
    }

    impl RecordingTarget {
        fn holding(hold: Duration) -> Self {
            Self {
                hold,
                ..Self::default()
            }
        }

        fn launches(&self) -> Vec<Instant> {
            self.launches.lock().unwrap().clone()
        }
    }

    impl Target for RecordingTarget {
        fn fire(&self) -> impl std::future::Future<Output = RequestOutcome> + Send {
            let this = self.clone();
            async move {
                this.launches.lock().unwrap().push(Instant::now());
                let running = this.running.fetch_add(1, Ordering::AcqRel) + 1;
                this.peak.fetch_max(running, Ordering::AcqRel);
                tokio::time::sleep(this.hold).await;
                this.running.fetch_sub(1, Ordering::AcqRel);
                RequestOutcome::Success {
                    latency: this.hold,
                }
            }
        }
    }

    struct CountingTicker(Arc<AtomicUsize>);

    impl Ticker for CountingTicker {
        fn tick(&mut self) -> impl std::future::Future<Output = Instant> + Send {
            self.0.fetch_add(1, Ordering::AcqRel);
            std::future::ready(Instant::now())
        }
    }

    fn dispatcher(rate: u32, duration_secs: u64) -> Dispatcher {
        Dispatcher::new(RunConfig::new(
            "http://127.0.0.1:9/update/check_version",
            "{}",
            rate,
            duration_secs,
        ))
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn ten_per_second_launches_ten_over_one_second() {
        let dispatcher = dispatcher(10, 1);
        let target = RecordingTarget::holding(Duration::from_millis(5));
        let report = dispatcher
            .run_with(target.clone(), IntervalTicker::new(dispatcher.config().tick()))
            .await;

        let launches = target.launches();
        assert_eq!(launches.len(), 10);
        assert_eq!(report.dispatched, 10);
        let spread = *launches.last().unwrap() - launches[0];
        assert!(
            spread >= Duration::from_millis(900) && spread <= Duration::from_millis(1100),
            "first to last launch took {spread:?}"
        );
        for pair in launches.windows(2) {
            let gap = pair[1] - pair[0];
            assert!(gap >= Duration::from_millis(99) && gap <= Duration::from_millis(101));
        }
        assert_eq!(report.aggregate.success_count, 10);
        assert!(report.elapsed >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_requests_overlap_instead_of_slowing_the_rate() {
        let dispatcher = dispatcher(10, 1);
        let target = RecordingTarget::holding(Duration::from_secs(5));
        let report = dispatcher
            .run_with(target.clone(), IntervalTicker::new(dispatcher.config().tick()))
            .await;

        assert_eq!(report.aggregate.success_count, 10);
        assert_eq!(target.peak.load(Ordering::Acquire), 10);
        // Last launch at 0.9s plus one 5s request; serial execution would take 50s.
        assert!(report.elapsed >= Duration::from_millis(5_900));
        assert!(report.elapsed < Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn ceiling_caps_in_flight_workers() {
        let mut config = RunConfig::new("http://127.0.0.1:9/", "{}", 20, 1);
        config.max_in_flight = Some(3);
        let dispatcher = Dispatcher::new(config).unwrap();
        let target = RecordingTarget::holding(Duration::from_millis(500));
        let report = dispatcher
            .run_with(target.clone(), IntervalTicker::new(dispatcher.config().tick()))
            .await;

        assert_eq!(report.dispatched, 20);
        assert_eq!(report.aggregate.success_count, 20);
        assert_eq!(target.peak.load(Ordering::Acquire), 3);
    }

    #[tokio::test]
    async fn one_tick_per_launch() {
        let dispatcher = dispatcher(7, 3);
        let ticks = Arc::new(AtomicUsize::new(0));
        let target = RecordingTarget::default();
        let report = dispatcher
            .run_with(target.clone(), CountingTicker(ticks.clone()))
            .await;

        assert_eq!(ticks.load(Ordering::Acquire), 21);
        assert_eq!(target.launches().len(), 21);
        assert_eq!(report.dispatched, 21);
        assert_eq!(report.aggregate.recorded(), 21);
    }

    #[tokio::test]
    async fn invalid_config_fails_before_dispatch() {
        let err = run(RunConfig::new("http://127.0.0.1:9/", "{}", 0, 1))
            .await
            .unwrap_err();
        assert_eq!(err, ConfigError::ZeroRate);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_beyond_timer_resolution_is_rejected() {
        let err = run(RunConfig::new("http://127.0.0.1:9/", "{}", 2_000_000_000, 1))
            .await
            .unwrap_err();
        assert_eq!(err, ConfigError::RateTooHigh(2_000_000_000));
    }
}

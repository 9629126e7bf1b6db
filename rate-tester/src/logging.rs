use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::Subscriber;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::aggregator::OUTCOME_TARGET;

/// Installs the global subscriber.
///
/// The console gets `RUST_LOG`, or `log_level` with per-request events
/// silenced. The log file, when given, gets every event at info and above as
/// JSON lines, one per request outcome plus the run summary.
pub fn init(log_level: &str, log_file: Option<&Path>) -> Result<()> {
    let console = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(console_filter(log_level)?);
    let file = match log_file {
        Some(path) => {
            Some(json_layer(Mutex::new(open_log_file(path)?)))
        }
        None => None,
    };
    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()
        .context("Failed to install tracing subscriber")
}

/// Opens `path` for appending, so earlier runs stay in the log.
fn open_log_file(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))
}

/// JSON lines at info and above, tagged with the enclosing worker span.
pub fn json_layer<S, W>(writer: W) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a> + 'static,
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(false)
        .with_writer(writer)
        .with_filter(LevelFilter::INFO)
}

fn console_filter(log_level: &str) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(format!("{log_level},{OUTCOME_TARGET}=off"))
        .with_context(|| format!("Invalid log level {log_level:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::Aggregator;
    use crate::client::Target;
    use crate::config::RunConfig;
    use crate::dispatcher::Dispatcher;
    use crate::error::{ApplicationError, TransportError};
    use crate::outcome::RequestOutcome;
    use crate::ticker::Ticker;
    use std::io::{self, Write};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::Instant;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl io::Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn lines(&self) -> Vec<serde_json::Value> {
            let raw = self.0.lock().unwrap().clone();
            String::from_utf8(raw)
                .unwrap()
                .lines()
                .map(|line| serde_json::from_str(line).unwrap())
                .collect()
        }
    }

    #[test]
    fn failure_entry_carries_server_reason() {
        let buf = SharedBuf::default();
        let writer = buf.clone();
        let subscriber = tracing_subscriber::registry().with(json_layer(move || writer.clone()));
        tracing::subscriber::with_default(subscriber, || {
            let span = tracing::info_span!("worker", seq = 7u64);
            let _entered = span.enter();
            Aggregator::default().record(&RequestOutcome::ApplicationFailure {
                latency: Duration::from_millis(4),
                reason: ApplicationError::Rejected {
                    status: 500,
                    message: "boom".into(),
                },
            });
        });

        let lines = buf.lines();
        assert_eq!(lines.len(), 1);
        let entry = &lines[0];
        assert_eq!(entry["level"], "ERROR");
        assert_eq!(entry["target"], OUTCOME_TARGET);
        assert_eq!(entry["fields"]["message"], "request failed");
        assert_eq!(entry["fields"]["reason"], "HTTP 500: boom");
        assert_eq!(entry["span"]["seq"], 7);
    }

    #[test]
    fn debug_events_stay_out_of_the_file() {
        let buf = SharedBuf::default();
        let writer = buf.clone();
        let subscriber = tracing_subscriber::registry().with(json_layer(move || writer.clone()));
        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!("noise");
            tracing::info!("kept");
        });
        let lines = buf.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["fields"]["message"], "kept");
    }

    #[test]
    fn console_filter_accepts_plain_levels() {
        for level in ["error", "warn", "info", "debug", "trace"] {
            assert!(console_filter(level).is_ok(), "{level}");
        }
    }

    /// Every other request times out.
    #[derive(Clone, Default)]
    struct AlternatingTarget(Arc<AtomicU64>);

    impl Target for AlternatingTarget {
        fn fire(&self) -> impl std::future::Future<Output = RequestOutcome> + Send {
            let n = self.0.fetch_add(1, Ordering::AcqRel);
            let latency = Duration::from_millis(3);
            std::future::ready(if n % 2 == 0 {
                RequestOutcome::Success { latency }
            } else {
                RequestOutcome::TransportFailure {
                    latency,
                    reason: TransportError::Timeout(latency),
                }
            })
        }
    }

    struct ImmediateTicker;

    impl Ticker for ImmediateTicker {
        fn tick(&mut self) -> impl std::future::Future<Output = Instant> + Send {
            std::future::ready(Instant::now())
        }
    }

    #[tokio::test]
    async fn run_log_has_one_entry_per_request_and_one_summary() {
        let buf = SharedBuf::default();
        let writer = buf.clone();
        let _guard = tracing::subscriber::set_default(
            tracing_subscriber::registry().with(json_layer(move || writer.clone())),
        );

        let dispatcher = Dispatcher::new(RunConfig::new("http://127.0.0.1:9/", "{}", 5, 2)).unwrap();
        let report = dispatcher
            .run_with(AlternatingTarget::default(), ImmediateTicker)
            .await;
        report.log_summary();

        let lines = buf.lines();
        let outcomes: Vec<_> = lines
            .iter()
            .filter(|entry| entry["target"] == OUTCOME_TARGET)
            .collect();
        assert_eq!(outcomes.len(), 10);
        assert!(outcomes.iter().all(|entry| entry["span"]["name"] == "worker"));
        assert_eq!(
            outcomes.iter().filter(|entry| entry["level"] == "ERROR").count(),
            5
        );

        let summaries: Vec<_> = lines
            .iter()
            .filter(|entry| entry["fields"]["message"] == "Run complete")
            .collect();
        assert_eq!(summaries.len(), 1);
        let summary = &summaries[0]["fields"];
        assert_eq!(summary["success"], report.aggregate.success_count);
        assert_eq!(summary["failure"], report.aggregate.failure_count);
        assert_eq!(summary["dispatched"], 10);
        assert_eq!(report.aggregate.success_count, 5);
        assert_eq!(report.aggregate.failure_count, 5);
    }

    #[test]
    fn log_file_is_appended_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");

        writeln!(open_log_file(&path).unwrap(), "first").unwrap();
        writeln!(open_log_file(&path).unwrap(), "second").unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "first\nsecond\n");
    }
}

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use http_test_util::{VersionCheckRequest, CHECK_VERSION_PATH};
use rate_tester::config::{target_url, timeout_from_secs};
use rate_tester::{logging, Dispatcher, MalformedBodyPolicy, RunConfig};

/// Fires version checks at a fixed rate and reports how the endpoint held up.
#[derive(Parser, Debug)]
#[command(name = "rate-tester")]
struct Args {
    /// Target host or IP
    #[arg(long, default_value = "127.0.0.1", env = "RATE_TESTER_HOST")]
    host: String,

    /// Target port
    #[arg(long, default_value_t = 8080, env = "RATE_TESTER_PORT")]
    port: u16,

    /// Endpoint path
    #[arg(long, default_value = CHECK_VERSION_PATH, env = "RATE_TESTER_PATH")]
    path: String,

    /// Requests launched per second
    #[arg(long, default_value_t = 300, env = "RATE_TESTER_RATE")]
    rate: u32,

    /// Run length in seconds
    #[arg(long, default_value_t = 10, env = "RATE_TESTER_DURATION")]
    duration: u64,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 2.0, env = "RATE_TESTER_TIMEOUT")]
    timeout: f64,

    /// `version` sent in the payload
    #[arg(long, default_value = "v1.0", env = "RATE_TESTER_CLIENT_VERSION")]
    client_version: String,

    /// `os-arch` sent in the payload
    #[arg(long, default_value = "windows-x64", env = "RATE_TESTER_OS_ARCH")]
    os_arch: String,

    /// Cap on concurrently running requests, unbounded when unset
    #[arg(long, env = "RATE_TESTER_MAX_IN_FLIGHT")]
    max_in_flight: Option<usize>,

    /// Count unparseable responses as neither success nor failure
    #[arg(long, env = "RATE_TESTER_EXCLUDE_MALFORMED")]
    exclude_malformed: bool,

    /// JSON lines log of every request outcome, appended to across runs
    #[arg(long, default_value = "check_version_test.log", env = "RATE_TESTER_LOG_FILE")]
    log_file: PathBuf,

    /// Console log level, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn run_config(&self) -> Result<RunConfig> {
        let payload = serde_json::to_vec(&VersionCheckRequest::new(
            self.client_version.as_str(),
            self.os_arch.as_str(),
        ))
        .context("Failed to serialize payload")?;
        let policy = if self.exclude_malformed {
            MalformedBodyPolicy::Exclude
        } else {
            MalformedBodyPolicy::CountAsFailure
        };
        Ok(RunConfig::new(
            target_url(&self.host, self.port, &self.path),
            payload,
            self.rate,
            self.duration,
        )
        .with_timeout(timeout_from_secs(self.timeout)?)
        .with_max_in_flight(self.max_in_flight)
        .with_malformed_body_policy(policy))
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let dispatcher = Dispatcher::new(args.run_config()?).context("Invalid run configuration")?;
    logging::init(&args.log_level, Some(args.log_file.as_path()))?;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build runtime")?;
    let report = rt.block_on(dispatcher.run());

    report.log_summary();
    println!("{report}");
    Ok(())
}

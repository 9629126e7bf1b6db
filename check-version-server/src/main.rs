use anyhow::{Context, Result};
use check_version_server::release::{ReleaseAsset, ReleaseInfo};
use check_version_server::{router, AppState};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Serves version checks for one configured release.
#[derive(Parser, Debug)]
#[command(name = "check-version-server")]
struct Args {
    /// Listen address
    #[arg(short, long, default_value = "127.0.0.1:8080", env = "CHECK_VERSION_LISTEN")]
    listen: String,

    /// Version of the latest release
    #[arg(long, default_value = "v1.0.0", env = "CHECK_VERSION_LATEST")]
    latest_version: String,

    /// Release page offered when no asset fits the client
    #[arg(
        long,
        default_value = "https://example.com/releases/latest",
        env = "CHECK_VERSION_UPDATE_URL"
    )]
    update_url: String,

    /// Release notes returned to clients
    #[arg(long, default_value = "", env = "CHECK_VERSION_UPDATE_LOG")]
    update_log: String,

    /// Release asset as NAME=URL, repeatable
    #[arg(long = "asset")]
    assets: Vec<ReleaseAsset>,

    /// Log level, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build runtime")?;
    rt.block_on(run_server(args))
}

async fn run_server(args: Args) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(&args.listen)
        .await
        .with_context(|| format!("Failed to bind {}", args.listen))?;
    let release = ReleaseInfo {
        version: args.latest_version,
        update_url: args.update_url,
        update_log: args.update_log,
        assets: args.assets,
    };
    info!(
        listen = %args.listen,
        version = %release.version,
        assets = release.assets.len(),
        "Serving version checks"
    );
    axum::serve(listener, router(AppState::new(release)))
        .await
        .context("Server failed")
}

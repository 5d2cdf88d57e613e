//! File Cache janitor
//!
//! Opens a file cache root and keeps its expiration sweep running until
//! shutdown, reclaiming entries left behind by processes that no longer run.

use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use file_cache::{Config, FileCache};

/// Main entry point for the file cache janitor.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the cache, which starts the sweeper and refresh worker
/// 4. Wait for SIGINT/SIGTERM, then shut down gracefully
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "file_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting file cache janitor");

    let config = Config::from_env();
    info!(
        "Configuration loaded: path={}, cleanup_interval={}s, default_ttl={}s",
        config.cache_path.display(),
        config.cleanup_interval.as_secs(),
        config.default_ttl.as_secs()
    );

    let cache = FileCache::open(config).await?;

    shutdown_signal().await?;

    cache.shutdown().await;
    let stats = cache.stats();
    info!(
        "Janitor stopped after {} sweeps, {} expired entries removed",
        stats.sweeps, stats.expired
    );
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() -> anyhow::Result<()> {
    let ctrl_c = signal::ctrl_c();

    #[cfg(unix)]
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
    #[cfg(unix)]
    let terminate = sigterm.recv();

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Option<()>>();

    tokio::select! {
        result = ctrl_c => {
            result?;
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
    Ok(())
}

//! sentiment-poller binary entrypoint
//! Resolves configuration, builds one poller per selected source around a shared
//! publisher, and runs them until Ctrl-C / SIGTERM.

use anyhow::{Context, Result};
use tokio::signal;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use sentiment_poller::config::{active_sources, ConfigResolver, QueueSettings, TelemetrySettings};
use sentiment_poller::http::build_client;
use sentiment_poller::poller::Poller;
use sentiment_poller::publish::build_publisher;
use sentiment_poller::sources::{AdapterContext, Registry};
use sentiment_poller::telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();

    let config = ConfigResolver::from_process();

    let telemetry_settings =
        TelemetrySettings::resolve(&config).context("resolving logging/metrics settings")?;
    telemetry::init_tracing(&telemetry_settings);
    telemetry::init_metrics(&telemetry_settings).context("installing prometheus exporter")?;

    // Required keys fail the process here rather than every cycle.
    let symbol_count = config.symbols().context("resolving symbol list")?.len();
    let sources = active_sources(&config).context("resolving active sources")?;
    let queue = QueueSettings::resolve(&config).context("resolving queue settings")?;

    let http = build_client().context("building HTTP client")?;
    let publisher = build_publisher(queue).await;
    let registry = Registry::builtin();

    let mut pollers = Vec::with_capacity(sources.len());
    for source in &sources {
        let ctx = AdapterContext::new(config.clone(), http.clone(), *source)
            .with_context(|| format!("resolving settings for {source}"))?;
        let adapter = registry
            .build(&ctx)
            .with_context(|| format!("building {source} adapter"))?;
        let poller = Poller::from_config(adapter, publisher.clone(), config.clone())
            .with_context(|| format!("building {source} poller"))?;
        pollers.push(poller);
    }

    info!(
        sources = ?sources.iter().map(|s| s.platform()).collect::<Vec<_>>(),
        symbols = symbol_count,
        transport = publisher.transport(),
        "starting pollers"
    );

    let cancel = CancellationToken::new();
    let mut tasks = JoinSet::new();
    for poller in pollers {
        let token = cancel.child_token();
        tasks.spawn(async move { poller.run(token).await });
    }

    shutdown_signal().await;
    cancel.cancel();

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            error!(error = %e, "poller task ended abnormally");
        }
    }
    info!("all pollers stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}

// src/telemetry.rs
//! Logging and metrics setup.

use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::TelemetrySettings;

pub const CYCLES_TOTAL: &str = "poller_cycles_total";
pub const RECORDS_TOTAL: &str = "poller_records_total";
pub const FETCH_ERRORS_TOTAL: &str = "poller_fetch_errors_total";
pub const FETCH_RETRIES_TOTAL: &str = "poller_fetch_retries_total";
pub const THROTTLE_WAITS_TOTAL: &str = "poller_throttle_waits_total";
pub const PUBLISH_TOTAL: &str = "poller_publish_total";
pub const PUBLISH_ERRORS_TOTAL: &str = "poller_publish_errors_total";
pub const CONFIG_ERRORS_TOTAL: &str = "poller_config_errors_total";
pub const CYCLE_DURATION_MS: &str = "poller_cycle_duration_ms";
pub const LAST_CYCLE_TS: &str = "poller_last_cycle_ts";

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(CYCLES_TOTAL, "Completed poll cycles.");
        describe_counter!(RECORDS_TOTAL, "Records handed to the publisher.");
        describe_counter!(
            FETCH_ERRORS_TOTAL,
            "Symbol fetches that failed after retries, by kind."
        );
        describe_counter!(FETCH_RETRIES_TOTAL, "Fetch attempts retried after a transient error.");
        describe_counter!(THROTTLE_WAITS_TOTAL, "Fetches that waited for a rate-limit token.");
        describe_counter!(PUBLISH_TOTAL, "Batches published.");
        describe_counter!(PUBLISH_ERRORS_TOTAL, "Batches lost to transport failures.");
        describe_counter!(CONFIG_ERRORS_TOTAL, "Cycles skipped because configuration did not resolve.");
        describe_histogram!(CYCLE_DURATION_MS, "Poll cycle wall time in milliseconds.");
        describe_gauge!(LAST_CYCLE_TS, "Unix ts when the source last finished a cycle.");
    });
}

/// Install the global subscriber. `RUST_LOG` wins over `LOG_LEVEL` when set.
/// A no-op when logging is disabled or a subscriber is already installed.
pub fn init_tracing(settings: &TelemetrySettings) {
    if !settings.logging_enabled {
        return;
    }
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    let installed = if settings.json {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// Start the Prometheus listener when `METRICS_ADDR` is configured. Must run
/// inside the tokio runtime.
pub fn init_metrics(settings: &TelemetrySettings) -> Result<(), BuildError> {
    if let Some(addr) = settings.metrics_addr {
        PrometheusBuilder::new().with_http_listener(addr).install()?;
        tracing::info!(%addr, "prometheus exporter listening");
    }
    // descriptions only stick once a recorder is installed
    ensure_metrics_described();
    Ok(())
}

use anyhow::{Context, Result};
use metrics::gauge;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Install the Prometheus recorder with its own scrape listener on `listen`.
/// Without an address no recorder is installed and the `metrics` macros are no-ops.
///
/// Must be called from within a tokio runtime.
pub fn init(listen: Option<&str>, interval_secs: u64) -> Result<Option<SocketAddr>> {
    let Some(listen) = listen.map(str::trim).filter(|l| !l.is_empty()) else {
        return Ok(None);
    };
    let addr: SocketAddr = listen
        .parse()
        .with_context(|| format!("invalid metrics listen address {listen:?}"))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("prometheus: install recorder")?;

    crate::ingest::ensure_metrics_described();
    // Static gauge with the configured schedule interval.
    gauge!("pipeline_interval_seconds").set(interval_secs as f64);

    tracing::info!(%addr, "metrics exporter listening");
    Ok(Some(addr))
}

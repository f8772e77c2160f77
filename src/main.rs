//! movie-tracker: binary entrypoint.
//! Loads config, wires the tracker and either runs one pass (`--once`) or
//! the interval scheduler until Ctrl-C.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use movie_tracker::scheduler::spawn_scheduler;
use movie_tracker::{AdapterRegistry, Tracker, TrackerConfig};

#[derive(Debug, Parser)]
#[command(name = "movie-tracker", version, about = "Ranked movie digest from several listing sources")]
struct Cli {
    /// Run a single pass and exit.
    #[arg(long)]
    once: bool,

    /// Config file (default: $TRACKER_CONFIG_PATH, then config/tracker.toml).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Fixed dedup run id, shared across invocations.
    #[arg(long, value_name = "ID")]
    run_id: Option<String>,

    /// Print the enabled sources and exit.
    #[arg(long)]
    list_sources: bool,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("movie_tracker=info,warn"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let mut cfg = TrackerConfig::load(cli.config.as_deref())?;
    if let Some(id) = cli.run_id {
        cfg.dedup.run_id = Some(id);
    }

    if cli.list_sources {
        let registry = AdapterRegistry::builtin_enabled(&cfg.sources.enabled);
        for (i, name) in registry.names().enumerate() {
            println!("{:>2}. {name}", i + 1);
        }
        return Ok(());
    }

    movie_tracker::metrics::init(cfg.metrics.listen.as_deref(), cfg.schedule.interval_seconds)?;
    let tracker = Tracker::from_config(&cfg)?;

    if cli.once {
        let report = tracker.run_once().await?;
        tracing::info!(
            run_id = %report.run_id,
            outcome = ?report.outcome,
            fetched = report.fetched,
            unique = report.unique,
            selected = report.selected(),
            "single run complete"
        );
        return Ok(());
    }

    let every = Duration::from_secs(cfg.schedule.interval_seconds);
    let handle = spawn_scheduler(Arc::new(tracker), every);
    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                tracing::warn!(error = %e, "cannot listen for Ctrl-C");
            }
            tracing::info!("shutting down");
        }
        res = handle => {
            if let Err(e) = res {
                tracing::error!(error = %e, "scheduler task ended unexpectedly");
            }
        }
    }
    Ok(())
}

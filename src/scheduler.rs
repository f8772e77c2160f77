// src/scheduler.rs
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::pipeline::Tracker;

/// Run `tracker.run_once()` every `every`, starting immediately.
///
/// Passes never overlap: a tick that comes due while a pass is still running
/// is skipped. A failed pass is logged and the loop carries on.
pub fn spawn_scheduler(tracker: Arc<Tracker>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every.max(Duration::from_secs(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(interval_secs = every.as_secs(), "scheduler started");
        loop {
            ticker.tick().await;
            match tracker.run_once().await {
                Ok(report) => tracing::info!(
                    run_id = %report.run_id,
                    outcome = ?report.outcome,
                    selected = report.selected(),
                    "scheduled run done"
                ),
                Err(e) => tracing::error!(error = ?e, "scheduled run failed"),
            }
        }
    })
}

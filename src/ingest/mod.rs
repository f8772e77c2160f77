// src/ingest/mod.rs
pub mod fetch;
pub mod format;
pub mod providers;
pub mod registry;
pub mod types;

use futures::future::join_all;
use futures::FutureExt;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use crate::ingest::fetch::{fetch_with_retry, FetchPolicy, Transport};
use crate::ingest::registry::AdapterRegistry;
use crate::ingest::types::{Item, SourceAdapter};

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("fetch_attempts_total", "HTTP attempts issued by adapters.");
        describe_counter!(
            "fetch_adapter_failures_total",
            "Adapters that ended a run with zero items due to fetch failure or panic."
        );
        describe_counter!("fetch_items_total", "Items parsed from adapter payloads.");
        describe_histogram!("parse_ms", "Adapter parse time in milliseconds.");
        describe_counter!("dedup_kept_total", "Items kept by the deduplicator.");
        describe_counter!(
            "dedup_duplicates_total",
            "Items dropped as duplicates within a run."
        );
        describe_counter!("pipeline_runs_total", "Completed pipeline passes.");
        describe_gauge!(
            "pipeline_last_run_ts",
            "Unix ts when the pipeline last ran."
        );
        describe_gauge!(
            "pipeline_interval_seconds",
            "Configured scheduler interval."
        );
    });
}

/// Runs every registered adapter concurrently and pools their items.
///
/// Individual adapter failures (exhausted retries, HTTP errors, panics) are
/// logged and contribute zero items; `run_all` itself never fails.
#[derive(Clone)]
pub struct Orchestrator {
    transport: Arc<dyn Transport>,
    policy: FetchPolicy,
}

impl Orchestrator {
    pub fn new(transport: Arc<dyn Transport>, policy: FetchPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    pub async fn run_all(&self, registry: &AdapterRegistry) -> Vec<Item> {
        ensure_metrics_described();

        if registry.is_empty() {
            tracing::warn!("no adapters registered");
            return Vec::new();
        }

        tracing::info!(adapters = registry.len(), "running adapters");
        let runs = registry.iter().map(|a| self.run_adapter(a.as_ref()));
        let pooled: Vec<Item> = join_all(runs).await.into_iter().flatten().collect();

        tracing::info!(items = pooled.len(), "fetch complete");
        pooled
    }

    /// Isolation boundary: a panicking adapter is treated like one that exhausted its retries.
    async fn run_adapter(&self, adapter: &dyn SourceAdapter) -> Vec<Item> {
        match AssertUnwindSafe(self.crawl(adapter)).catch_unwind().await {
            Ok(items) => items,
            Err(_) => {
                tracing::error!(adapter = adapter.name(), "adapter panicked; contributing no items");
                counter!("fetch_adapter_failures_total").increment(1);
                Vec::new()
            }
        }
    }

    async fn crawl(&self, adapter: &dyn SourceAdapter) -> Vec<Item> {
        let name = adapter.name();
        let Some(target) = adapter.target() else {
            tracing::warn!(adapter = name, "adapter has no fetch target; skipping");
            return Vec::new();
        };

        tracing::debug!(adapter = name, url = %target.url, "fetching");
        let body =
            match fetch_with_retry(self.transport.as_ref(), name, &target, &self.policy).await {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!(adapter = name, error = %e, "adapter fetch failed; contributing no items");
                    counter!("fetch_adapter_failures_total").increment(1);
                    return Vec::new();
                }
            };

        let t0 = std::time::Instant::now();
        let items = adapter.parse(&body);
        histogram!("parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("fetch_items_total").increment(items.len() as u64);

        if items.is_empty() {
            tracing::warn!(adapter = name, "adapter parsed no items");
        } else {
            tracing::info!(adapter = name, items = items.len(), "adapter parsed items");
        }
        items
    }
}

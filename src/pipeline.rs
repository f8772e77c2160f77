// src/pipeline.rs
//! One tracker pass: fetch → dedup → aggregate → notify → cleanup.

use anyhow::{Context, Result};
use metrics::{counter, gauge};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;

use crate::analyze::Aggregator;
use crate::config::{StoreBackend, TrackerConfig};
use crate::credibility::CredibilityTable;
use crate::dedup::{Deduplicator, FileStore, MembershipStore, MemoryStore};
use crate::ingest::fetch::HttpTransport;
use crate::ingest::registry::AdapterRegistry;
use crate::ingest::types::Item;
use crate::ingest::Orchestrator;
use crate::notify::{self, Notifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Nothing was fetched; dedup, aggregation and notification were skipped.
    NoItems,
    Completed,
    /// The result was computed but the notifier reported an error.
    NotifyFailed,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: String,
    pub fetched: usize,
    pub unique: usize,
    /// Final ranked list handed to the notifier.
    pub items: Vec<Item>,
    pub notified: bool,
    pub outcome: RunOutcome,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn selected(&self) -> usize {
        self.items.len()
    }
}

/// Fresh 8-hex-char run id.
pub fn new_run_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

pub struct Tracker {
    registry: AdapterRegistry,
    orchestrator: Orchestrator,
    dedup: Deduplicator,
    aggregator: Aggregator,
    notifier: Arc<dyn Notifier>,
    run_id: Option<String>,
    keep_after_run: bool,
}

impl Tracker {
    pub fn new(
        registry: AdapterRegistry,
        orchestrator: Orchestrator,
        dedup: Deduplicator,
        aggregator: Aggregator,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            registry,
            orchestrator,
            dedup,
            aggregator,
            notifier,
            run_id: None,
            keep_after_run: false,
        }
    }

    /// Reuse `run_id` for every pass instead of generating one.
    pub fn with_run_id(mut self, run_id: Option<String>) -> Self {
        self.run_id = run_id.filter(|r| !r.trim().is_empty());
        self
    }

    pub fn keep_after_run(mut self, keep: bool) -> Self {
        self.keep_after_run = keep;
        self
    }

    /// Wire every collaborator from config: HTTP transport, enabled built-in
    /// adapters, dedup backend, scoring parameters and notifier.
    pub fn from_config(cfg: &TrackerConfig) -> Result<Self> {
        let transport = HttpTransport::new(&cfg.fetch.user_agent).context("building HTTP client")?;
        let orchestrator = Orchestrator::new(Arc::new(transport), cfg.fetch.policy());
        let registry = AdapterRegistry::builtin_enabled(&cfg.sources.enabled);

        let store: Arc<dyn MembershipStore> = match cfg.dedup.backend {
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
            StoreBackend::File => Arc::new(FileStore::open(&cfg.dedup.dir)?),
        };
        let dedup = Deduplicator::with_namespace(store, cfg.dedup.namespace.clone());

        let aggregator = Aggregator::new(
            crate::analyze::WeightVector::default().with(cfg.weights),
            CredibilityTable::default_seed().merged(&cfg.credibility),
            cfg.selection,
        );

        Ok(Self::new(
            registry,
            orchestrator,
            dedup,
            aggregator,
            notify::from_settings(&cfg.notify),
        )
        .with_run_id(cfg.dedup.run_id.clone())
        .keep_after_run(cfg.dedup.keep_after_run))
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    /// Execute one pass. Adapter failures never fail the run; dedup store
    /// errors do.
    pub async fn run_once(&self) -> Result<RunReport> {
        let run_id = self.run_id.clone().unwrap_or_else(new_run_id);
        let span = tracing::info_span!("run", run_id = %run_id);
        let result = self.execute(run_id).instrument(span).await;

        counter!("pipeline_runs_total").increment(1);
        gauge!("pipeline_last_run_ts").set(chrono::Utc::now().timestamp() as f64);
        result
    }

    async fn execute(&self, run_id: String) -> Result<RunReport> {
        let started = Instant::now();
        tracing::info!(adapters = self.registry.len(), "run started");

        let pooled = self.orchestrator.run_all(&self.registry).await;
        let fetched = pooled.len();
        if pooled.is_empty() {
            tracing::warn!("no items fetched; nothing to do");
            return Ok(RunReport {
                run_id,
                fetched: 0,
                unique: 0,
                items: Vec::new(),
                notified: false,
                outcome: RunOutcome::NoItems,
                elapsed: started.elapsed(),
            });
        }

        let (unique, items) = match self.dedup_and_rank(pooled, &run_id) {
            Ok(done) => done,
            Err(e) => {
                if self.keep_after_run {
                    return Err(e);
                }
                return match self.dedup.cleanup(&run_id) {
                    Ok(_) => Err(e),
                    Err(c) => Err(e.context(format!("cleanup after failed dedup also failed: {c:#}"))),
                };
            }
        };

        let (notified, outcome) = match self.notifier.send(&items).await {
            Ok(()) => (true, RunOutcome::Completed),
            Err(e) => {
                tracing::error!(notifier = self.notifier.name(), error = ?e, "notification failed");
                (false, RunOutcome::NotifyFailed)
            }
        };

        if !self.keep_after_run {
            self.dedup.cleanup(&run_id)?;
        }

        let elapsed = started.elapsed();
        tracing::info!(
            fetched,
            unique,
            selected = items.len(),
            notified,
            elapsed_ms = elapsed.as_millis() as u64,
            "run finished"
        );
        Ok(RunReport {
            run_id,
            fetched,
            unique,
            items,
            notified,
            outcome,
            elapsed,
        })
    }

    fn dedup_and_rank(&self, pooled: Vec<Item>, run_id: &str) -> Result<(usize, Vec<Item>)> {
        let unique = self.dedup.filter(pooled, run_id)?;
        let n = unique.len();
        Ok((n, self.aggregator.aggregate(unique)))
    }
}

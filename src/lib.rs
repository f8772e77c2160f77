// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod analyze;
pub mod config;
pub mod credibility;
pub mod dedup;
pub mod ingest;
pub mod metrics;
pub mod notify;
pub mod pipeline;
pub mod scheduler;

// ---- Re-exports for stable public API ----
pub use crate::analyze::{Aggregator, SelectionPolicy, WeightUpdate, WeightVector};
pub use crate::config::TrackerConfig;
pub use crate::credibility::CredibilityTable;
pub use crate::dedup::{Deduplicator, FileStore, MembershipStore, MemoryStore};
pub use crate::ingest::fetch::{FetchError, FetchPolicy, HttpTransport, Transport};
pub use crate::ingest::registry::AdapterRegistry;
pub use crate::ingest::types::{FetchTarget, Item, SourceAdapter};
pub use crate::ingest::Orchestrator;
pub use crate::pipeline::{RunOutcome, RunReport, Tracker};

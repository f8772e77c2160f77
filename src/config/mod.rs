// src/config/mod.rs
pub mod tracker;

pub use tracker::{
    DedupSection, FetchSection, MetricsSection, NotifySection, ScheduleSection, SourcesSection,
    StoreBackend, TrackerConfig,
};

// src/ingest/types.rs
use serde::{Deserialize, Serialize};

/// One ranked listing entry as produced by a source adapter.
///
/// `composite_score` stays `None` until the aggregator has scored the item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub title: String,
    #[serde(default)]
    pub score: f64,
    pub url: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composite_score: Option<f64>,
}

impl Item {
    /// Build an item from raw adapter fields.
    ///
    /// Returns `None` when the title or url is blank, which is how adapters
    /// drop malformed records. Non-finite scores default to 0.
    pub fn new(
        title: impl AsRef<str>,
        score: f64,
        url: impl AsRef<str>,
        source: impl Into<String>,
    ) -> Option<Self> {
        let title = title.as_ref().trim();
        let url = url.as_ref().trim();
        if title.is_empty() || url.is_empty() {
            return None;
        }
        Some(Self {
            title: title.to_string(),
            score: if score.is_finite() { score } else { 0.0 },
            url: url.to_string(),
            source: source.into(),
            description: None,
            composite_score: None,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let d = description.into();
        self.description = if d.trim().is_empty() { None } else { Some(d) };
        self
    }
}

/// Where and how an adapter wants its payload fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTarget {
    pub url: String,
    /// Extra request headers (Referer, Accept, ...), applied on top of the transport defaults.
    pub headers: Vec<(String, String)>,
}

impl FetchTarget {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// The capability set the orchestrator relies on. The orchestrator never
/// inspects payload shape; decoding happens behind `parse`.
pub trait SourceAdapter: Send + Sync {
    /// Registry key, e.g. `douban_top250`.
    fn name(&self) -> &str;

    /// `None` means "nothing to fetch this run"; the adapter is skipped.
    fn target(&self) -> Option<FetchTarget>;

    /// Turn a raw payload into items. Malformed records are skipped, never fatal.
    fn parse(&self, raw: &str) -> Vec<Item>;
}

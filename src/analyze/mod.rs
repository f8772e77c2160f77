// src/analyze/mod.rs
//! Aggregation entry: composite scoring followed by source-diversified selection.

pub mod scoring;
pub mod select;
pub mod weights;

use std::collections::BTreeMap;

use crate::credibility::CredibilityTable;
use crate::ingest::types::Item;

pub use crate::analyze::scoring::{base_popularity_bonus, source_keyword_bonus, ScoreParts};
pub use crate::analyze::select::{Candidate, SelectionPolicy};
pub use crate::analyze::weights::{WeightUpdate, WeightVector};

/// Owns the scoring parameters. All of them are plain values; the `with_*`
/// methods return a reconfigured copy.
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    weights: WeightVector,
    credibility: CredibilityTable,
    selection: SelectionPolicy,
}

impl Aggregator {
    pub fn new(
        weights: WeightVector,
        credibility: CredibilityTable,
        selection: SelectionPolicy,
    ) -> Self {
        Self {
            weights,
            credibility,
            selection,
        }
    }

    pub fn with_weights(&self, update: WeightUpdate) -> Self {
        Self {
            weights: self.weights.with(update),
            ..self.clone()
        }
    }

    pub fn with_credibility(&self, source: impl Into<String>, weight: f64) -> Self {
        Self {
            credibility: self.credibility.with_source(source, weight),
            ..self.clone()
        }
    }

    pub fn with_selection(&self, selection: SelectionPolicy) -> Self {
        Self {
            selection,
            ..self.clone()
        }
    }

    pub fn weights(&self) -> &WeightVector {
        &self.weights
    }

    pub fn credibility(&self) -> &CredibilityTable {
        &self.credibility
    }

    pub fn selection(&self) -> &SelectionPolicy {
        &self.selection
    }

    /// Attach `composite_score` to every item, then select and rank.
    pub fn aggregate(&self, items: Vec<Item>) -> Vec<Item> {
        if items.is_empty() {
            return Vec::new();
        }

        let scored = self.score_all(items);
        let candidates: Vec<Candidate<'_>> = scored
            .iter()
            .enumerate()
            .map(|(index, it)| Candidate {
                index,
                source: &it.source,
                score: it.composite_score.unwrap_or(0.0),
            })
            .collect();
        let order = select::select(&candidates, &self.selection);

        let mut slots: Vec<Option<Item>> = scored.into_iter().map(Some).collect();
        let out: Vec<Item> = order
            .into_iter()
            .filter_map(|i| slots.get_mut(i).and_then(Option::take))
            .collect();

        log_distribution(&out);
        out
    }

    /// Composite scores against the whole pool's average raw score.
    pub fn score_all(&self, mut items: Vec<Item>) -> Vec<Item> {
        let avg = scoring::pool_average(items.iter().map(|i| i.score));
        for it in &mut items {
            let parts = ScoreParts::compute(it.score, &it.source, avg, &self.credibility);
            let composite = parts.composite(&self.weights);
            tracing::trace!(title = %it.title, source = %it.source, ?parts, composite, "scored");
            it.composite_score = Some(composite);
        }
        items
    }
}

fn log_distribution(items: &[Item]) {
    let mut per_source: BTreeMap<&str, usize> = BTreeMap::new();
    for it in items {
        *per_source.entry(it.source.as_str()).or_default() += 1;
    }
    tracing::info!(selected = items.len(), sources = per_source.len(), "aggregation complete");
    for (source, count) in per_source {
        tracing::debug!(source, count, "selected per source");
    }
}

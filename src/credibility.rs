//! # Source Credibility
//!
//! Maps a source label (e.g. "豆瓣Top250", "猫眼实时票房") to a credibility
//! weight used by the composite score.
//!
//! - Lookup is exact on the label; unknown sources get [`DEFAULT_CREDIBILITY`].
//! - Built-in seeded values may go up to 1.5 (real-time box office).
//! - Values added at runtime or from config are clamped to `[0.0, 1.2]`.
//! - The table is an immutable value: `with_source` returns a new table.

use serde::Deserialize;
use std::collections::HashMap;

use crate::ingest::providers::labels;

pub const DEFAULT_CREDIBILITY: f64 = 0.5;
/// Ceiling for values added through `with_source`.
pub const ADDED_MAX: f64 = 1.2;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct CredibilityTable {
    weights: HashMap<String, f64>,
}

impl Default for CredibilityTable {
    fn default() -> Self {
        Self::default_seed()
    }
}

impl CredibilityTable {
    /// An empty table: every source resolves to the default.
    pub fn empty() -> Self {
        Self {
            weights: HashMap::new(),
        }
    }

    /// Seeded credibility of the built-in sources.
    pub fn default_seed() -> Self {
        let weights = [
            (labels::DOUBAN_TOP250, 0.8),
            (labels::DOUBAN_HOT, 0.9),
            (labels::DOUBAN_LATEST, 1.0),
            (labels::MAOYAN_TOP100, 0.85),
            (labels::MAOYAN_REALTIME, 1.5),
            (labels::BILIBILI_MOVIE, 0.9),
            (labels::TENCENT_VIDEO, 0.9),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        Self { weights }
    }

    /// Credibility for `source`, or [`DEFAULT_CREDIBILITY`] when unknown.
    pub fn credibility_for(&self, source: &str) -> f64 {
        self.weights
            .get(source)
            .copied()
            .unwrap_or(DEFAULT_CREDIBILITY)
    }

    /// A copy of this table with `source` set to `weight` clamped to `[0, 1.2]`.
    /// Non-finite weights become 0.
    pub fn with_source(&self, source: impl Into<String>, weight: f64) -> Self {
        let mut next = self.clone();
        let w = if weight.is_finite() {
            weight.clamp(0.0, ADDED_MAX)
        } else {
            0.0
        };
        next.weights.insert(source.into(), w);
        next
    }

    /// Apply every entry of `overrides` through `with_source`.
    pub fn merged<'a>(&self, overrides: impl IntoIterator<Item = (&'a String, &'a f64)>) -> Self {
        overrides
            .into_iter()
            .fold(self.clone(), |t, (k, v)| t.with_source(k.clone(), *v))
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

//! Composite-score weight vector.
//!
//! Four non-negative factors that always sum to 1. Every mutation goes
//! through `with`, which sanitizes and renormalizes and returns a new value.
//!
//! TOML shape (`[weights]` in tracker.toml, every key optional):
//! ```toml
//! base_score = 0.38
//! source_credibility = 0.17
//! popularity_bonus = 0.25
//! recency_bonus = 0.20
//! ```

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct WeightVector {
    base_score: f64,
    source_credibility: f64,
    popularity_bonus: f64,
    recency_bonus: f64,
}

impl Default for WeightVector {
    fn default() -> Self {
        Self {
            base_score: 0.38,
            source_credibility: 0.17,
            popularity_bonus: 0.25,
            recency_bonus: 0.20,
        }
    }
}

/// Partial update; `None` keeps the current value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WeightUpdate {
    pub base_score: Option<f64>,
    pub source_credibility: Option<f64>,
    pub popularity_bonus: Option<f64>,
    pub recency_bonus: Option<f64>,
}

impl WeightUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn sanitize(x: f64) -> f64 {
    if x.is_finite() && x > 0.0 {
        x
    } else {
        0.0
    }
}

impl WeightVector {
    /// Apply `update`, then renormalize so the factors sum to 1.
    pub fn with(&self, update: WeightUpdate) -> Self {
        Self {
            base_score: update.base_score.unwrap_or(self.base_score),
            source_credibility: update.source_credibility.unwrap_or(self.source_credibility),
            popularity_bonus: update.popularity_bonus.unwrap_or(self.popularity_bonus),
            recency_bonus: update.recency_bonus.unwrap_or(self.recency_bonus),
        }
        .normalized()
    }

    /// Negative/non-finite factors become 0; an all-zero vector falls back to defaults.
    fn normalized(self) -> Self {
        let v = Self {
            base_score: sanitize(self.base_score),
            source_credibility: sanitize(self.source_credibility),
            popularity_bonus: sanitize(self.popularity_bonus),
            recency_bonus: sanitize(self.recency_bonus),
        };
        let total = v.sum();
        if total <= 0.0 || !total.is_finite() {
            tracing::warn!("weight vector sums to zero; falling back to defaults");
            return Self::default();
        }
        Self {
            base_score: v.base_score / total,
            source_credibility: v.source_credibility / total,
            popularity_bonus: v.popularity_bonus / total,
            recency_bonus: v.recency_bonus / total,
        }
    }

    pub fn sum(&self) -> f64 {
        self.base_score + self.source_credibility + self.popularity_bonus + self.recency_bonus
    }

    pub fn base_score(&self) -> f64 {
        self.base_score
    }

    pub fn source_credibility(&self) -> f64 {
        self.source_credibility
    }

    pub fn popularity_bonus(&self) -> f64 {
        self.popularity_bonus
    }

    pub fn recency_bonus(&self) -> f64 {
        self.recency_bonus
    }
}

//! Source-diversified top-N selection.

use serde::Deserialize;
use std::cmp::Ordering;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SelectionPolicy {
    /// Target output size. Quota picks may push the output past it.
    #[serde(rename = "selection_cap")]
    pub cap: usize,
    /// Minimum picks per source (when the source has that many).
    pub min_per_source: usize,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self {
            cap: 30,
            min_per_source: 3,
        }
    }
}

/// One scored candidate: its position in the input and its composite score.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate<'a> {
    pub index: usize,
    pub source: &'a str,
    pub score: f64,
}

/// Score descending, then input order.
fn by_rank(a: &Candidate<'_>, b: &Candidate<'_>) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then(a.index.cmp(&b.index))
}

/// Returns the selected input indices, ranked.
///
/// 1. group by source (first-appearance order), rank each group;
/// 2. take the top `min_per_source` of every group;
/// 3. fill up to `cap` from the ranked remainder;
/// 4. rank the union.
pub fn select(candidates: &[Candidate<'_>], policy: &SelectionPolicy) -> Vec<usize> {
    let mut groups: Vec<(&str, Vec<Candidate<'_>>)> = Vec::new();
    for c in candidates {
        match groups.iter_mut().find(|(s, _)| *s == c.source) {
            Some((_, g)) => g.push(*c),
            None => groups.push((c.source, vec![*c])),
        }
    }

    let mut picked = Vec::new();
    let mut rest = Vec::new();
    for (_, mut group) in groups {
        group.sort_by(by_rank);
        let take = policy.min_per_source.min(group.len());
        rest.extend(group.split_off(take));
        picked.extend(group);
    }

    let room = policy.cap.saturating_sub(picked.len());
    if room > 0 {
        rest.sort_by(by_rank);
        picked.extend(rest.into_iter().take(room));
    }

    picked.sort_by(by_rank);
    picked.into_iter().map(|c| c.index).collect()
}

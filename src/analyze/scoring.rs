//! Composite score of a single item.
//!
//! composite = w.base * clamp(score/10, 0, 1)
//!           + w.credibility * credibility(source)
//!           + w.popularity * (base_popularity_bonus + source keyword popularity)
//!           + w.recency * source keyword recency
//!
//! The result is scaled by 10 and rounded to one decimal.

use super::weights::WeightVector;
use crate::credibility::CredibilityTable;

/// Keyword tiers in priority order: (terms, popularity bonus, recency bonus).
const KEYWORD_TIERS: [(&[&str], f64, f64); 4] = [
    (
        &["实时", "票房", "realtime", "real-time", "box office", "box-office"],
        0.95,
        0.95,
    ),
    (&["最新", "latest", "newest"], 0.4, 0.4),
    (&["热门", "hot", "popular", "trending"], 0.3, 0.3),
    (&["top", "250", "ranking"], 0.1, 0.0),
];
const NO_KEYWORD_POPULARITY: f64 = 0.2;
const NO_KEYWORD_RECENCY: f64 = 0.0;
const BASE_BONUS_SCALE: f64 = 0.3;

/// (popularity, recency) bonus from the first tier whose term appears in the
/// lowercased source name.
///
/// Terms with Latin letters must match whole words (`hot` does not match
/// "Photoplay"); CJK and digit-only terms match anywhere.
pub fn source_keyword_bonus(source: &str) -> (f64, f64) {
    let s = source.to_lowercase();
    let words = latin_words(&s);
    KEYWORD_TIERS
        .iter()
        .find(|(terms, _, _)| terms.iter().any(|t| term_matches(&s, &words, t)))
        .map(|(_, pop, rec)| (*pop, *rec))
        .unwrap_or((NO_KEYWORD_POPULARITY, NO_KEYWORD_RECENCY))
}

/// Runs of ASCII letters; everything else (spaces, dashes, digits, CJK) separates.
fn latin_words(s: &str) -> Vec<&str> {
    s.split(|c: char| !c.is_ascii_alphabetic())
        .filter(|w| !w.is_empty())
        .collect()
}

fn term_matches(name: &str, words: &[&str], term: &str) -> bool {
    if !term.bytes().any(|b| b.is_ascii_alphabetic()) {
        return name.contains(term);
    }
    let phrase = latin_words(term);
    words.windows(phrase.len()).any(|w| w == phrase.as_slice())
}

/// Bonus for scoring above the pool average, in `[0, 0.3]`.
pub fn base_popularity_bonus(score: f64, pool_avg: Option<f64>) -> f64 {
    let Some(avg) = pool_avg else {
        return 0.0;
    };
    if score <= avg {
        return 0.0;
    }
    let headroom = 10.0 - avg;
    let ratio = if headroom <= 0.0 {
        1.0
    } else {
        ((score - avg) / headroom).min(1.0)
    };
    ratio * BASE_BONUS_SCALE
}

/// Mean raw score of the pool; `None` for an empty pool.
pub fn pool_average(scores: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, n) = scores
        .into_iter()
        .fold((0.0, 0usize), |(s, n), x| (s + x, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// Per-factor breakdown, mostly for debug logging and tests.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoreParts {
    pub normalized_base: f64,
    pub credibility: f64,
    pub popularity: f64,
    pub recency: f64,
}

impl ScoreParts {
    pub fn compute(
        score: f64,
        source: &str,
        pool_avg: Option<f64>,
        credibility: &CredibilityTable,
    ) -> Self {
        let (kw_pop, kw_rec) = source_keyword_bonus(source);
        Self {
            normalized_base: (score / 10.0).clamp(0.0, 1.0),
            credibility: credibility.credibility_for(source),
            popularity: base_popularity_bonus(score, pool_avg) + kw_pop,
            recency: kw_rec,
        }
    }

    /// Weighted sum scaled to a 0..10-ish range, rounded to one decimal.
    pub fn composite(&self, w: &WeightVector) -> f64 {
        let raw = w.base_score() * self.normalized_base
            + w.source_credibility() * self.credibility
            + w.popularity_bonus() * self.popularity
            + w.recency_bonus() * self.recency;
        round1(raw * 10.0)
    }
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_priority_order() {
        assert_eq!(source_keyword_bonus("猫眼实时票房"), (0.95, 0.95));
        assert_eq!(source_keyword_bonus("豆瓣最新"), (0.4, 0.4));
        assert_eq!(source_keyword_bonus("B站电影热门"), (0.3, 0.3));
        assert_eq!(source_keyword_bonus("豆瓣Top250"), (0.1, 0.0));
        assert_eq!(source_keyword_bonus("Box Office Daily"), (0.95, 0.95));
        // "Latest" beats "Top" regardless of position.
        assert_eq!(source_keyword_bonus("Top Latest"), (0.4, 0.4));
        assert_eq!(source_keyword_bonus("X"), (0.2, 0.0));
    }

    #[test]
    fn latin_terms_match_whole_words_only() {
        assert_eq!(source_keyword_bonus("Photoplay Weekly"), (0.2, 0.0));
        assert_eq!(source_keyword_bonus("Screenshot Reviews"), (0.2, 0.0));
        assert_eq!(source_keyword_bonus("Desktop Cinema"), (0.2, 0.0));
        assert_eq!(source_keyword_bonus("Nonstop Films"), (0.2, 0.0));

        assert_eq!(source_keyword_bonus("Daily Hot"), (0.3, 0.3));
        assert_eq!(source_keyword_bonus("hot-list"), (0.3, 0.3));
        assert_eq!(source_keyword_bonus("Top10 Charts"), (0.1, 0.0));
        assert_eq!(source_keyword_bonus("Real-Time Board"), (0.95, 0.95));
        assert_eq!(source_keyword_bonus("real time board"), (0.95, 0.95));
        assert_eq!(source_keyword_bonus("box-office weekly"), (0.95, 0.95));
        // "box" alone is not "box office".
        assert_eq!(source_keyword_bonus("Xbox Office"), (0.2, 0.0));
    }

    #[test]
    fn cjk_and_digit_terms_match_anywhere() {
        assert_eq!(source_keyword_bonus("豆瓣Top250"), (0.1, 0.0));
        assert_eq!(source_keyword_bonus("全网热门榜"), (0.3, 0.3));
        assert_eq!(source_keyword_bonus("IMDb250"), (0.1, 0.0));
    }

    #[test]
    fn base_bonus_above_average_only() {
        assert_eq!(base_popularity_bonus(9.0, None), 0.0);
        assert_eq!(base_popularity_bonus(7.0, Some(8.0)), 0.0);
        assert_eq!(base_popularity_bonus(8.0, Some(8.0)), 0.0);
        assert!((base_popularity_bonus(9.0, Some(8.0)) - 0.15).abs() < 1e-9);
    }

    #[test]
    fn base_bonus_saturates_without_headroom() {
        assert!((base_popularity_bonus(12.0, Some(10.5)) - 0.3).abs() < 1e-9);
        assert!((base_popularity_bonus(10.0, Some(0.0)) - 0.3).abs() < 1e-9);
    }

    #[test]
    fn pool_average_handles_empty() {
        assert_eq!(pool_average(Vec::new()), None);
        assert_eq!(pool_average(vec![6.0, 8.0]), Some(7.0));
    }

    #[test]
    fn composite_for_known_values() {
        // score 9, avg 8, unknown source "X":
        // 0.38*0.9 + 0.17*0.5 + 0.25*(0.15+0.2) + 0.20*0
        // = 0.342 + 0.085 + 0.0875 = 0.5145 -> 5.1
        let parts = ScoreParts::compute(9.0, "X", Some(8.0), &CredibilityTable::default_seed());
        assert_eq!(parts.composite(&WeightVector::default()), 5.1);
    }

    #[test]
    fn out_of_range_base_is_clamped() {
        let t = CredibilityTable::empty();
        assert_eq!(ScoreParts::compute(-3.0, "X", None, &t).normalized_base, 0.0);
        assert_eq!(ScoreParts::compute(42.0, "X", None, &t).normalized_base, 1.0);
    }
}

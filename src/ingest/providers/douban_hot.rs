// src/ingest/providers/douban_hot.rs
use serde_json::Value;

use super::labels;
use crate::ingest::format::{score_value, str_field, JsonSource, SourceInfo};
use crate::ingest::types::{FetchTarget, Item};

const URL: &str = "https://movie.douban.com/j/search_subjects?type=movie&tag=%E7%83%AD%E9%97%A8&sort=recommend&page_limit=20&page_start=0";

/// Douban "hot" search subjects API.
pub struct DoubanHot;

impl SourceInfo for DoubanHot {
    fn name(&self) -> &str {
        "douban_hot"
    }

    fn target(&self) -> Option<FetchTarget> {
        Some(
            FetchTarget::new(URL)
                .header("Referer", "https://movie.douban.com/")
                .header("Accept", "application/json, text/plain, */*"),
        )
    }
}

impl JsonSource for DoubanHot {
    fn extract(&self, doc: &Value) -> Vec<Item> {
        let Some(subjects) = doc.get("subjects").and_then(Value::as_array) else {
            tracing::warn!(adapter = "douban_hot", "response has no subjects");
            return Vec::new();
        };
        subjects
            .iter()
            .filter_map(|s| {
                let title = str_field(s, "title")?;
                let url = str_field(s, "url")?;
                Item::new(title, score_value(s.get("rate")), url, labels::DOUBAN_HOT)
            })
            .collect()
    }
}

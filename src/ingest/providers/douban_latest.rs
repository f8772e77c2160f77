// src/ingest/providers/douban_latest.rs
use serde_json::Value;

use super::labels;
use crate::ingest::format::{score_value, str_field, JsonSource, SourceInfo};
use crate::ingest::types::{FetchTarget, Item};

const URL: &str =
    "https://movie.douban.com/j/new_search_subjects?sort=U&range=0,10&tags=%E7%94%B5%E5%BD%B1";

/// Douban newest-releases search API.
pub struct DoubanLatest;

impl SourceInfo for DoubanLatest {
    fn name(&self) -> &str {
        "douban_latest"
    }

    fn target(&self) -> Option<FetchTarget> {
        Some(
            FetchTarget::new(URL)
                .header("Referer", "https://movie.douban.com/")
                .header("Accept", "application/json, text/plain, */*"),
        )
    }
}

impl JsonSource for DoubanLatest {
    fn extract(&self, doc: &Value) -> Vec<Item> {
        let Some(list) = doc.get("data").and_then(Value::as_array) else {
            tracing::warn!(adapter = "douban_latest", "response has no data");
            return Vec::new();
        };
        list.iter()
            .filter_map(|m| {
                let title = str_field(m, "title")?;
                let url = str_field(m, "url")?;
                Item::new(title, rating_of(m), url, labels::DOUBAN_LATEST)
            })
            .collect()
    }
}

/// The rating shows up as `rate`, as `rating.value`, or as a bare `rating`.
fn rating_of(m: &Value) -> f64 {
    if let Some(rate) = m.get("rate") {
        return score_value(Some(rate));
    }
    match m.get("rating") {
        Some(obj @ Value::Object(_)) => score_value(obj.get("value")),
        other => score_value(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::format::JsonAdapter;
    use crate::ingest::types::SourceAdapter;

    #[test]
    fn reads_all_rating_shapes() {
        let body = r#"{"data":[
            {"title":"A","rate":"7.1","url":"https://m.test/a"},
            {"title":"B","rating":{"value":8.2},"url":"https://m.test/b"},
            {"title":"C","rating":"6.5","url":"https://m.test/c"},
            {"title":"D","url":"https://m.test/d"},
            {"title":"E"}
        ]}"#;
        let items = JsonAdapter(DoubanLatest).parse(body);
        let scores: Vec<f64> = items.iter().map(|i| i.score).collect();
        assert_eq!(scores, vec![7.1, 8.2, 6.5, 0.0]);
        assert!(items.iter().all(|i| i.source == labels::DOUBAN_LATEST));
    }
}

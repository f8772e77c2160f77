// src/ingest/providers/bilibili_movie.rs
use serde_json::Value;

use super::labels;
use crate::ingest::format::{str_field, JsonSource, SourceInfo};
use crate::ingest::types::{FetchTarget, Item};

const URL: &str = "https://api.bilibili.com/x/web-interface/ranking/v2?rid=23&type=all";

/// Ranking points are scaled to a 10-point score with a floor, since every
/// ranked video is "hot" by construction.
const SCORE_FLOOR: f64 = 6.0;

/// Bilibili movie-zone ranking API.
pub struct BilibiliMovie;

impl SourceInfo for BilibiliMovie {
    fn name(&self) -> &str {
        "bilibili_movie"
    }

    fn target(&self) -> Option<FetchTarget> {
        Some(
            FetchTarget::new(URL)
                .header("Referer", "https://www.bilibili.com/")
                .header("Origin", "https://www.bilibili.com")
                .header("Accept", "application/json, text/plain, */*"),
        )
    }
}

impl JsonSource for BilibiliMovie {
    fn extract(&self, doc: &Value) -> Vec<Item> {
        let Some(list) = doc.pointer("/data/list").and_then(Value::as_array) else {
            tracing::warn!(adapter = "bilibili_movie", "response has no data.list");
            return Vec::new();
        };
        list.iter()
            .filter_map(|v| {
                let title = str_field(v, "title")?;
                let bvid = str_field(v, "bvid")?;
                let pts = v.get("pts").and_then(Value::as_f64).unwrap_or(0.0);
                let score = (pts / 100.0).round() / 10.0;
                Item::new(
                    title,
                    score.max(SCORE_FLOOR),
                    format!("https://www.bilibili.com/video/{bvid}"),
                    labels::BILIBILI_MOVIE,
                )
            })
            .collect()
    }
}

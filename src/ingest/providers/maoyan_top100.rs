// src/ingest/providers/maoyan_top100.rs
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::{clean_text, labels};
use crate::ingest::format::{SourceInfo, TextSource};
use crate::ingest::types::{FetchTarget, Item};

const URL: &str = "https://www.maoyan.com/board/4";

static ENTRY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?s)<dd>.*?board-index.*?>(\d+)</i>.*?name"><a(?:[^>]*?href="([^"]*)")?[^>]*>(.*?)</a>.*?integer">(.*?)</i>.*?fraction">(.*?)</i>.*?</dd>"#,
    )
    .unwrap()
});

/// Maoyan board 4 (top 100), scraped from the board markup.
pub struct MaoyanTop100;

impl SourceInfo for MaoyanTop100 {
    fn name(&self) -> &str {
        "maoyan_top100"
    }

    fn target(&self) -> Option<FetchTarget> {
        Some(
            FetchTarget::new(URL)
                .header("Referer", "https://maoyan.com/")
                .header("Accept-Language", "zh-CN,zh;q=0.9,en;q=0.8"),
        )
    }
}

impl TextSource for MaoyanTop100 {
    fn extract(&self, body: &str) -> Vec<Item> {
        ENTRY.captures_iter(body).filter_map(|c| parse_entry(&c)).collect()
    }
}

fn parse_entry(c: &Captures<'_>) -> Option<Item> {
    let rank = c.get(1)?.as_str();
    let href = c.get(2).map(|m| m.as_str().trim()).unwrap_or_default();
    let title = clean_text(c.get(3)?.as_str());

    // Score is split across two tags: "9." + "5".
    let raw_score = format!(
        "{}{}",
        c.get(4).map(|m| m.as_str().trim()).unwrap_or_default(),
        c.get(5).map(|m| m.as_str().trim()).unwrap_or_default()
    );
    let score = raw_score.parse::<f64>().unwrap_or(0.0);

    let url = if href.starts_with('/') {
        format!("https://www.maoyan.com{href}")
    } else if href.starts_with("http") {
        href.to_string()
    } else {
        format!("https://www.maoyan.com/films/{rank}")
    };

    Item::new(title, score, url, labels::MAOYAN_TOP100)
}
